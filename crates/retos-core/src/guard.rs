//! Navigation gating for protected views.

use tokio::sync::watch;

use crate::auth::Session;

/// Public entry view; unauthenticated navigation lands here.
pub const REGISTER_PATH: &str = "/register";

pub const PROFILE_PATH: &str = "/profile";

pub const RANKING_PATH: &str = "/ranking";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The session is still initializing; render a placeholder and ask again.
    Defer,
    Allow,
    /// Go to `target`; `from` is the originally requested location, for
    /// redirecting back after login.
    Redirect { target: String, from: String },
}

/// Decide whether `requested` may render for `session`.
pub fn can_enter(session: &Session, requested: &str) -> Decision {
    if session.is_loading() {
        Decision::Defer
    } else if !session.is_authenticated() {
        Decision::Redirect {
            target: REGISTER_PATH.to_string(),
            from: requested.to_string(),
        }
    } else {
        Decision::Allow
    }
}

/// Wait until the session leaves `Initializing`, then decide.
///
/// If the session manager is gone before initialization finished, the
/// request is treated as unauthenticated.
pub async fn wait_for_decision(mut rx: watch::Receiver<Session>, requested: &str) -> Decision {
    match rx.wait_for(|s| !s.is_loading()).await {
        Ok(session) => can_enter(&session, requested),
        Err(_) => Decision::Redirect {
            target: REGISTER_PATH.to_string(),
            from: requested.to_string(),
        },
    }
}

/// Where a navigation request ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Register,
    Profile,
    Ranking,
    NotFound(String),
}

impl Route {
    /// Resolve a path. The root redirects to the register view.
    pub fn resolve(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" | REGISTER_PATH => Route::Register,
            PROFILE_PATH => Route::Profile,
            RANKING_PATH => Route::Ranking,
            other => Route::NotFound(other.to_string()),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Profile | Route::Ranking)
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Register => REGISTER_PATH,
            Route::Profile => PROFILE_PATH,
            Route::Ranking => RANKING_PATH,
            Route::NotFound(path) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Phase, User, UserId};

    fn session(phase: Phase, user: Option<&str>) -> Session {
        Session {
            phase,
            user: user.map(|id| User { id: UserId::from(id) }),
            version: 1,
        }
    }

    #[test]
    fn test_never_allows_while_loading() {
        for user in [None, Some("42")] {
            assert_eq!(
                can_enter(&session(Phase::Initializing, user), PROFILE_PATH),
                Decision::Defer
            );
        }
    }

    #[test]
    fn test_redirects_unauthenticated_with_origin() {
        assert_eq!(
            can_enter(&session(Phase::Unauthenticated, None), PROFILE_PATH),
            Decision::Redirect {
                target: "/register".to_string(),
                from: "/profile".to_string(),
            }
        );
    }

    #[test]
    fn test_allows_authenticated() {
        assert_eq!(
            can_enter(&session(Phase::Authenticated, Some("42")), PROFILE_PATH),
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn test_wait_for_decision_resolves_after_loading() {
        let (tx, rx) = watch::channel(session(Phase::Initializing, None));
        let waiter = tokio::spawn(async move { wait_for_decision(rx, PROFILE_PATH).await });

        tx.send_replace(session(Phase::Authenticated, Some("7")));
        assert_eq!(waiter.await.unwrap(), Decision::Allow);
    }

    #[tokio::test]
    async fn test_wait_for_decision_when_manager_dropped() {
        let (tx, rx) = watch::channel(session(Phase::Initializing, None));
        drop(tx);
        assert!(matches!(
            wait_for_decision(rx, PROFILE_PATH).await,
            Decision::Redirect { .. }
        ));
    }

    #[test]
    fn test_route_resolve() {
        assert_eq!(Route::resolve("/"), Route::Register);
        assert_eq!(Route::resolve("/register"), Route::Register);
        assert_eq!(Route::resolve("/profile/"), Route::Profile);
        assert_eq!(Route::resolve("/nope"), Route::NotFound("/nope".to_string()));
        assert!(Route::Profile.is_protected());
        assert!(!Route::Register.is_protected());
    }
}
