use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::codec::{self, UserId};
use super::{SessionError, TokenStore};

/// Authenticated identity, derived from the stored token's `sub` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// In-memory snapshot of the current login state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub phase: Phase,
    pub user: Option<User>,
    /// Bumped whenever the session identity changes.
    pub version: u64,
}

impl Session {
    fn initializing() -> Self {
        Self {
            phase: Phase::Initializing,
            user: None,
            version: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == Phase::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Initializing
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }
}

/// Owns the authentication state and keeps it in step with the token store.
///
/// Shared by reference (`Arc`) between the app flows and anything that needs
/// to observe the session. State changes go through a watch channel, so every
/// update is atomic and subscribers see each transition.
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::initializing());
        Self { store, state }
    }

    /// The token store this manager persists to.
    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    /// True if no identity change happened since `version` was observed.
    pub fn is_current(&self, version: u64) -> bool {
        self.version() == version
    }

    /// Restore the session from the token store.
    pub fn initialize(&self) -> Session {
        self.initialize_at(Utc::now())
    }

    /// Restore the session from the token store, judging expiry against `now`.
    ///
    /// Runs once; later calls return the current snapshot untouched. A login
    /// that lands while the store is being read wins over the restored state.
    pub fn initialize_at(&self, now: DateTime<Utc>) -> Session {
        if !self.snapshot().is_loading() {
            debug!("Session already initialized");
            return self.snapshot();
        }

        let user = self.restore(now);
        let applied = self.state.send_if_modified(|s| {
            if !s.is_loading() {
                return false;
            }
            s.phase = if user.is_some() {
                Phase::Authenticated
            } else {
                Phase::Unauthenticated
            };
            s.user = user;
            s.version += 1;
            true
        });

        let session = self.snapshot();
        if applied {
            info!(
                authenticated = session.is_authenticated(),
                user_id = ?session.user_id(),
                "Session initialized"
            );
        } else {
            debug!("Session changed during initialization, keeping it");
        }
        session
    }

    fn restore(&self, now: DateTime<Utc>) -> Option<User> {
        let token = match self.store.read() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored token");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                return None;
            }
        };

        match codec::decode(&token) {
            Ok(claims) if !claims.is_expired_at(now) => Some(User { id: claims.subject }),
            Ok(claims) => {
                warn!(expiry = ?claims.expiry, "Stored token expired");
                self.discard_stored_token();
                None
            }
            Err(e) => {
                warn!(error = %e, "Stored token is invalid");
                self.discard_stored_token();
                None
            }
        }
    }

    /// Remove the stored token, retrying once. Returns whether it is gone.
    fn discard_stored_token(&self) -> bool {
        match self.store.clear() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to clear stored token, retrying");
                match self.store.clear() {
                    Ok(()) => true,
                    Err(e) => {
                        error!(error = %e, "Stored token could not be cleared");
                        false
                    }
                }
            }
        }
    }

    /// Adopt `token` as the current credential.
    ///
    /// Surrounding whitespace is dropped before the token is stored. On
    /// error nothing changes: neither the store nor the session.
    pub fn login(&self, token: &str) -> Result<User, SessionError> {
        let token = token.trim();
        let claims = codec::decode(token)?;
        self.store.save(token)?;

        let user = User { id: claims.subject };
        self.state.send_modify(|s| {
            s.phase = Phase::Authenticated;
            s.user = Some(user.clone());
            s.version += 1;
        });
        info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Drop the credential. Safe to call when already logged out.
    ///
    /// The session ends even if the store refuses to clear; requests may
    /// then still carry the old token until a later clear succeeds.
    pub fn logout(&self) {
        if !self.discard_stored_token() {
            warn!("Logged out with a token still in the store");
        }
        self.state.send_if_modified(|s| {
            if s.phase == Phase::Unauthenticated && s.user.is_none() {
                return false;
            }
            s.phase = Phase::Unauthenticated;
            s.user = None;
            s.version += 1;
            true
        });
        info!("Logged out");
    }
}
