//! Application flows for the retos client.
//!
//! `App` ties the session manager, the API client and the view guard
//! together into the operations a front end exposes: registration,
//! sign-in, the protected profile and ranking views, logout and the
//! administrative listing.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, Gateway};
use crate::auth::{self, DecodeError, Session, SessionError, SessionManager, User};
use crate::config::Config;
use crate::guard::{self, Decision, Route, PROFILE_PATH, RANKING_PATH, REGISTER_PATH};
use crate::models::{GoogleSignIn, NewPersona, Persona, Profile, RankingEntry};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid Google credential: {0}")]
    Credential(#[from] DecodeError),

    #[error("No se recibió un token del servidor.")]
    MissingToken,
}

impl AppError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Api(ApiError::NetworkError(e)) if e.is_timeout() => {
                "Tiempo de espera agotado. Inténtalo de nuevo.".to_string()
            }
            AppError::Api(ApiError::NetworkError(_)) => {
                "No se pudo conectar con el servidor. Revisa tu conexión.".to_string()
            }
            AppError::Api(ApiError::Unauthorized(Some(msg))) => msg.clone(),
            AppError::Api(ApiError::Unauthorized(None)) => {
                "Credenciales inválidas o sesión expirada.".to_string()
            }
            AppError::Api(
                ApiError::Validation(msg)
                | ApiError::InvalidCredential(msg)
                | ApiError::NotFound(msg)
                | ApiError::ServerError(msg),
            ) => msg.clone(),
            AppError::Api(other) => other.to_string(),
            AppError::Session(e) => format!("Token inválido: {}", e),
            AppError::Credential(e) => format!("Credencial de Google inválida: {}", e),
            AppError::MissingToken => self.to_string(),
        }
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    /// Session still initializing.
    Loading,
    Redirect { target: String, from: String },
    NotFound(String),
}

/// Outcome of loading a protected view's data.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded<T> {
    Loading,
    Redirect { target: String, from: String },
    Ready(T),
    /// Displayable error message.
    Failed(String),
    /// The session changed while the request was in flight.
    Discarded,
}

pub struct App {
    pub config: Config,
    session: Arc<SessionManager>,
    api: ApiClient,
}

impl App {
    /// Create the application from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let store = config.token_store()?;
        debug!(backend = ?config.token_backend, url = %config.api_base_url, "Token store configured");

        let gateway = Gateway::new(&config.api_base_url, config.request_timeout(), store.clone())?;
        let session = Arc::new(SessionManager::new(store));

        Ok(Self::with_parts(config, session, ApiClient::new(gateway)))
    }

    /// Assemble from already-built parts. The API client's gateway must read
    /// the same token store as the session manager.
    pub fn with_parts(config: Config, session: Arc<SessionManager>, api: ApiClient) -> Self {
        Self {
            config,
            session,
            api,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Restore the session from the stored token. Makes no network calls.
    pub fn start(&self) -> Session {
        self.session.initialize()
    }

    pub fn status(&self) -> Session {
        self.session.snapshot()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn navigate(&self, path: &str) -> Navigation {
        let route = Route::resolve(path);
        if let Route::NotFound(path) = &route {
            return Navigation::NotFound(path.clone());
        }
        if !route.is_protected() {
            return Navigation::Render(route);
        }

        match guard::can_enter(&self.session.snapshot(), route.path()) {
            Decision::Defer => Navigation::Loading,
            Decision::Allow => Navigation::Render(route),
            Decision::Redirect { target, from } => Navigation::Redirect { target, from },
        }
    }

    // =========================================================================
    // Registration and sign-in
    // =========================================================================

    /// Register a new account. Returns the backend's confirmation message.
    pub async fn register(&self, form: &NewPersona) -> Result<String, AppError> {
        form.validate().map_err(AppError::Validation)?;

        match self.api.register(&form.trimmed()).await {
            Ok(response) => {
                info!(id_persona = ?response.id_persona, "Registration succeeded");
                Ok(response.message)
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                Err(e.into())
            }
        }
    }

    /// Sign in with a Google ID token, creating the account on first use.
    pub async fn sign_in_with_google(&self, credential: &str) -> Result<User, AppError> {
        let claims = auth::decode(credential)?;
        let payload = GoogleSignIn::from_claims(&claims, credential).ok_or_else(|| {
            AppError::Validation("La credencial de Google no incluye correo.".to_string())
        })?;

        let response = self.api.google_auth(&payload).await.map_err(|e| {
            error!(error = %e, "Google sign-in failed");
            AppError::from(e)
        })?;
        self.adopt_token(response.token)
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        correo: &str,
        contrasena: &str,
    ) -> Result<User, AppError> {
        if correo.trim().is_empty() || contrasena.is_empty() {
            return Err(AppError::Validation(
                "Correo y contraseña son obligatorios.".to_string(),
            ));
        }

        let response = self
            .api
            .login(correo.trim(), contrasena)
            .await
            .map_err(|e| {
                error!(error = %e, "Password sign-in failed");
                AppError::from(e)
            })?;
        self.adopt_token(response.token)
    }

    fn adopt_token(&self, token: Option<String>) -> Result<User, AppError> {
        let token = token.ok_or(AppError::MissingToken)?;
        Ok(self.session.login(&token)?)
    }

    /// End the session. Returns where to navigate next.
    pub fn logout(&self) -> &'static str {
        self.session.logout();
        REGISTER_PATH
    }

    // =========================================================================
    // Protected views
    // =========================================================================

    pub async fn load_profile(&self) -> Guarded<Profile> {
        self.guarded(PROFILE_PATH, || self.api.fetch_profile()).await
    }

    pub async fn load_ranking(&self, page: u32, per_page: u32) -> Guarded<Vec<RankingEntry>> {
        self.guarded(RANKING_PATH, || self.api.fetch_ranking(page, per_page))
            .await
    }

    /// Run `fetch` for the protected view at `path`.
    ///
    /// The request is tagged with the session version at dispatch; a result
    /// arriving after the session changed is discarded. A rejected
    /// credential forces a logout and a redirect to the register view.
    async fn guarded<T, F, Fut>(&self, path: &str, fetch: F) -> Guarded<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let session = self.session.snapshot();
        match guard::can_enter(&session, path) {
            Decision::Defer => return Guarded::Loading,
            Decision::Redirect { target, from } => return Guarded::Redirect { target, from },
            Decision::Allow => {}
        }

        let version = session.version;
        let result = fetch().await;

        if !self.session.is_current(version) {
            debug!(path, version, "Discarding response for a previous session");
            return Guarded::Discarded;
        }

        match result {
            Ok(data) => Guarded::Ready(data),
            Err(e) if e.is_auth_error() => {
                warn!(path, error = %e, "Credential rejected, logging out");
                self.session.logout();
                Guarded::Redirect {
                    target: REGISTER_PATH.to_string(),
                    from: path.to_string(),
                }
            }
            Err(e) => {
                error!(path, error = %e, "Request failed");
                Guarded::Failed(AppError::from(e).user_message())
            }
        }
    }

    // =========================================================================
    // Administration
    // =========================================================================

    pub async fn list_personas(&self, page: u32, per_page: u32) -> Result<Vec<Persona>, AppError> {
        Ok(self.api.list_personas(page, per_page).await?)
    }

    pub async fn delete_persona(&self, id_persona: i64) -> Result<String, AppError> {
        let response = self.api.delete_persona(id_persona).await?;
        info!(id_persona, "Persona removed");
        Ok(response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::tests::token_with;
    use crate::auth::{MemoryTokenStore, Phase, TokenStore};
    use serde_json::json;
    use std::time::Duration;

    /// App pointed at an address nothing listens on.
    fn offline_app(store: Arc<MemoryTokenStore>) -> App {
        let gateway =
            Gateway::new("http://127.0.0.1:9/api", Duration::from_secs(1), store.clone()).unwrap();
        App::with_parts(
            Config::default(),
            Arc::new(SessionManager::new(store)),
            ApiClient::new(gateway),
        )
    }

    #[test]
    fn test_navigate_before_start_is_loading() {
        let app = offline_app(Arc::new(MemoryTokenStore::new()));
        assert_eq!(app.navigate("/profile"), Navigation::Loading);
        assert_eq!(app.navigate("/register"), Navigation::Render(Route::Register));
    }

    #[test]
    fn test_navigate_protected_without_session_redirects() {
        let app = offline_app(Arc::new(MemoryTokenStore::new()));
        app.start();
        assert_eq!(
            app.navigate("/profile"),
            Navigation::Redirect {
                target: "/register".to_string(),
                from: "/profile".to_string(),
            }
        );
        assert_eq!(app.navigate("/x"), Navigation::NotFound("/x".to_string()));
        assert_eq!(app.navigate("/"), Navigation::Render(Route::Register));
    }

    #[test]
    fn test_start_without_token_is_unauthenticated() {
        let app = offline_app(Arc::new(MemoryTokenStore::new()));
        assert_eq!(app.start().phase, Phase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_form_locally() {
        let app = offline_app(Arc::new(MemoryTokenStore::new()));
        let form = NewPersona {
            correo: "no-at-sign".to_string(),
            ..Default::default()
        };
        let err = app.register(&form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_google_sign_in_rejects_malformed_credential() {
        let app = offline_app(Arc::new(MemoryTokenStore::new()));
        app.start();
        let err = app.sign_in_with_google("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AppError::Credential(_)));
        assert!(!app.status().is_authenticated());
    }

    #[tokio::test]
    async fn test_load_profile_while_logged_out_redirects_without_request() {
        let app = offline_app(Arc::new(MemoryTokenStore::new()));
        app.start();
        assert_eq!(
            app.load_profile().await,
            Guarded::Redirect {
                target: "/register".to_string(),
                from: "/profile".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_load_profile_network_failure_is_displayable() {
        let token = token_with(json!({"sub": "42"}));
        let store = Arc::new(MemoryTokenStore::with_token(token));
        let app = offline_app(store.clone());
        app.start();

        match app.load_profile().await {
            Guarded::Failed(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
        // Network errors do not end the session.
        assert!(app.status().is_authenticated());
        assert!(store.read().unwrap().is_some());
    }

    #[test]
    fn test_logout_returns_register_path() {
        let store = Arc::new(MemoryTokenStore::with_token(token_with(json!({"sub": "1"}))));
        let app = offline_app(store.clone());
        app.start();
        assert_eq!(app.logout(), "/register");
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_user_message_passes_backend_text() {
        let err = AppError::from(ApiError::Validation("El correo electrónico ya está registrado.".into()));
        assert_eq!(err.user_message(), "El correo electrónico ya está registrado.");
        assert_eq!(
            AppError::from(ApiError::Unauthorized(Some("Credenciales inválidas".into())))
                .user_message(),
            "Credenciales inválidas"
        );
        assert_eq!(
            AppError::from(ApiError::Unauthorized(None)).user_message(),
            "Credenciales inválidas o sesión expirada."
        );
        assert_eq!(
            AppError::MissingToken.user_message(),
            "No se recibió un token del servidor."
        );
    }
}
