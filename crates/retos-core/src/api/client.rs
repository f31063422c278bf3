//! API client for communicating with the retos REST backend.
//!
//! One method per consumed endpoint. Every call goes through the
//! [`Gateway`], which decides per request whether a bearer credential is
//! attached.

use serde::Serialize;
use tracing::debug;

use super::{ApiError, Credential, Gateway};
use crate::models::{
    GoogleSignIn, MessageResponse, NewPersona, Persona, Profile, RankingEntry, RegisterResponse,
    TokenResponse,
};

/// Default page size for the administrative listing.
pub const DEFAULT_PERSONAS_PER_PAGE: u32 = 20;

/// Default page size for the leaderboard.
pub const DEFAULT_RANKING_PER_PAGE: u32 = 10;

#[derive(Debug, Serialize)]
struct PasswordLogin<'a> {
    correo: &'a str,
    contrasena_plana: &'a str,
}

/// API client for the retos backend.
/// Clone is cheap - the gateway shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Gateway,
}

impl ApiClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Create an account from the registration form.
    pub async fn register(&self, persona: &NewPersona) -> Result<RegisterResponse, ApiError> {
        debug!(nombre_usuario = %persona.nombre_usuario, "Registering persona");
        self.gateway
            .post("/personas", persona, Credential::Bearer)
            .await
    }

    /// Exchange a Google credential for a backend token, creating the
    /// account on first sign-in.
    pub async fn google_auth(&self, payload: &GoogleSignIn) -> Result<TokenResponse, ApiError> {
        debug!(correo = %payload.correo, "Exchanging Google credential");
        self.gateway
            .post("/auth/google", payload, Credential::Bearer)
            .await
    }

    /// Email/password sign-in.
    pub async fn login(&self, correo: &str, contrasena: &str) -> Result<TokenResponse, ApiError> {
        debug!(correo, "Password sign-in");
        let body = PasswordLogin {
            correo,
            contrasena_plana: contrasena,
        };
        self.gateway.post("/login", &body, Credential::Bearer).await
    }

    /// The signed-in user's profile. Requires a stored token.
    pub async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.gateway.get("/profile", &[], Credential::Bearer).await
    }

    /// Leaderboard page. Requires a stored token.
    pub async fn fetch_ranking(&self, page: u32, per_page: u32) -> Result<Vec<RankingEntry>, ApiError> {
        let query = [("page", page.to_string()), ("per_page", per_page.to_string())];
        self.gateway.get("/ranking", &query, Credential::Bearer).await
    }

    // ===== Administrative =====
    // These endpoints are called without a credential.

    pub async fn list_personas(&self, page: u32, per_page: u32) -> Result<Vec<Persona>, ApiError> {
        let query = [("page", page.to_string()), ("per_page", per_page.to_string())];
        self.gateway
            .get("/personas", &query, Credential::Anonymous)
            .await
    }

    pub async fn delete_persona(&self, id_persona: i64) -> Result<MessageResponse, ApiError> {
        debug!(id_persona, "Deleting persona");
        self.gateway
            .delete(&format!("/personas/{}", id_persona), Credential::Anonymous)
            .await
    }
}
