use serde::{Deserialize, Serialize};

/// The signed-in user's record (`GET /profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub nombre: String,
    pub apellidos: String,
    pub correo: String,
    pub nombre_usuario: String,
    #[serde(default)]
    pub id_rol: Option<i64>,
}

/// Body of a successful `/personas` registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(default)]
    pub id_persona: Option<i64>,
}

/// Body returned by `/auth/google` and `/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id_persona: Option<i64>,
    #[serde(default)]
    pub nombre_usuario: Option<String>,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
