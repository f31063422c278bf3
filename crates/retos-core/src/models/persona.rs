use serde::{Deserialize, Serialize};

use crate::auth::Claims;

/// Registration form, as posted to `/personas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPersona {
    pub nombre: String,
    pub apellidos: String,
    pub correo: String,
    pub contrasena_plana: String,
    pub nombre_usuario: String,
}

impl NewPersona {
    /// Check the form before it is sent; the backend applies the same rules.
    ///
    /// Returns the first problem found as a displayable message.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("nombre", &self.nombre),
            ("apellidos", &self.apellidos),
            ("correo", &self.correo),
            ("contrasena_plana", &self.contrasena_plana),
            ("nombre_usuario", &self.nombre_usuario),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("Falta el campo requerido: {}", field));
            }
        }

        if !is_valid_email(self.correo.trim()) {
            return Err("Correo inválido: formato incorrecto".to_string());
        }
        if !is_valid_name(self.nombre.trim()) {
            return Err("El nombre solo debe contener letras y espacios".to_string());
        }
        if !is_valid_name(self.apellidos.trim()) {
            return Err("Los apellidos solo deben contener letras y espacios".to_string());
        }
        Ok(())
    }

    /// Copy with surrounding whitespace removed from the text fields.
    /// The password is left untouched.
    pub fn trimmed(&self) -> Self {
        Self {
            nombre: self.nombre.trim().to_string(),
            apellidos: self.apellidos.trim().to_string(),
            correo: self.correo.trim().to_string(),
            contrasena_plana: self.contrasena_plana.clone(),
            nombre_usuario: self.nombre_usuario.trim().to_string(),
        }
    }
}

/// `local@domain.tld`: exactly one `@`, non-empty local part, and a domain
/// with a dot that is neither leading nor trailing.
fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || s.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphabetic() || c == ' ')
}

/// Payload for `/auth/google`, derived from a Google ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSignIn {
    pub nombre: String,
    pub apellidos: String,
    pub correo: String,
    /// Google's stable `sub`; the backend hashes it like a password.
    pub contrasena_plana: String,
    pub nombre_usuario: String,
    /// The raw Google credential.
    pub token_refresco: String,
}

impl GoogleSignIn {
    /// Build the payload from the decoded Google credential.
    ///
    /// Returns `None` when the credential lacks an email, which the backend
    /// uses to find or create the account.
    pub fn from_claims(claims: &Claims, credential: &str) -> Option<Self> {
        let correo = claims.email.clone()?;
        let default_username = correo.split('@').next().unwrap_or_default().to_string();

        Some(Self {
            nombre: claims.given_name.clone().unwrap_or_default(),
            apellidos: claims.family_name.clone().unwrap_or_default(),
            nombre_usuario: claims.name.clone().unwrap_or(default_username),
            contrasena_plana: claims.subject.to_string(),
            correo,
            token_refresco: credential.to_string(),
        })
    }
}

/// Row of the administrative listing (`GET /personas`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id_persona: i64,
    pub nombre: String,
    pub apellidos: String,
    pub correo: String,
    pub nombre_usuario: String,
    #[serde(default)]
    pub num_retos_resueltos: Option<i64>,
    #[serde(default)]
    pub puntaje_total: Option<f64>,
    #[serde(default)]
    pub id_rol: Option<i64>,
}

impl Persona {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellidos)
    }

    /// Role for display; personas without one show as "Sin rol".
    pub fn role_display(&self) -> String {
        self.id_rol
            .map(|r| r.to_string())
            .unwrap_or_else(|| "Sin rol".to_string())
    }
}

/// Leaderboard row (`GET /ranking`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub id_persona: i64,
    pub nombre_usuario: String,
    #[serde(default)]
    pub puntaje_total: Option<f64>,
    #[serde(default)]
    pub num_retos_resueltos: Option<i64>,
}
