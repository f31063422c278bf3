//! Credential token payload decoding.
//!
//! Tokens are JWTs issued either by the retos backend or by Google Sign-In.
//! Only the payload segment is read; signature verification belongs to the
//! backend.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::DecodeError;

/// Stable user identifier carried in the `sub` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject: UserId,
    /// `None` when the token carries no `exp` claim; such a token never expires.
    pub expiry: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl Claims {
    /// A token is expired once `now` reaches its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|exp| exp <= now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Decode a token's payload without verifying its signature.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| DecodeError::Base64)?;
    let json: JsonValue =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json(e.to_string()))?;
    if !json.is_object() {
        return Err(DecodeError::Json("payload is not an object".to_string()));
    }

    let subject = match json.get("sub") {
        Some(JsonValue::String(s)) if !s.is_empty() => UserId(s.clone()),
        Some(JsonValue::Number(n)) => UserId(n.to_string()),
        _ => return Err(DecodeError::Claim("sub")),
    };

    let expiry = match json.get("exp") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Number(n)) => {
            let secs = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.floor() as i64))
                .ok_or(DecodeError::Claim("exp"))?;
            Some(DateTime::from_timestamp(secs, 0).ok_or(DecodeError::Claim("exp"))?)
        }
        Some(_) => return Err(DecodeError::Claim("exp")),
    };

    let text = |key: &str| json.get(key).and_then(|v| v.as_str()).map(str::to_string);

    Ok(Claims {
        subject,
        expiry,
        name: text("name"),
        email: text("email"),
        given_name: text("given_name"),
        family_name: text("family_name"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    /// Build an unsigned token around `payload`.
    pub(crate) fn token_with(payload: JsonValue) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.c2lnbmF0dXJl", header, body)
    }

    #[test]
    fn test_decode_string_subject_and_expiry() {
        let exp = Utc::now().timestamp() + 3600;
        let token = token_with(json!({"sub": "42", "exp": exp, "email": "ana@retos.dev"}));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.subject, UserId::from("42"));
        assert_eq!(claims.expiry.unwrap().timestamp(), exp);
        assert_eq!(claims.email.as_deref(), Some("ana@retos.dev"));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_decode_numeric_subject() {
        let token = token_with(json!({"sub": 7}));
        assert_eq!(decode(&token).unwrap().subject.as_str(), "7");
    }

    #[test]
    fn test_decode_without_expiry_never_expires() {
        let token = token_with(json!({"sub": "1"}));
        let claims = decode(&token).unwrap();
        assert!(claims.expiry.is_none());
        assert!(!claims.is_expired_at(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"9"}"#);
        let token = format!("{}.{}.sig", header, body);
        assert_eq!(decode(&token).unwrap().subject.as_str(), "9");
    }

    #[test]
    fn test_decode_google_profile_claims() {
        let token = token_with(json!({
            "sub": "1098",
            "name": "Ana Ruiz",
            "given_name": "Ana",
            "family_name": "Ruiz",
        }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.name.as_deref(), Some("Ana Ruiz"));
        assert_eq!(claims.given_name.as_deref(), Some("Ana"));
        assert_eq!(claims.family_name.as_deref(), Some("Ruiz"));
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert_eq!(decode("abc.def"), Err(DecodeError::SegmentCount(2)));
        assert_eq!(decode("not-a-token"), Err(DecodeError::SegmentCount(1)));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert_eq!(decode("a.!!!.c"), Err(DecodeError::Base64));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let body = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(
            decode(&format!("h.{}.s", body)),
            Err(DecodeError::Json(_))
        ));

        let array = URL_SAFE_NO_PAD.encode(b"[1,2]");
        assert!(matches!(
            decode(&format!("h.{}.s", array)),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_requires_subject() {
        let token = token_with(json!({"exp": 1}));
        assert_eq!(decode(&token), Err(DecodeError::Claim("sub")));

        let token = token_with(json!({"sub": ""}));
        assert_eq!(decode(&token), Err(DecodeError::Claim("sub")));
    }

    #[test]
    fn test_decode_rejects_non_numeric_expiry() {
        let token = token_with(json!({"sub": "1", "exp": "tomorrow"}));
        assert_eq!(decode(&token), Err(DecodeError::Claim("exp")));
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let claims = Claims {
            subject: UserId::from("1"),
            expiry: Some(now),
            name: None,
            email: None,
            given_name: None,
            family_name: None,
        };
        assert!(claims.is_expired_at(now));
        assert!(!claims.is_expired_at(now - Duration::seconds(1)));
    }
}
