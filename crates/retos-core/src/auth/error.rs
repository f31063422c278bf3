use thiserror::Error;

/// A credential token whose payload could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed token: expected 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("Malformed token: payload is not valid base64url")]
    Base64,

    #[error("Malformed token: payload is not a JSON object ({0})")]
    Json(String),

    #[error("Malformed token: missing or invalid claim '{0}'")]
    Claim(&'static str),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),
}

/// Why a `login` left the session unchanged.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Failed to persist token: {0}")]
    Store(#[from] StoreError),
}
