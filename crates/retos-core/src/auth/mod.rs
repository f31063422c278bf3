//! Authentication session lifecycle.
//!
//! This module provides:
//! - `TokenStore`: the persistent slot holding the credential token
//!   (file, OS keychain, or in-memory)
//! - `codec`: local decoding of a token's claims, no signature check
//! - `SessionManager`: login/logout and startup restoration, with expiry
//!
//! Only the token is persisted; the session itself is rebuilt from it at
//! startup.

pub mod codec;
pub mod error;
pub mod session;
pub mod store;

pub use codec::{decode, Claims, UserId};
pub use error::{DecodeError, SessionError, StoreError};
pub use session::{Phase, Session, SessionManager, User};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
