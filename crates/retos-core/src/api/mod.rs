//! REST API client module for the retos backend.
//!
//! This module provides the `Gateway`, which attaches the stored credential
//! to outbound requests, and the `ApiClient` with one typed method per
//! backend endpoint.
//!
//! The backend issues JWT bearer tokens from `/auth/google` and `/login`.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::{Credential, Gateway};
