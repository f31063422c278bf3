//! Core library for the retos client.
//!
//! The authentication session lifecycle (token store, token codec, session
//! manager), the request gateway that attaches the stored credential to
//! backend calls, the view guard, and the application flows built on them.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError, Gateway};
pub use app::{App, AppError, Guarded, Navigation};
pub use auth::{Session, SessionManager, TokenStore, User, UserId};
pub use config::Config;
pub use guard::{Decision, Route};
