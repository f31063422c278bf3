//! Data models for the retos backend.
//!
//! - `NewPersona`, `GoogleSignIn`: registration and sign-in payloads
//! - `Profile`: the signed-in user's record
//! - `Persona`, `RankingEntry`: administrative listing and leaderboard rows
//! - Response bodies: `RegisterResponse`, `TokenResponse`, `MessageResponse`

pub mod persona;
pub mod profile;

pub use persona::{GoogleSignIn, NewPersona, Persona, RankingEntry};
pub use profile::{MessageResponse, Profile, RegisterResponse, TokenResponse};
