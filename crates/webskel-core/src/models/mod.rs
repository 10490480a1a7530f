//! Data models shared with the remote auth API.
//!
//! - `User`: the profile record returned by login, register and test-token
//! - `TokenResponse`: the credential-exchange result
//! - `RegisterRequest`, `Registration`: the sign-up payload and its result

pub mod auth;
pub mod user;

pub use auth::{RegisterRequest, Registration, TokenResponse};
pub use user::User;
