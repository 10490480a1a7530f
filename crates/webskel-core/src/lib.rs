//! Core library for webskel: the client side of the web skeleton's auth API.
//!
//! - `auth`: the persisted `SessionStore` plus the sign-in/sign-out flows
//! - `api`: the `ApiClient` that attaches the session's bearer token
//! - `models`: the `User` record and auth payloads mirrored from the API
//! - `config`: base URL, storage backend and other user settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ApiResult, TokenSource};
pub use auth::{SessionState, SessionStore, StorageKind};
pub use config::Config;
pub use models::{RegisterRequest, Registration, TokenResponse, User};
