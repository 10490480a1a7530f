//! REST API client module for the web skeleton's auth service.
//!
//! This module provides the `ApiClient` for the `/auth` endpoints under the
//! configured base URL (usually `.../api/v1`).
//!
//! Every request passes through `authorize`, which attaches the current
//! session token as a bearer credential.

pub mod client;
pub mod error;

pub use client::{authorize, ApiClient, TokenSource};
pub use error::{ApiError, ApiResult};
pub use reqwest::StatusCode;
