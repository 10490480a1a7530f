//! API client for the web skeleton's auth endpoints.
//!
//! This module provides the `ApiClient` struct, which sends every request
//! through `authorize` so the current session token rides along as a
//! bearer credential.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{RegisterRequest, Registration, TokenResponse, User};

use super::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";
const TEST_TOKEN_PATH: &str = "auth/test-token";

/// Where the client reads the bearer token from, right before each request.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A token pinned at construction time, used by `ApiClient::with_token`.
struct FixedToken(Option<String>);

impl TokenSource for FixedToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Attach `Authorization: Bearer <token>` when there is a token.
/// An empty token counts as no token.
pub fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => request.bearer_auth(token),
        _ => request,
    }
}

/// API client for the auth service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    /// Create a new API client reading tokens from `tokens`
    pub fn new(base_url: impl Into<String>, tokens: impl TokenSource + 'static) -> ApiResult<Self> {
        Self::with_request_timeout(base_url, tokens, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_request_timeout(
        base_url: impl Into<String>,
        tokens: impl TokenSource + 'static,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Arc::new(tokens),
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    /// The session store is not consulted by the returned client.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            tokens: Arc::new(FixedToken(Some(token))),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request to `path`, already authorized with the current token.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self.tokens.bearer_token();
        authorize(self.client.request(method, self.url(path)), token.as_deref())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> ApiResult<T> {
        debug!(path, "Sending request");
        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    // ===== Auth Endpoints =====

    /// Exchange email and password for a token. The endpoint is an OAuth2
    /// password form, so the email goes in the `username` field.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        let request = self
            .request(Method::POST, LOGIN_PATH)
            .form(&[("username", email), ("password", password)]);
        self.send(request, LOGIN_PATH).await
    }

    /// Create an account
    pub async fn register(&self, data: &RegisterRequest) -> ApiResult<Registration> {
        let request = self.request(Method::POST, REGISTER_PATH).json(data);
        self.send(request, REGISTER_PATH).await
    }

    /// Ask the server to echo the profile behind the current token
    pub async fn test_token(&self) -> ApiResult<User> {
        let request = self.request(Method::POST, TEST_TOKEN_PATH);
        self.send(request, TEST_TOKEN_PATH).await
    }
}
