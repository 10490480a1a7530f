use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Every failed API call surfaces as `RequestFailed`, whatever went wrong.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {message}")]
    RequestFailed {
        /// HTTP status, if the server answered at all
        status: Option<StatusCode>,
        /// Server status text, or the transport error
        message: String,
        /// `detail` field of the error body, when present
        detail: Option<String>,
    },
}

/// Maximum length for error details in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull `detail` out of a FastAPI-style error body. Validation errors
    /// carry a list there; it is kept as raw JSON.
    fn parse_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        let detail = match parsed.detail {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => return None,
            other => other.to_string(),
        };
        Some(Self::truncate_body(&detail))
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_u16().to_string());
        ApiError::RequestFailed {
            status: Some(status),
            message,
            detail: Self::parse_detail(body),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::RequestFailed { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::RequestFailed { message, .. } => message,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::RequestFailed { detail, .. } => detail.as_deref(),
        }
    }

    /// True when the server rejected the credentials or the token.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::RequestFailed {
            status: err.status(),
            message: err.to_string(),
            detail: None,
        }
    }
}
