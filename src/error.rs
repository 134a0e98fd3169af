//! Error Types
//!
//! Every failure the client can report, grouped so callers can branch on
//! configuration, transport, API, decode and stream problems separately.

use std::fmt;

/// Main error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum DeepseekError {
    /// Configuration errors (missing base URL or path, bad timeout string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request body could not be serialized
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Network-level failure (DNS, connection refused, TLS)
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not complete within the client timeout
    #[error(
        "Request timed out: {0}. Raise the client timeout or set DEEPSEEK_TIMEOUT (e.g. \"10m\")"
    )]
    Timeout(String),

    /// Non-success status returned by the API
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Body could not be decoded into the expected type
    #[error("Failed to decode response: {message}. Raw data: {body}")]
    Decode { message: String, body: String },

    /// Reading the stream body failed before it terminated
    #[error("Error reading stream: {0}")]
    StreamRead(#[source] std::io::Error),

    /// The stream was closed or its cancellation token fired
    #[error("Stream cancelled")]
    Cancelled,
}

impl DeepseekError {
    /// Whether this error is a timeout expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeepseekError::Timeout(_))
    }

    /// The API error, if the server answered with a failure status
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            DeepseekError::Api(err) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn decode(message: impl fmt::Display, body: impl Into<String>) -> Self {
        DeepseekError::Decode {
            message: message.to_string(),
            body: body.into(),
        }
    }
}

/// Failure response returned by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,

    /// Business error code from the response envelope
    pub code: Option<i64>,

    /// Human-readable error message
    pub message: String,

    /// Raw response body, kept for diagnostics
    pub body: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "HTTP {} (code {}): {}", self.status, code, self.message),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for DeepseekError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeepseekError::Timeout(err.to_string())
        } else {
            DeepseekError::Transport(err)
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, DeepseekError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_with_code() {
        let err = ApiError {
            status: 402,
            code: Some(40201),
            message: "Insufficient Balance".to_string(),
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP 402 (code 40201): Insufficient Balance");
    }

    #[test]
    fn test_api_error_display_without_code() {
        let err = DeepseekError::from(ApiError {
            status: 500,
            code: None,
            message: "Internal server error".to_string(),
            body: "oops".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 500: Internal server error");
        assert_eq!(err.api_error().map(|e| e.status), Some(500));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_decode_error_keeps_payload() {
        let err = DeepseekError::decode("expected value", "not-json");
        assert!(err.to_string().contains("not-json"));
        assert!(err.api_error().is_none());
    }
}
