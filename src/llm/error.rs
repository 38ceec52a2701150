//! Typed errors for chat backends
//!
//! Provides structured error types so the session controller can tell a
//! failed in-place reset apart from transport failures without string matching.

use thiserror::Error;

/// Chat backend errors with typed variants
///
/// - `Unauthorized` (401) - credential rejected; the user must reconfigure it
/// - `RateLimited` (429) - quota exceeded; can retry after delay
/// - `BadRequest` (400) - malformed request; caller error
/// - `ServiceError` (5xx) - server-side issue; can retry
/// - `Network` - connection/timeout; can retry
/// - `Other` - catch-all for unhandled errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The backend could not be constructed from the given credential
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Check if this error is retryable (after a delay)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::ServiceError(_) | LlmError::Network(_)
        )
    }

    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            let error_text = e.to_string();
            Self::from_http_status(status, error_text)
        } else {
            LlmError::Other(e.into())
        }
    }
}

/// A backend could not reset its conversation in place
///
/// Returned by [`super::ChatBackend::reset`]. The session controller never
/// propagates it; it builds a brand-new session instead.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Failed to reset chat session: {0}")]
pub struct SessionResetError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_is_retryable() {
        let err = LlmError::RateLimited("quota exceeded".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unauthorized_not_retryable() {
        let err = LlmError::Unauthorized("bad key".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_http_status() {
        let err = LlmError::from_http_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "Invalid token".to_string(),
        );
        assert!(matches!(err, LlmError::Unauthorized(_)));

        let err = LlmError::from_http_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded".to_string(),
        );
        assert!(matches!(err, LlmError::RateLimited(_)));

        let err =
            LlmError::from_http_status(reqwest::StatusCode::BAD_REQUEST, "Bad request".to_string());
        assert!(matches!(err, LlmError::BadRequest(_)));

        let err = LlmError::from_http_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "Server error".to_string(),
        );
        assert!(matches!(err, LlmError::ServiceError(_)));
    }

    #[test]
    fn test_reset_error_display() {
        let err = SessionResetError("stream closed".to_string());
        assert_eq!(err.to_string(), "Failed to reset chat session: stream closed");
    }
}
