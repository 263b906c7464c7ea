//! Capability Error Types
//!
//! Error taxonomy shared by every `LlmCapability` implementation, with the
//! retryability classification used by `RetryingCapability` and
//! `FallbackChain`.

use thiserror::Error;

/// Errors a text capability can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Rate limit exceeded
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// The call exceeded its deadline
    #[error("Timed out: {message}")]
    Timeout { message: String },

    /// Invalid request (bad parameters)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Server error from the provider
    #[error("Server error: {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Network/connection error
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Response parsing error
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Provider not available (e.g., local server not running)
    #[error("Provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// Other error
    #[error("{message}")]
    Other { message: String },
}

/// Result type alias for capability operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Whether a retry of the same capability can plausibly succeed.
    ///
    /// Authentication and request-shape errors are permanent; transient
    /// transport conditions are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. }
                | LlmError::Timeout { .. }
                | LlmError::NetworkError { .. }
                | LlmError::ProviderUnavailable { .. }
                | LlmError::ServerError {
                    status: None | Some(502..=504),
                    ..
                }
        )
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout {
            message: msg.into(),
        }
    }

    /// Create an other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(LlmError::RateLimited {
            message: "too many requests".to_string(),
            retry_after: Some(60),
        }
        .is_retryable());
        assert!(LlmError::timeout("deadline exceeded").is_retryable());
        assert!(LlmError::NetworkError {
            message: "connection reset".to_string(),
        }
        .is_retryable());
        assert!(LlmError::ServerError {
            message: "bad gateway".to_string(),
            status: Some(502),
        }
        .is_retryable());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!LlmError::AuthenticationFailed {
            message: "invalid key".to_string(),
        }
        .is_retryable());
        assert!(!LlmError::InvalidRequest {
            message: "bad prompt".to_string(),
        }
        .is_retryable());
        assert!(!LlmError::ParseError {
            message: "garbled".to_string(),
        }
        .is_retryable());
        assert!(!LlmError::ServerError {
            message: "conflict".to_string(),
            status: Some(409),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LlmError::timeout("step exceeded 30s");
        assert_eq!(err.to_string(), "Timed out: step exceeded 30s");
    }
}
