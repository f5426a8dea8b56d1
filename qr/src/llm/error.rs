//! Engine client errors

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The engine asked us to back off
    #[error("Engine rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Engine returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Connect failures and client-side timeouts both land here
    #[error("Engine unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Engine response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    #[error("Engine not configured: {0}")]
    Config(String),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) => true,
            LlmError::Status { status, .. } => *status == 408 || *status >= 500,
            LlmError::Decode(_) | LlmError::InvalidResponse(_) | LlmError::Config(_) => false,
        }
    }

    /// Server-requested delay, when there was one
    pub fn retry_after(&self) -> Option<Duration> {
        if let LlmError::RateLimited { retry_after } = self {
            Some(*retry_after)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> LlmError {
        LlmError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_server_side_failures_are_retryable() {
        assert!(status(503).is_retryable());
        assert!(status(408).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
    }

    #[test]
    fn test_local_failures_are_final() {
        assert!(!LlmError::InvalidResponse("empty".to_string()).is_retryable());
        assert!(!LlmError::Config("GEMINI_API_KEY not set".to_string()).is_retryable());
    }

    #[test]
    fn test_rate_limit_carries_delay() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(42),
        };
        assert!(err.is_rate_limit());
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(err.to_string(), "Engine rate limited, retry after 42s");
        assert_eq!(status(500).retry_after(), None);
    }
}
