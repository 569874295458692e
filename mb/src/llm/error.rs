//! Completion service error types

use std::time::Duration;
use thiserror::Error;

/// Why a completion could not be produced
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited by the completion service")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// How long the service asked us to wait, if it said
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// One-line text for a feedback note, including any requested wait
    pub fn feedback(&self) -> String {
        match self.retry_after() {
            Some(wait) => format!("{self}. Try again in {}s.", wait.as_secs()),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_feedback_names_wait() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(err.feedback(), "Rate limited by the completion service. Try again in 42s.");
    }

    #[test]
    fn test_other_errors_feedback_is_display() {
        let err = LlmError::ApiError {
            status: 503,
            message: "Unavailable".to_string(),
        };
        assert_eq!(err.retry_after(), None);
        assert_eq!(err.feedback(), "API error 503: Unavailable");
    }
}
