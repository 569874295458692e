//! Session error types

use thiserror::Error;

use super::input::InputSpec;
use crate::domain::DomainError;
use crate::llm::LlmError;

/// Errors surfaced by workflow stages
///
/// None of these leave the session half-updated; every variant except
/// `InvalidState`, `Prompt` and `ChannelClosed` lets the session continue.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing required input: {}", fields.join(", "))]
    MissingInput { fields: Vec<String>, spec: InputSpec },

    #[error("Completion service failed during {stage}: {source}")]
    Service {
        stage: &'static str,
        #[source]
        source: LlmError,
    },

    #[error(transparent)]
    NotFound(#[from] DomainError),

    #[error("{0}")]
    AmbiguousChoice(String),

    #[error("Cannot {action} at stage {stage}")]
    InvalidState { stage: &'static str, action: &'static str },

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Session channel closed")]
    ChannelClosed,
}

impl SessionError {
    /// Whether the session can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::Service { .. } | Self::NotFound(_) | Self::AmbiguousChoice(_)
        )
    }

    /// Service errors leave the stage in place so it can be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    pub(crate) fn prompt(err: eyre::Report) -> Self {
        Self::Prompt(err.to_string())
    }
}
