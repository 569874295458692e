//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// The completion service collaborator
///
/// Each call is independent: the caller passes the full history it wants the
/// model to see. Retry and rate-limit behaviour belong to the implementation;
/// callers only see the final `Result`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
