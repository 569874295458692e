//! Completion service module for MindBranch
//!
//! Provides the `LlmClient` trait, provider clients and the text helper the
//! session stages call.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Supports "openai" and "anthropic" providers.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        "anthropic" => {
            debug!("create_client: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: openai, anthropic",
                other
            )))
        }
    }
}

/// Ask the completion service for plain text
///
/// Sends `history` followed by `user_prompt` under `system_prompt` and returns
/// the trimmed completion. An empty completion counts as an invalid response.
pub async fn complete_text(
    llm: &dyn LlmClient,
    system_prompt: &str,
    history: &[Message],
    user_prompt: &str,
    max_tokens: u32,
) -> Result<String, LlmError> {
    debug!(
        history_len = history.len(),
        prompt_len = user_prompt.len(),
        max_tokens,
        "complete_text: called"
    );

    let mut messages = history.to_vec();
    messages.push(Message::user(user_prompt));

    let request = CompletionRequest {
        system_prompt: system_prompt.to_string(),
        messages,
        max_tokens,
        temperature: None,
    };

    let response = llm.complete(request).await?;
    match response.content.map(|t| t.trim().to_string()) {
        Some(text) if !text.is_empty() => {
            debug!(text_len = text.len(), usage = ?response.usage, "complete_text: received text");
            Ok(text)
        }
        _ => {
            debug!("complete_text: empty completion");
            Err(LlmError::InvalidResponse("Empty completion".to_string()))
        }
    }
}
