//! MindBranch - branching ideation sessions
//!
//! A session turns a target audience and a problem into two "How might we"
//! statements, lets the user pick one, then explores it through three fixed
//! lenses. Each lens produces top-level idea branches; any branch can be
//! expanded into sub-branches with optional guidance.
//!
//! # Modules
//!
//! - [`llm`] - Completion service trait and OpenAI/Anthropic clients
//! - [`prompts`] - Handlebars prompt templates with embedded defaults
//! - [`response`] - Resilient structured-response parser and schemas
//! - [`domain`] - Branch tree, exploration threads and mindmap projection
//! - [`session`] - Staged workflow and per-session actors
//! - [`driver`] - Human channels that run a workflow
//! - [`export`] - Mindmap JSON export
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod driver;
pub mod export;
pub mod llm;
pub mod prompts;
pub mod response;
pub mod session;

// Re-export commonly used types
pub use config::{Config, LlmConfig, SessionConfig};
pub use domain::{Branch, BranchId, BranchTree, DomainError, MindmapNode, ThreadKind, ThreadRegistry};
pub use driver::{ConsoleChannel, HumanChannel, run_workflow};
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, OpenAIClient, Role,
    create_client,
};
pub use prompts::{PromptContext, PromptLoader, Template};
pub use response::{StructuredResponse, parse};
pub use session::{
    InputSpec, InputValues, Session, SessionError, SessionHandle, SessionId, SessionManager, Stage, StepOutcome,
    Workflow, WorkflowConfig,
};
