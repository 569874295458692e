//! Ideation session: the staged workflow and its actor wrapper
//!
//! A `Workflow` owns one `Session` and advances it stage by stage. The
//! `SessionManager` runs each workflow in its own task for callers that
//! serve several sessions at once.

mod error;
mod expand;
mod explore;
pub mod input;
mod manager;
mod messages;
mod stage;
mod state;
mod statement;
mod workflow;

pub use error::SessionError;
pub use expand::FALLBACK_GUIDANCE;
pub use input::{InputField, InputOption, InputSpec, InputValues};
pub use manager::{SessionHandle, SessionManager};
pub use messages::{SessionCommand, SessionId, SessionResponse};
pub use stage::{NavigationChoice, NavigationError, Stage, StatementChoice};
pub use state::{ProblemContext, Session};
pub use workflow::{StepOutcome, Workflow, WorkflowConfig};
