//! Domain model: branches, exploration threads and the mindmap projection

use thiserror::Error;

mod branch;
pub mod mindmap;
mod thread;

pub use branch::{Branch, BranchId, BranchSeed, BranchSource, BranchTree};
pub use mindmap::MindmapNode;
pub use thread::{ExplorationThread, ThreadKind, ThreadOption, ThreadRegistry, ThreadStatus};

/// Errors from branch and thread lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Branch {0} does not exist.")]
    NotFound(BranchId),

    #[error("Unknown thread: {0}")]
    UnknownThread(String),

    #[error("Invalid branch selection '{0}'. Use 'b' followed by the branch number (e.g., b1, b2).")]
    InvalidBranchId(String),

    #[error("Branch {0} has already been expanded")]
    AlreadyExpanded(BranchId),
}
