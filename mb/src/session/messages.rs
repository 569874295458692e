//! Session actor messages
//!
//! Commands and replies for the per-session actor.

use std::fmt;

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::SessionError;
use super::input::InputValues;
use super::state::Session;
use super::workflow::StepOutcome;

/// Identifier of a managed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Time-ordered id, so sessions sort by creation
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reply from the session actor
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to a session actor
#[derive(Debug)]
pub enum SessionCommand {
    Step {
        reply: oneshot::Sender<SessionResponse<StepOutcome>>,
    },
    Submit {
        values: InputValues,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Session>,
    },
    TakeFeedback {
        reply: oneshot::Sender<Vec<String>>,
    },
    /// End the session and stop the actor
    Terminate {
        reply: oneshot::Sender<Session>,
    },
}
