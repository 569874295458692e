//! The session aggregate: everything one ideation run owns

use serde::Serialize;
use tracing::info;

use super::input::InputSpec;
use super::stage::Stage;
use crate::domain::{BranchId, BranchTree, MindmapNode, ThreadKind, ThreadRegistry, mindmap};
use crate::llm::Message;

/// Audience and problem, fixed once both are known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemContext {
    pub target_audience: String,
    pub problem: String,
}

/// Root aggregate of one workflow run
///
/// Only the workflow mutates it; readers get shared references.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) stage: Stage,
    pub(crate) problem: Option<ProblemContext>,
    /// Partial answers collected before the context is complete
    pub(crate) draft: super::input::InputValues,
    pub(crate) statement_a: Option<String>,
    pub(crate) statement_b: Option<String>,
    pub(crate) final_statement: Option<String>,
    pub(crate) pending_input: Option<InputSpec>,
    pub(crate) conversation: Vec<Message>,
    pub(crate) threads: Option<ThreadRegistry>,
    pub(crate) branches: BranchTree,
    pub(crate) active_thread: Option<ThreadKind>,
    pub(crate) active_branch: Option<BranchId>,
    pub(crate) feedback: Vec<String>,
    pub(crate) last_error: Option<String>,
}

impl Session {
    /// Fresh session whose audit log opens with the system persona
    pub fn new(system_prompt: &str) -> Self {
        Self {
            stage: Stage::CollectInput,
            problem: None,
            draft: Default::default(),
            statement_a: None,
            statement_b: None,
            final_statement: None,
            pending_input: None,
            conversation: vec![Message::system(system_prompt)],
            threads: None,
            branches: BranchTree::new(),
            active_thread: None,
            active_branch: None,
            feedback: Vec::new(),
            last_error: None,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn problem(&self) -> Option<&ProblemContext> {
        self.problem.as_ref()
    }

    pub fn statement_a(&self) -> Option<&str> {
        self.statement_a.as_deref()
    }

    pub fn statement_b(&self) -> Option<&str> {
        self.statement_b.as_deref()
    }

    pub fn final_statement(&self) -> Option<&str> {
        self.final_statement.as_deref()
    }

    pub fn pending_input(&self) -> Option<&InputSpec> {
        self.pending_input.as_ref()
    }

    /// Append-only audit trail of the whole session
    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn threads(&self) -> Option<&ThreadRegistry> {
        self.threads.as_ref()
    }

    pub fn branches(&self) -> &BranchTree {
        &self.branches
    }

    pub fn active_thread(&self) -> Option<ThreadKind> {
        self.active_thread
    }

    pub fn active_branch(&self) -> Option<BranchId> {
        self.active_branch
    }

    /// Error value left by the last stage that halted
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Feedback notes not yet shown to the user
    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }

    /// Drain the feedback queue
    pub fn take_feedback(&mut self) -> Vec<String> {
        std::mem::take(&mut self.feedback)
    }

    /// Mindmap derived from the current state, once threads exist
    pub fn mindmap(&self) -> Option<MindmapNode> {
        let statement = self.final_statement.as_deref()?;
        let threads = self.threads.as_ref()?;
        Some(mindmap::project(statement, threads, &self.branches))
    }

    /// Outline of all branches with markers for the active one
    pub fn branch_outline(&self) -> String {
        mindmap::outline(&self.branches, self.active_branch)
    }

    pub(crate) fn transition(&mut self, next: Stage) {
        info!(from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }

    pub(crate) fn note(&mut self, text: impl Into<String>) {
        self.feedback.push(text.into());
    }

    pub(crate) fn log_user(&mut self, text: impl Into<String>) {
        self.conversation.push(Message::user(text));
    }

    pub(crate) fn log_assistant(&mut self, text: impl Into<String>) {
        self.conversation.push(Message::assistant(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("persona");
        assert_eq!(session.stage(), &Stage::CollectInput);
        assert!(session.problem().is_none());
        assert!(session.final_statement().is_none());
        assert!(session.threads().is_none());
        assert!(session.branches().is_empty());
        assert!(session.mindmap().is_none());
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.conversation()[0].role, Role::System);
    }

    #[test]
    fn test_take_feedback_drains() {
        let mut session = Session::new("persona");
        session.note("one");
        session.note("two");
        assert_eq!(session.take_feedback(), vec!["one", "two"]);
        assert!(session.feedback().is_empty());
    }
}
