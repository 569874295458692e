//! SessionManager - one actor per session
//!
//! Each session's workflow lives in its own task and handles one command at
//! a time, so stages never run concurrently within a session while separate
//! sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, info};

use super::error::SessionError;
use super::input::InputValues;
use super::messages::{SessionCommand, SessionId, SessionResponse};
use super::state::Session;
use super::workflow::{StepOutcome, Workflow, WorkflowConfig};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

/// Handle to a single session actor
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Run the session's current stage
    pub async fn step(&self) -> SessionResponse<StepOutcome> {
        debug!(id = %self.id, "SessionHandle::step: called");
        self.request(|reply| SessionCommand::Step { reply }).await?
    }

    /// Submit collected input
    pub async fn submit(&self, values: InputValues) -> SessionResponse<()> {
        debug!(id = %self.id, "SessionHandle::submit: called");
        self.request(|reply| SessionCommand::Submit { values, reply }).await?
    }

    /// Copy of the session as it stands
    pub async fn snapshot(&self) -> SessionResponse<Session> {
        debug!(id = %self.id, "SessionHandle::snapshot: called");
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Drain pending feedback notes
    pub async fn take_feedback(&self) -> SessionResponse<Vec<String>> {
        debug!(id = %self.id, "SessionHandle::take_feedback: called");
        self.request(|reply| SessionCommand::TakeFeedback { reply }).await
    }

    /// End the session; returns its final state
    pub async fn terminate(&self) -> SessionResponse<Session> {
        debug!(id = %self.id, "SessionHandle::terminate: called");
        self.request(|reply| SessionCommand::Terminate { reply }).await
    }
}

/// Creates sessions and routes to them by id
#[derive(Clone)]
pub struct SessionManager {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    config: WorkflowConfig,
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl SessionManager {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: WorkflowConfig) -> Self {
        debug!(?config, "SessionManager::new: called");
        Self {
            llm,
            prompts,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a new session in its own actor task
    pub async fn create(&self) -> SessionResponse<SessionHandle> {
        debug!("SessionManager::create: called");
        let workflow = Workflow::new(self.llm.clone(), self.prompts.clone(), self.config)?;
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(actor_loop(id, workflow, rx));

        let handle = SessionHandle { id, tx };
        self.sessions.write().await.insert(id, handle.clone());
        info!(%id, "Session created");
        Ok(handle)
    }

    pub async fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Terminate a session and forget it
    pub async fn remove(&self, id: SessionId) -> SessionResponse<Session> {
        debug!(%id, "SessionManager::remove: called");
        let handle = self.sessions.write().await.remove(&id).ok_or(SessionError::ChannelClosed)?;
        let session = handle.terminate().await?;
        info!(%id, "Session removed");
        Ok(session)
    }
}

async fn actor_loop(id: SessionId, mut workflow: Workflow, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!(%id, "Session actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::Step { reply } => {
                debug!(%id, "actor_loop: Step command");
                let result = workflow.step().await;
                let _ = reply.send(result);
            }
            SessionCommand::Submit { values, reply } => {
                debug!(%id, "actor_loop: Submit command");
                let _ = reply.send(workflow.submit(values));
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(workflow.session().clone());
            }
            SessionCommand::TakeFeedback { reply } => {
                let _ = reply.send(workflow.take_feedback());
            }
            SessionCommand::Terminate { reply } => {
                debug!(%id, "actor_loop: Terminate command");
                workflow.terminate();
                let _ = reply.send(workflow.session().clone());
                break;
            }
        }
    }

    debug!(%id, "Session actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::session::input::{PROBLEM, TARGET_AUDIENCE};
    use crate::session::stage::Stage;

    fn manager(texts: &[&str]) -> SessionManager {
        SessionManager::new(
            Arc::new(MockLlmClient::with_texts(texts.iter().copied())),
            Arc::new(PromptLoader::embedded_only()),
            WorkflowConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let manager = manager(&["How might we A?", "How might we B?"]);
        let first = manager.create().await.unwrap();
        let second = manager.create().await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(manager.ids().await.len(), 2);

        first.step().await.unwrap();
        let mut values = InputValues::new();
        values.insert(TARGET_AUDIENCE.to_string(), "students".to_string());
        values.insert(PROBLEM.to_string(), "loneliness".to_string());
        first.submit(values).await.unwrap();
        first.step().await.unwrap();

        let a = first.snapshot().await.unwrap();
        let b = second.snapshot().await.unwrap();
        assert_eq!(a.statement_a(), Some("How might we A?"));
        assert_eq!(b.stage(), &Stage::CollectInput);
    }

    #[tokio::test]
    async fn test_removed_session_is_closed() {
        let manager = manager(&[]);
        let handle = manager.create().await.unwrap();
        let session = manager.remove(handle.id()).await.unwrap();
        assert!(session.stage().is_terminal());
        assert!(manager.get(handle.id()).await.is_none());
        assert!(matches!(handle.step().await, Err(SessionError::ChannelClosed)));
    }
}
