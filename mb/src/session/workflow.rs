//! Workflow controller: drives one session through its stages
//!
//! The driver alternates between two calls:
//! - `step` runs the current stage. Input stages declare what they need and
//!   return `StepOutcome::NeedsInput`; work stages call the completion service
//!   and move on.
//! - `submit` feeds collected values to the stage that declared them.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::SessionError;
use super::input::{CONCEPT_GUIDANCE, InputSpec, InputValues};
use super::stage::Stage;
use super::state::Session;
use crate::config::SessionConfig;
use crate::llm::{self, LlmClient, LlmError, Message};
use crate::prompts::{PromptContext, PromptLoader, Template};

/// Token budgets for each kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub statement_max_tokens: u32,
    pub structured_max_tokens: u32,
    pub guidance_max_tokens: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for WorkflowConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            statement_max_tokens: config.statement_max_tokens,
            structured_max_tokens: config.structured_max_tokens,
            guidance_max_tokens: config.guidance_max_tokens,
        }
    }
}

/// What a call to `step` produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The session waits for these values
    NeedsInput(InputSpec),
    /// A stage ran and the session moved on
    Advanced,
    /// The session is over
    Ended,
}

/// Owns a session and the collaborators its stages call
pub struct Workflow {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) prompts: Arc<PromptLoader>,
    pub(crate) config: WorkflowConfig,
    pub(crate) system_prompt: String,
    pub(crate) session: Session,
}

impl Workflow {
    /// Start a new session
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        config: WorkflowConfig,
    ) -> Result<Self, SessionError> {
        debug!(?config, "Workflow::new: called");
        let system_prompt = prompts.system_prompt().map_err(SessionError::prompt)?;
        let session = Session::new(&system_prompt);
        Ok(Self {
            llm,
            prompts,
            config,
            system_prompt,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stage(&self) -> &Stage {
        self.session.stage()
    }

    pub fn take_feedback(&mut self) -> Vec<String> {
        self.session.take_feedback()
    }

    pub fn is_ended(&self) -> bool {
        self.session.stage.is_terminal()
    }

    /// Run the current stage
    pub async fn step(&mut self) -> Result<StepOutcome, SessionError> {
        debug!(stage = %self.session.stage, "Workflow::step: called");
        let stage = self.session.stage.clone();
        match stage {
            Stage::CollectInput => Ok(self.declare(InputSpec::problem_context())),
            Stage::GenerateStatementA => self.generate_statement_a().await,
            Stage::GenerateStatementB => self.generate_statement_b().await,
            Stage::AwaitChoice => Ok(self.declare_statement_choice()),
            Stage::PresentThreads => Ok(self.present_threads()),
            Stage::AwaitThreadOrBranch => Ok(self.declare_navigation()),
            Stage::ExploreThread(kind) => self.explore_thread(kind).await,
            Stage::SelectBranch(id) => self.select_branch(id).await,
            Stage::AwaitConceptGuidance { branch, suggested } => Ok(self.declare_guidance(branch, suggested)),
            Stage::ExpandConcept { branch, guidance } => self.expand_concept(branch, guidance).await,
            Stage::Ended => Ok(StepOutcome::Ended),
        }
    }

    /// Feed collected values to the stage waiting for them
    pub fn submit(&mut self, values: InputValues) -> Result<(), SessionError> {
        debug!(stage = %self.session.stage, field_count = values.len(), "Workflow::submit: called");
        let Some(spec) = self.session.pending_input.clone() else {
            return Err(self.invalid("submit input"));
        };

        let stage = self.session.stage.clone();

        // Audience and problem are checked when statement A is generated
        if !matches!(stage, Stage::CollectInput | Stage::GenerateStatementA) {
            let missing = spec.missing(&values);
            if !missing.is_empty() {
                debug!(?missing, "Workflow::submit: required fields missing");
                return Err(SessionError::MissingInput { fields: missing, spec });
            }
        }
        self.session.pending_input = None;

        match stage {
            Stage::CollectInput | Stage::GenerateStatementA => {
                self.accept_problem_context(values);
                Ok(())
            }
            Stage::AwaitChoice => self.accept_statement_choice(&values),
            Stage::AwaitThreadOrBranch => self.accept_navigation(&values),
            Stage::AwaitConceptGuidance { branch, suggested } => {
                let guidance = super::input::value_of(&values, CONCEPT_GUIDANCE).map(str::to_string);
                self.accept_guidance(branch, suggested, guidance);
                Ok(())
            }
            _ => Err(self.invalid("submit input")),
        }
    }

    /// End the session from outside (EOF, interrupt)
    pub fn terminate(&mut self) {
        debug!("Workflow::terminate: called");
        if !self.session.stage.is_terminal() {
            self.session.pending_input = None;
            self.session.transition(Stage::Ended);
            self.session.note("Ideation session ended.");
        }
    }

    /// Declare `spec` as pending and hand it to the driver
    pub(crate) fn declare(&mut self, spec: InputSpec) -> StepOutcome {
        self.session.pending_input = Some(spec.clone());
        StepOutcome::NeedsInput(spec)
    }

    pub(crate) fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidState {
            stage: self.session.stage.name(),
            action,
        }
    }

    pub(crate) fn render(&self, template: Template, context: &PromptContext) -> Result<String, SessionError> {
        self.prompts.render(template, context).map_err(SessionError::prompt)
    }

    /// One completion call under the session persona
    pub(crate) async fn complete(
        &self,
        history: &[Message],
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        llm::complete_text(self.llm.as_ref(), &self.system_prompt, history, user_prompt, max_tokens).await
    }

    /// Record a failed service call as user-visible feedback
    pub(crate) fn service_failed(&mut self, prefix: &str, err: LlmError) -> SessionError {
        warn!(stage = %self.session.stage, error = %err, "Completion service failed");
        let stage = self.session.stage.name();
        let message = format!("{prefix}: {}", err.feedback());
        self.session.note(message.clone());
        self.session.last_error = Some(message);
        SessionError::Service { stage, source: err }
    }
}
