//! Branch selection, concept guidance and concept expansion

use tracing::{debug, info, warn};

use super::error::SessionError;
use super::input::{CONCEPT_GUIDANCE, InputField, InputSpec};
use super::stage::Stage;
use super::statement::strip_quotes;
use super::workflow::{StepOutcome, Workflow};
use crate::domain::{Branch, BranchId};
use crate::prompts::{PromptContext, Template};
use crate::response::{self, ExpansionSchema, StructuredResponse, format_expansion};

/// Suggested guidance when the service can't produce one
pub const FALLBACK_GUIDANCE: &str = "What are the most promising directions to explore within this concept?";

impl Workflow {
    fn branch(&self, id: BranchId) -> Result<Branch, SessionError> {
        Ok(self.session.branches.get(id)?.clone())
    }

    fn perspective(branch: &Branch) -> &'static str {
        branch.thread.name()
    }

    /// Make `id` active; replay a stored expansion or ask for guidance
    pub(crate) async fn select_branch(&mut self, id: BranchId) -> Result<StepOutcome, SessionError> {
        debug!(%id, "Workflow::select_branch: called");
        let branch = match self.branch(id) {
            Ok(branch) => branch,
            Err(e) => {
                self.session.note(e.to_string());
                self.session.transition(Stage::AwaitThreadOrBranch);
                return Err(e);
            }
        };
        let Some(statement) = self.session.final_statement.clone() else {
            return Err(self.invalid("select a branch"));
        };

        if branch.expanded
            && let Some(payload) = &branch.expansion
        {
            info!(%id, "Branch already expanded, showing stored expansion");
            self.activate(&branch);
            self.session
                .log_assistant(format_expansion(&branch.heading, &id.to_string(), payload));
            self.session.transition(Stage::AwaitThreadOrBranch);
            return Ok(StepOutcome::Advanced);
        }

        // Nothing is touched until the suggestion is in hand
        let suggested = self.suggest_guidance(&branch, &statement).await?;
        self.activate(&branch);
        self.session.log_assistant(format!(
            "Selected branch {id}: {}. Please provide any specific guidance for expanding this concept, \
             or press Enter to use default guidance.",
            branch.heading
        ));
        self.session
            .transition(Stage::AwaitConceptGuidance { branch: id, suggested });
        Ok(StepOutcome::Advanced)
    }

    fn activate(&mut self, branch: &Branch) {
        self.session.active_branch = Some(branch.id);
        self.session.active_thread = Some(branch.thread);
        self.session
            .log_user(format!("I want to explore branch {}: {}", branch.id, branch.heading));
    }

    /// One clarifying question about the branch; never fails on service errors
    async fn suggest_guidance(&self, branch: &Branch, statement: &str) -> Result<String, SessionError> {
        let context = PromptContext::for_concept(statement, &branch.concept(), Self::perspective(branch), "");
        let prompt = self.render(Template::DefaultGuidance, &context)?;
        match self.complete(&[], &prompt, self.config.guidance_max_tokens).await {
            Ok(text) => Ok(strip_quotes(&text)),
            Err(e) => {
                warn!(branch = %branch.id, error = %e, "Default guidance failed, using fallback");
                Ok(FALLBACK_GUIDANCE.to_string())
            }
        }
    }

    pub(crate) fn declare_guidance(&mut self, branch: BranchId, suggested: String) -> StepOutcome {
        let heading = self
            .session
            .branches
            .get(branch)
            .map(|b| b.heading.clone())
            .unwrap_or_default();
        let prompt = format!(
            "How would you like to expand branch {branch}: {heading}?\n\
             (Enter your guidance or press Enter to use the suggestion below)\n\n\
             Suggested guidance: {suggested}"
        );
        self.declare(InputSpec::new(vec![InputField::optional(
            CONCEPT_GUIDANCE,
            prompt,
            Some(suggested),
        )]))
    }

    /// Blank guidance falls back to the suggestion verbatim
    pub(crate) fn accept_guidance(&mut self, branch: BranchId, suggested: String, guidance: Option<String>) {
        debug!(%branch, custom = guidance.is_some(), "Workflow::accept_guidance: called");
        let guidance = match guidance {
            Some(text) => {
                self.session.log_user(text.as_str());
                text
            }
            None => {
                self.session.log_user("Please proceed with default guidance.");
                suggested
            }
        };
        self.session.transition(Stage::ExpandConcept { branch, guidance });
    }

    /// Ask for three sub-concepts and attach them under the branch
    ///
    /// Unstructured output still marks the branch expanded, storing the raw
    /// text and creating no children.
    pub(crate) async fn expand_concept(&mut self, id: BranchId, guidance: String) -> Result<StepOutcome, SessionError> {
        debug!(%id, "Workflow::expand_concept: called");
        let branch = match self.branch(id) {
            Ok(branch) => branch,
            Err(e) => {
                self.session.note(e.to_string());
                self.session.transition(Stage::AwaitThreadOrBranch);
                return Err(e);
            }
        };
        let Some(statement) = self.session.final_statement.clone() else {
            return Err(self.invalid("expand a concept"));
        };

        let context = PromptContext::for_concept(&statement, &branch.concept(), Self::perspective(&branch), &guidance);
        let prompt = self.render(Template::ConceptExpansion, &context)?;
        let text = match self.complete(&[], &prompt, self.config.structured_max_tokens).await {
            Ok(text) => text,
            Err(e) => {
                let err = self.service_failed("Error during concept expansion", e);
                self.session.transition(Stage::AwaitThreadOrBranch);
                return Err(err);
            }
        };

        let parsed = response::parse(&text);
        let (payload, seeds) = match parsed.value().map(ExpansionSchema::decode) {
            Some(Ok(schema)) => {
                let value = parsed.value().map(ExpansionSchema::normalized).unwrap_or_default();
                (StructuredResponse::Structured(value), schema.seeds())
            }
            Some(Err(e)) => {
                warn!(%id, error = %e, "Expansion did not match its schema");
                (StructuredResponse::degraded(text.as_str()), Vec::new())
            }
            None => {
                warn!(%id, "Expansion response was not structured");
                (StructuredResponse::degraded(text.as_str()), Vec::new())
            }
        };

        let degraded = payload.is_degraded();
        let summary = format_expansion(&branch.heading, &id.to_string(), &payload);
        let children = match self.session.branches.record_expansion(id, seeds, payload) {
            Ok(children) => children,
            Err(e) => {
                self.session.note(e.to_string());
                self.session.transition(Stage::AwaitThreadOrBranch);
                return Err(e.into());
            }
        };

        if degraded {
            self.session.note(format!(
                "Expanded concept '{}', but couldn't extract structured data.",
                branch.heading
            ));
        } else {
            info!(%id, children = children.len(), "Concept expanded");
            self.session.note(format!(
                "Successfully expanded concept '{}' and created {} sub-branches.",
                branch.heading,
                children.len()
            ));
        }
        self.session.log_assistant(summary);
        self.session.last_error = None;
        self.session.transition(Stage::AwaitThreadOrBranch);
        Ok(StepOutcome::Advanced)
    }
}
