//! Thread menu and thread exploration

use tracing::{debug, info, warn};

use super::error::SessionError;
use super::input::{InputField, InputOption, InputSpec, InputValues, THREAD_CHOICE, value_of};
use super::stage::{NavigationChoice, NavigationError, Stage};
use super::workflow::{StepOutcome, Workflow};
use crate::domain::{DomainError, ThreadKind};
use crate::llm::{Message, Role};
use crate::prompts::PromptContext;
use crate::response::{self, ExplorationSchema, StructuredResponse};

const INVALID_NAVIGATION: &str = "Invalid choice. Please select 1 (Emotional Root Causes), 2 (Unconventional Associations), \
or 3 (Imaginary Customers' Feedback), or select a branch by its index (b1, b2, etc.).";

impl Workflow {
    pub(crate) fn declare_navigation(&mut self) -> StepOutcome {
        let active = self.session.active_thread;
        let options = self
            .session
            .threads
            .as_ref()
            .map(|threads| {
                threads
                    .options(active)
                    .into_iter()
                    .map(|opt| InputOption::new(opt.kind.number().to_string(), opt.label()))
                    .collect()
            })
            .unwrap_or_default();

        let spec = InputSpec::new(vec![InputField::required(
            THREAD_CHOICE,
            "Choose an exploration approach (1-3), a branch id (e.g. b1), or 'stop':",
        )])
        .with_options(options);
        self.declare(spec)
    }

    /// Route a menu answer to a thread, a branch or the end of the session
    pub(crate) fn accept_navigation(&mut self, values: &InputValues) -> Result<(), SessionError> {
        let answer = value_of(values, THREAD_CHOICE).unwrap_or_default();
        debug!(%answer, "Workflow::accept_navigation: called");

        match NavigationChoice::parse(answer) {
            Ok(NavigationChoice::Thread(kind)) => {
                self.session.transition(Stage::ExploreThread(kind));
                Ok(())
            }
            Ok(NavigationChoice::Branch(id)) => {
                if let Err(e) = self.session.branches.get(id) {
                    self.session.note(e.to_string());
                    return Err(e.into());
                }
                self.session.transition(Stage::SelectBranch(id));
                Ok(())
            }
            Ok(NavigationChoice::Stop) => {
                self.session.note("Ideation session ended.");
                self.session.transition(Stage::Ended);
                Ok(())
            }
            Err(NavigationError::BadBranchId(raw)) => {
                let err = DomainError::InvalidBranchId(raw);
                self.session.note(err.to_string());
                Err(err.into())
            }
            Err(NavigationError::Unrecognized(raw)) => {
                warn!(answer = %raw, "Unrecognized navigation choice");
                self.session.note(INVALID_NAVIGATION);
                Err(SessionError::AmbiguousChoice(raw))
            }
        }
    }

    /// Explore one thread and turn the response into top-level branches
    ///
    /// Nothing is touched until the service answers, so a failed call leaves
    /// the previous exploration and its branches in place.
    pub(crate) async fn explore_thread(&mut self, kind: ThreadKind) -> Result<StepOutcome, SessionError> {
        debug!(%kind, "Workflow::explore_thread: called");
        let Some(statement) = self.session.final_statement.clone() else {
            return Err(self.invalid("explore a thread"));
        };
        let Some(thread) = self.session.threads.as_ref().map(|t| t.get(kind)) else {
            return Err(self.invalid("explore a thread"));
        };

        let already_explored = thread.is_explored();
        let lens = format!(
            "Let's explore the problem statement through the lens of {}{}",
            kind.name(),
            if already_explored { " again" } else { "" }
        );
        let mut history: Vec<Message> = thread.log.iter().filter(|m| m.role != Role::System).cloned().collect();
        history.push(Message::user(lens.as_str()));

        let prompt = self.render(kind.template(), &PromptContext::for_statement(&statement))?;
        let text = match self.complete(&history, &prompt, self.config.structured_max_tokens).await {
            Ok(text) => text,
            Err(e) => {
                let err = self.service_failed(&format!("Error during {} exploration", kind.name()), e);
                self.session.transition(Stage::AwaitThreadOrBranch);
                return Err(err);
            }
        };

        if already_explored {
            self.session.branches.reset_thread(kind);
            self.session.log_user(format!("I'd like to regenerate ideas for the {} approach.", kind.name()));
        }

        let parsed = response::parse(&text);
        let decoded = parsed.value().map(|v| ExplorationSchema::decode(kind, v));
        let exploration = match decoded {
            Some(Ok(schema)) => {
                let seeds = schema.seeds();
                let count = seeds.len();
                for seed in seeds {
                    self.session.branches.add_top_level(kind, seed);
                }
                info!(%kind, branches = count, "Thread explored");
                self.session.note(format!(
                    "Successfully explored the {} approach and created {count} branches.",
                    kind.name()
                ));
                parsed
            }
            other => {
                if let Some(Err(e)) = other {
                    warn!(%kind, error = %e, "Exploration did not match its schema");
                } else {
                    warn!(%kind, "Exploration response was not structured");
                }
                self.session.note(format!(
                    "Explored the {} approach, but couldn't extract structured data.",
                    kind.name()
                ));
                StructuredResponse::degraded(text.as_str())
            }
        };

        if let Some(threads) = self.session.threads.as_mut() {
            let thread = threads.get_mut(kind);
            thread.log.push(Message::user(lens));
            thread.log.push(Message::assistant(text));
            thread.exploration = Some(exploration);
        }
        self.session
            .log_assistant(format!("Explored '{statement}' through the {} approach.", kind.name()));

        self.session.active_thread = Some(kind);
        self.session.active_branch = None;
        self.session.last_error = None;
        self.session.transition(Stage::AwaitThreadOrBranch);
        Ok(StepOutcome::Advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BranchId;
    use crate::llm::client::mock::{MockLlmClient, MockReply};
    use crate::prompts::PromptLoader;
    use crate::session::input::{CHOICE, PROBLEM, TARGET_AUDIENCE};
    use crate::session::workflow::WorkflowConfig;
    use std::sync::Arc;

    const HMW_A: &str = "How might we help students meet mentors?";
    const HMW_B: &str = "How might we bring mentors to campus?";

    fn thread_one_json() -> String {
        serde_json::json!({
            "emotionalSeeds": [{"heading": "Fear", "explanation": "Fear of rejection", "productDirection": "Warm intros"}],
            "habitHeuristicAlignment": [{"heading": "Habit", "explanation": "Scrolling", "productDirection": "Feed of mentors"}],
            "delightfulSubversion": [{"heading": "Flip", "explanation": "Mentors reach out", "productDirection": "Reverse match"}]
        })
        .to_string()
    }

    fn values(name: &str, value: &str) -> InputValues {
        let mut v = InputValues::new();
        v.insert(name.to_string(), value.to_string());
        v
    }

    /// Workflow parked at the thread menu with `extra` replies queued
    async fn at_menu(extra: Vec<MockReply>) -> (Workflow, Arc<MockLlmClient>) {
        let mut replies: Vec<MockReply> = vec![HMW_A.into(), HMW_B.into()];
        replies.extend(extra);
        let mock = Arc::new(MockLlmClient::new(replies));
        let mut wf = Workflow::new(
            mock.clone(),
            Arc::new(PromptLoader::embedded_only()),
            WorkflowConfig::default(),
        )
        .unwrap();

        wf.step().await.unwrap();
        let mut inputs = values(TARGET_AUDIENCE, "students");
        inputs.insert(PROBLEM.to_string(), "no mentors".to_string());
        wf.submit(inputs).unwrap();
        wf.step().await.unwrap();
        wf.step().await.unwrap();
        wf.step().await.unwrap();
        wf.submit(values(CHOICE, "1")).unwrap();
        wf.step().await.unwrap();
        wf.take_feedback();
        (wf, mock)
    }

    #[tokio::test]
    async fn test_menu_lists_threads() {
        let (mut wf, _) = at_menu(vec![]).await;
        let StepOutcome::NeedsInput(spec) = wf.step().await.unwrap() else {
            panic!("expected input request");
        };
        assert_eq!(spec.fields[0].name, THREAD_CHOICE);
        assert_eq!(spec.options.len(), 3);
        assert_eq!(spec.options[2].key, "3");
        assert!(spec.options[2].label.starts_with("Imaginary Customers' Feedback: "));
    }

    #[tokio::test]
    async fn test_explore_creates_branches() {
        let (mut wf, mock) = at_menu(vec![thread_one_json().into()]).await;
        wf.step().await.unwrap();
        wf.submit(values(THREAD_CHOICE, "1")).unwrap();
        wf.step().await.unwrap();

        let session = wf.session();
        assert_eq!(session.branches().len(), 3);
        assert!(session.branches().iter().all(|b| b.thread == ThreadKind::EmotionalRootCauses && b.parent.is_none()));
        assert_eq!(session.active_thread(), Some(ThreadKind::EmotionalRootCauses));
        assert_eq!(wf.stage(), &Stage::AwaitThreadOrBranch);

        let request = mock.requests().pop().unwrap();
        assert!(request.last_user_text().unwrap().contains(HMW_A));
        assert_eq!(
            request.messages[0].content,
            "Let's explore the problem statement through the lens of Emotional Root Causes"
        );
    }

    #[tokio::test]
    async fn test_degraded_exploration_keeps_raw_text() {
        let (mut wf, _) = at_menu(vec!["I'd rather chat about this.".into()]).await;
        wf.step().await.unwrap();
        wf.submit(values(THREAD_CHOICE, "2")).unwrap();
        wf.step().await.unwrap();

        assert!(wf.session().branches().is_empty());
        let thread = wf.session().threads().unwrap().get(ThreadKind::UnconventionalAssociations);
        assert_eq!(
            thread.exploration.as_ref().and_then(|e| e.raw_response()),
            Some("I'd rather chat about this.")
        );
        assert_eq!(
            wf.take_feedback(),
            vec!["Explored the Unconventional Associations approach, but couldn't extract structured data."]
        );
    }

    #[tokio::test]
    async fn test_reexplore_replaces_branches() {
        let (mut wf, mock) = at_menu(vec![thread_one_json().into(), thread_one_json().into()]).await;
        for _ in 0..2 {
            wf.step().await.unwrap();
            wf.submit(values(THREAD_CHOICE, "emotional")).unwrap();
            wf.step().await.unwrap();
        }

        let ids: Vec<u64> = wf.session().branches().iter().map(|b| b.id.number()).collect();
        assert_eq!(ids, vec![4, 5, 6]);
        assert!(!wf.session().branches().contains(BranchId::new(1)));

        let request = mock.requests().pop().unwrap();
        assert!(request.messages[0].content.ends_with("Emotional Root Causes"));
        assert!(request.messages.iter().any(|m| m.content.ends_with(" again")));
    }

    #[tokio::test]
    async fn test_failed_exploration_leaves_state() {
        let (mut wf, _) = at_menu(vec![MockReply::ApiError(503)]).await;
        wf.step().await.unwrap();
        wf.submit(values(THREAD_CHOICE, "3")).unwrap();

        let err = wf.step().await.unwrap_err();
        assert!(matches!(err, SessionError::Service { stage: "explore_thread", .. }));
        assert_eq!(wf.stage(), &Stage::AwaitThreadOrBranch);
        assert!(!wf.session().threads().unwrap().get(ThreadKind::ImaginaryFeedback).is_explored());
        assert!(wf.take_feedback()[0].starts_with("Error during Imaginary Customers' Feedback exploration"));
    }

    #[tokio::test]
    async fn test_navigation_errors_are_recoverable() {
        let (mut wf, _) = at_menu(vec![]).await;

        wf.step().await.unwrap();
        let err = wf.submit(values(THREAD_CHOICE, "b9")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(DomainError::NotFound(_))));
        assert_eq!(wf.take_feedback(), vec!["Branch b9 does not exist."]);

        wf.step().await.unwrap();
        let err = wf.submit(values(THREAD_CHOICE, "banana")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(DomainError::InvalidBranchId(_))));

        wf.step().await.unwrap();
        let err = wf.submit(values(THREAD_CHOICE, "7")).unwrap_err();
        assert!(matches!(err, SessionError::AmbiguousChoice(_)));
        assert_eq!(wf.stage(), &Stage::AwaitThreadOrBranch);

        wf.take_feedback();
        wf.step().await.unwrap();
        wf.submit(values(THREAD_CHOICE, "stop")).unwrap();
        assert!(wf.is_ended());
        assert_eq!(wf.step().await.unwrap(), StepOutcome::Ended);
    }
}
