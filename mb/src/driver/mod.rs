//! Drivers that connect a workflow to a human
//!
//! The workflow never reads input itself. `run_workflow` steps it, shows what
//! it produced, and collects the values each input stage declares through a
//! `HumanChannel`.

mod console;

pub use console::ConsoleChannel;

use eyre::Result;
use tracing::{debug, info, warn};

use crate::session::{InputSpec, InputValues, Session, SessionError, Stage, StepOutcome, Workflow};

/// Where input comes from and where output goes
pub trait HumanChannel {
    /// Collect the fields of `spec`; `None` means the human is gone (EOF)
    fn collect(&mut self, spec: &InputSpec) -> Result<Option<InputValues>>;

    /// Show a block of text
    fn show(&mut self, text: &str);

    /// Show an error or warning
    fn alert(&mut self, text: &str) {
        self.show(text);
    }

    /// Yes/no question; `None` on EOF
    fn confirm(&mut self, question: &str) -> Result<Option<bool>>;
}

/// Run `workflow` until it ends or the channel closes
pub async fn run_workflow(workflow: &mut Workflow, channel: &mut dyn HumanChannel) -> Result<()> {
    debug!("run_workflow: called");
    let mut shown = workflow.session().conversation().len();

    loop {
        let result = workflow.step().await;
        flush(workflow, channel, &mut shown);

        match result {
            Ok(StepOutcome::Advanced) => {}
            Ok(StepOutcome::Ended) => break,
            Ok(StepOutcome::NeedsInput(spec)) => {
                if workflow.stage() == &Stage::AwaitThreadOrBranch && !workflow.session().branches().is_empty() {
                    channel.show(&workflow.session().branch_outline());
                }
                if !collect_and_submit(workflow, channel, &spec)? {
                    break;
                }
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Stage failed");
                if workflow.stage().awaits_input() {
                    continue;
                }
                match channel.confirm("Retry?")? {
                    Some(true) => continue,
                    _ => {
                        workflow.terminate();
                        break;
                    }
                }
            }
            Err(SessionError::MissingInput { spec, .. }) => {
                if !collect_and_submit(workflow, channel, &spec)? {
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                debug!(error = %e, "run_workflow: recoverable error");
            }
            Err(e) => return Err(e.into()),
        }
    }

    flush(workflow, channel, &mut shown);
    info!(stage = %workflow.stage(), "Workflow finished");
    Ok(())
}

/// Collect input and submit it; false when the channel closed
///
/// Rejected answers re-ask the same question.
fn collect_and_submit(workflow: &mut Workflow, channel: &mut dyn HumanChannel, spec: &InputSpec) -> Result<bool> {
    loop {
        let Some(values) = channel.collect(spec)? else {
            debug!("collect_and_submit: channel closed");
            workflow.terminate();
            return Ok(false);
        };
        match workflow.submit(values) {
            Ok(()) => return Ok(true),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Input rejected");
                let notes = workflow.take_feedback();
                if notes.is_empty() {
                    channel.alert(&e.to_string());
                }
                for note in notes {
                    channel.alert(&note);
                }
                if workflow.session().pending_input().is_none() {
                    // The stage moved on; let the loop step again
                    return Ok(true);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Show new feedback and new assistant messages since the last flush
fn flush(workflow: &mut Workflow, channel: &mut dyn HumanChannel, shown: &mut usize) {
    let conversation = workflow.session().conversation();
    let fresh: Vec<String> = conversation[(*shown).min(conversation.len())..]
        .iter()
        .filter(|m| m.role == crate::llm::Role::Assistant)
        .map(|m| m.content.clone())
        .collect();
    *shown = conversation.len();

    for text in fresh {
        channel.show(&text);
    }
    for note in workflow.take_feedback() {
        channel.alert(&note);
    }
}

/// Final session, for callers that only need the result
pub fn summary(session: &Session) -> String {
    match session.final_statement() {
        Some(statement) => format!(
            "Problem statement: {statement}\nBranches: {}",
            session.branches().len()
        ),
        None => "No problem statement was chosen.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::{MockLlmClient, MockReply};
    use crate::prompts::PromptLoader;
    use crate::session::WorkflowConfig;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Answers each requested field from a queue; runs dry as EOF
    #[derive(Default)]
    struct ScriptedChannel {
        answers: VecDeque<&'static str>,
        confirms: VecDeque<bool>,
        shown: Vec<String>,
        alerts: Vec<String>,
    }

    impl ScriptedChannel {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl HumanChannel for ScriptedChannel {
        fn collect(&mut self, spec: &InputSpec) -> Result<Option<InputValues>> {
            let mut values = InputValues::new();
            for field in &spec.fields {
                let Some(answer) = self.answers.pop_front() else {
                    return Ok(None);
                };
                values.insert(field.name.clone(), answer.to_string());
            }
            Ok(Some(values))
        }

        fn show(&mut self, text: &str) {
            self.shown.push(text.to_string());
        }

        fn alert(&mut self, text: &str) {
            self.alerts.push(text.to_string());
        }

        fn confirm(&mut self, _question: &str) -> Result<Option<bool>> {
            Ok(self.confirms.pop_front())
        }
    }

    fn workflow(replies: Vec<MockReply>) -> Workflow {
        Workflow::new(
            Arc::new(MockLlmClient::new(replies)),
            Arc::new(PromptLoader::embedded_only()),
            WorkflowConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_runs_until_stop() {
        let mut wf = workflow(vec!["How might we A?".into(), "How might we B?".into()]);
        let mut channel = ScriptedChannel::new(&["students", "loneliness", "2", "nonsense", "stop"]);

        run_workflow(&mut wf, &mut channel).await.unwrap();

        assert!(wf.is_ended());
        assert_eq!(wf.session().final_statement(), Some("How might we B?"));
        assert!(channel.shown.iter().any(|s| s == "Statement 1: How might we A?"));
        assert!(channel.alerts.iter().any(|a| a.starts_with("Invalid choice.")));
        assert_eq!(channel.alerts.last().map(String::as_str), Some("Ideation session ended."));
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let mut wf = workflow(vec![]);
        let mut channel = ScriptedChannel::new(&["students"]);

        run_workflow(&mut wf, &mut channel).await.unwrap();

        assert!(wf.is_ended());
        assert!(wf.session().problem().is_none());
    }

    #[tokio::test]
    async fn test_declined_retry_ends_session() {
        let mut wf = workflow(vec![MockReply::ApiError(500)]);
        let mut channel = ScriptedChannel::new(&["students", "loneliness"]);
        channel.confirms.push_back(false);

        run_workflow(&mut wf, &mut channel).await.unwrap();

        assert!(wf.is_ended());
        assert!(channel.alerts[0].starts_with("Error generating problem statement"));
    }

    #[test]
    fn test_summary() {
        let wf = workflow(vec![]);
        assert_eq!(summary(wf.session()), "No problem statement was chosen.");
    }
}
