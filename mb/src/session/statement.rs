//! Problem statement stages: collect inputs, draft two statements, pick one

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::input::{CHOICE, InputField, InputOption, InputSpec, InputValues, PROBLEM, TARGET_AUDIENCE, value_of};
use super::stage::{Stage, StatementChoice};
use super::state::ProblemContext;
use super::workflow::{StepOutcome, Workflow};
use crate::domain::ThreadRegistry;
use crate::prompts::{PromptContext, Template};

const MISSING_INPUTS: &str = "Error: Missing required inputs. Please provide both target audience and problem.";

static HMW_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)how might we[^.?!]*[.?!]").expect("HMW sentence pattern is valid"));

/// Drop one layer of surrounding quotes
pub(crate) fn strip_quotes(text: &str) -> String {
    let trimmed = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = trimmed.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Keep the last "How might we" sentence when the model added other text
pub(crate) fn extract_hmw(text: &str) -> String {
    if !text.contains('\n') && !text.contains('.') {
        return text.to_string();
    }
    HMW_SENTENCE
        .find_iter(text)
        .last()
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.to_string())
}

impl Workflow {
    /// Merge non-blank audience/problem answers into the draft
    pub(crate) fn accept_problem_context(&mut self, values: InputValues) {
        debug!("Workflow::accept_problem_context: called");
        for name in [TARGET_AUDIENCE, PROBLEM] {
            if let Some(value) = value_of(&values, name) {
                self.session.draft.insert(name.to_string(), value.to_string());
            }
        }
        self.session.last_error = None;
        if self.session.stage == Stage::CollectInput {
            self.session.transition(Stage::GenerateStatementA);
        }
    }

    fn freeze_problem(&mut self) -> Result<ProblemContext, SessionError> {
        if let Some(problem) = &self.session.problem {
            return Ok(problem.clone());
        }

        let spec = InputSpec::problem_context();
        let missing = spec.missing(&self.session.draft);
        if !missing.is_empty() {
            warn!(?missing, "Problem context incomplete");
            self.session.last_error = Some(MISSING_INPUTS.to_string());
            self.session.note(MISSING_INPUTS);
            self.session.pending_input = Some(spec.clone());
            return Err(SessionError::MissingInput { fields: missing, spec });
        }

        let problem = ProblemContext {
            target_audience: value_of(&self.session.draft, TARGET_AUDIENCE).unwrap_or_default().to_string(),
            problem: value_of(&self.session.draft, PROBLEM).unwrap_or_default().to_string(),
        };
        info!(target_audience = %problem.target_audience, "Problem context set");
        self.session.problem = Some(problem.clone());
        Ok(problem)
    }

    pub(crate) async fn generate_statement_a(&mut self) -> Result<StepOutcome, SessionError> {
        debug!("Workflow::generate_statement_a: called");
        let problem = self.freeze_problem()?;

        let context = PromptContext::for_inputs(&problem.target_audience, &problem.problem);
        let prompt = self.render(Template::ProblemStatement, &context)?;
        let text = match self.complete(&[], &prompt, self.config.statement_max_tokens).await {
            Ok(text) => strip_quotes(&text),
            Err(e) => return Err(self.service_failed("Error generating problem statement", e)),
        };

        info!(statement = %text, "Generated statement 1");
        self.session.log_assistant(format!("Statement 1: {text}"));
        self.session.statement_a = Some(text);
        self.session.last_error = None;

        let next = if self.session.statement_b.is_some() {
            Stage::AwaitChoice
        } else {
            Stage::GenerateStatementB
        };
        self.session.transition(next);
        Ok(StepOutcome::Advanced)
    }

    pub(crate) async fn generate_statement_b(&mut self) -> Result<StepOutcome, SessionError> {
        debug!("Workflow::generate_statement_b: called");
        let Some(statement_a) = self.session.statement_a.clone() else {
            return Err(self.invalid("generate the alternative statement"));
        };

        let prompt = self.render(Template::AlternativeStatement, &PromptContext::for_statement(&statement_a))?;
        let text = match self.complete(&[], &prompt, self.config.statement_max_tokens).await {
            Ok(text) => extract_hmw(&strip_quotes(&text)),
            Err(e) => return Err(self.service_failed("Error generating alternative statement", e)),
        };

        info!(statement = %text, "Generated statement 2");
        self.session.log_assistant(format!("Statement 2: {text}"));
        self.session.statement_b = Some(text);
        self.session.last_error = None;
        self.session.transition(Stage::AwaitChoice);
        Ok(StepOutcome::Advanced)
    }

    pub(crate) fn declare_statement_choice(&mut self) -> StepOutcome {
        let spec = InputSpec::new(vec![InputField::optional(
            CHOICE,
            "Select between 'statement 1', 'statement 2', 'r1' to regenerate statement 1, or 'r2' to regenerate statement 2",
            None,
        )])
        .with_options(vec![
            InputOption::new("1", self.session.statement_a.clone().unwrap_or_default()),
            InputOption::new("2", self.session.statement_b.clone().unwrap_or_default()),
            InputOption::new("r1", "Regenerate Statement 1"),
            InputOption::new("r2", "Regenerate Statement 2"),
        ]);
        self.declare(spec)
    }

    /// Apply the statement choice; anything unreadable picks statement 1
    pub(crate) fn accept_statement_choice(&mut self, values: &InputValues) -> Result<(), SessionError> {
        let answer = value_of(values, CHOICE).unwrap_or_default();
        debug!(%answer, "Workflow::accept_statement_choice: called");

        let choice = StatementChoice::parse(answer).unwrap_or_else(|| {
            warn!(%answer, "Unclear statement choice, using statement 1");
            self.session.note("Unclear choice. Defaulting to statement 1.");
            StatementChoice::A
        });

        match choice {
            StatementChoice::RegenerateA => {
                self.session.log_user("I'd like to regenerate the first problem statement.");
                self.session.transition(Stage::GenerateStatementA);
            }
            StatementChoice::RegenerateB => {
                self.session.log_user("I'd like to regenerate the alternative problem statement.");
                self.session.transition(Stage::GenerateStatementB);
            }
            StatementChoice::A | StatementChoice::B => {
                let (number, statement) = if choice == StatementChoice::A {
                    (1, self.session.statement_a.clone())
                } else {
                    (2, self.session.statement_b.clone())
                };
                let Some(statement) = statement else {
                    return Err(self.invalid("choose a statement"));
                };
                self.session.log_user(format!("I choose statement {number}."));
                if self.session.final_statement.is_none() {
                    info!(%statement, "Final statement chosen");
                    self.session.final_statement = Some(statement);
                }
                self.session.transition(Stage::PresentThreads);
            }
        }
        Ok(())
    }

    pub(crate) fn present_threads(&mut self) -> StepOutcome {
        debug!("Workflow::present_threads: called");
        if self.session.threads.is_none() {
            self.session.threads = Some(ThreadRegistry::new(&self.system_prompt));
        }
        let statement = self.session.final_statement.clone().unwrap_or_default();
        self.session.log_assistant(format!(
            "We'll use the following problem statement for our ideation session: {statement}"
        ));
        self.session.transition(Stage::AwaitThreadOrBranch);
        StepOutcome::Advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::{MockLlmClient, MockReply};
    use crate::prompts::PromptLoader;
    use crate::session::workflow::WorkflowConfig;
    use std::sync::Arc;

    const HMW_A: &str = "How might we help college students meet professionals to explore careers early?";
    const HMW_B: &str = "How might we bring professionals onto campus so students can explore careers?";

    fn workflow(mock: Arc<MockLlmClient>) -> Workflow {
        Workflow::new(mock, Arc::new(PromptLoader::embedded_only()), WorkflowConfig::default()).unwrap()
    }

    fn inputs(audience: &str, problem: &str) -> InputValues {
        let mut values = InputValues::new();
        values.insert(TARGET_AUDIENCE.to_string(), audience.to_string());
        values.insert(PROBLEM.to_string(), problem.to_string());
        values
    }

    fn choice(answer: &str) -> InputValues {
        let mut values = InputValues::new();
        values.insert(CHOICE.to_string(), answer.to_string());
        values
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"How might we?\""), "How might we?");
        assert_eq!(strip_quotes("  'x' "), "x");
        assert_eq!(strip_quotes("\u{201c}curly\u{201d}"), "curly");
        assert_eq!(strip_quotes("\"unbalanced"), "\"unbalanced");
    }

    #[test]
    fn test_extract_hmw_keeps_last_sentence() {
        let text = "Step 1. Original.\nHow might we do A?\nproblem_statement_2: How might we do B?";
        assert_eq!(extract_hmw(text), "How might we do B?");
        assert_eq!(extract_hmw("How might we do C?"), "How might we do C?");
        assert_eq!(extract_hmw("No statement here."), "No statement here.");
    }

    #[test]
    fn test_hmw_pattern_compiles_and_ignores_case() {
        assert!(HMW_SENTENCE.is_match("HOW MIGHT WE do this?"));
        assert_eq!(extract_hmw("Intro.\nhow might we try it?"), "how might we try it?");
    }

    #[tokio::test]
    async fn test_statements_generated_in_order() {
        let mock = Arc::new(MockLlmClient::with_texts([format!("\"{HMW_A}\""), HMW_B.to_string()]));
        let mut wf = workflow(mock.clone());

        assert!(matches!(wf.step().await.unwrap(), StepOutcome::NeedsInput(_)));
        wf.submit(inputs("college students", "difficulty connecting with professionals"))
            .unwrap();
        assert_eq!(wf.stage(), &Stage::GenerateStatementA);

        wf.step().await.unwrap();
        assert_eq!(wf.session().statement_a(), Some(HMW_A));
        wf.step().await.unwrap();
        assert_eq!(wf.session().statement_b(), Some(HMW_B));
        assert_eq!(wf.stage(), &Stage::AwaitChoice);

        let requests = mock.requests();
        assert!(requests[0].last_user_text().unwrap().contains("college students"));
        assert!(requests[1].last_user_text().unwrap().contains(HMW_A));
    }

    #[tokio::test]
    async fn test_missing_inputs_halt_statement_a() {
        let mock = Arc::new(MockLlmClient::with_texts([HMW_A]));
        let mut wf = workflow(mock.clone());

        wf.step().await.unwrap();
        wf.submit(inputs("students", "  ")).unwrap();

        let err = wf.step().await.unwrap_err();
        assert!(matches!(err, SessionError::MissingInput { ref fields, .. } if fields == &vec![PROBLEM.to_string()]));
        assert_eq!(wf.stage(), &Stage::GenerateStatementA);
        assert_eq!(wf.session().last_error(), Some(MISSING_INPUTS));
        assert_eq!(wf.session().pending_input(), Some(&InputSpec::problem_context()));
        assert_eq!(mock.call_count(), 0);

        let mut more = InputValues::new();
        more.insert(PROBLEM.to_string(), "loneliness".to_string());
        wf.submit(more).unwrap();
        wf.step().await.unwrap();
        assert_eq!(wf.session().problem().unwrap().target_audience, "students");
        assert_eq!(wf.session().statement_a(), Some(HMW_A));
    }

    #[tokio::test]
    async fn test_service_error_keeps_stage() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::ApiError(500), HMW_A.into()]));
        let mut wf = workflow(mock);
        wf.step().await.unwrap();
        wf.submit(inputs("students", "loneliness")).unwrap();

        let err = wf.step().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(wf.stage(), &Stage::GenerateStatementA);
        assert!(wf.take_feedback()[0].starts_with("Error generating problem statement"));

        wf.step().await.unwrap();
        assert_eq!(wf.session().statement_a(), Some(HMW_A));
    }

    #[tokio::test]
    async fn test_rate_limit_note_names_wait() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::RateLimited(30)]));
        let mut wf = workflow(mock);
        wf.step().await.unwrap();
        wf.submit(inputs("students", "loneliness")).unwrap();

        let err = wf.step().await.unwrap_err();
        assert!(matches!(err, SessionError::Service { .. }));
        assert_eq!(
            wf.take_feedback(),
            vec!["Error generating problem statement: Rate limited by the completion service. Try again in 30s."]
        );
        assert_eq!(wf.stage(), &Stage::GenerateStatementA);
    }

    #[tokio::test]
    async fn test_regenerate_a_keeps_b() {
        let mock = Arc::new(MockLlmClient::with_texts([HMW_A, HMW_B, "How might we try again?"]));
        let mut wf = workflow(mock.clone());
        wf.step().await.unwrap();
        wf.submit(inputs("students", "loneliness")).unwrap();
        wf.step().await.unwrap();
        wf.step().await.unwrap();

        wf.step().await.unwrap();
        wf.submit(choice("r1")).unwrap();
        assert_eq!(wf.stage(), &Stage::GenerateStatementA);

        wf.step().await.unwrap();
        assert_eq!(wf.stage(), &Stage::AwaitChoice);
        assert_eq!(wf.session().statement_a(), Some("How might we try again?"));
        assert_eq!(wf.session().statement_b(), Some(HMW_B));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unclear_choice_defaults_to_first() {
        let mock = Arc::new(MockLlmClient::with_texts([HMW_A, HMW_B]));
        let mut wf = workflow(mock);
        wf.step().await.unwrap();
        wf.submit(inputs("students", "loneliness")).unwrap();
        wf.step().await.unwrap();
        wf.step().await.unwrap();
        wf.take_feedback();

        wf.step().await.unwrap();
        wf.submit(choice("the nicer one")).unwrap();
        assert_eq!(wf.session().final_statement(), Some(HMW_A));
        assert_eq!(wf.take_feedback(), vec!["Unclear choice. Defaulting to statement 1."]);

        wf.step().await.unwrap();
        assert_eq!(wf.stage(), &Stage::AwaitThreadOrBranch);
        assert!(wf.session().threads().is_some());
    }

    #[tokio::test]
    async fn test_blank_choice_defaults_to_first() {
        let mock = Arc::new(MockLlmClient::with_texts([HMW_A, HMW_B]));
        let mut wf = workflow(mock);
        wf.step().await.unwrap();
        wf.submit(inputs("students", "loneliness")).unwrap();
        wf.step().await.unwrap();
        wf.step().await.unwrap();
        wf.take_feedback();

        let StepOutcome::NeedsInput(spec) = wf.step().await.unwrap() else {
            panic!("expected the statement choice");
        };
        assert!(spec.fields.iter().all(|f| !f.required));
        wf.submit(choice("   ")).unwrap();
        assert_eq!(wf.session().final_statement(), Some(HMW_A));
        assert_eq!(wf.take_feedback(), vec!["Unclear choice. Defaulting to statement 1."]);
        assert_eq!(wf.stage(), &Stage::PresentThreads);
    }

    #[tokio::test]
    async fn test_submit_without_pending_input_is_invalid() {
        let mock = Arc::new(MockLlmClient::with_texts(Vec::<String>::new()));
        let mut wf = workflow(mock);
        let err = wf.submit(choice("1")).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
    }
}
