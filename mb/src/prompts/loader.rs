//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// The prompt templates the workflow renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    System,
    ProblemStatement,
    AlternativeStatement,
    EmotionalRootCauses,
    UnconventionalAssociations,
    ImaginaryFeedback,
    ConceptExpansion,
    DefaultGuidance,
}

impl Template {
    pub const ALL: [Template; 8] = [
        Template::System,
        Template::ProblemStatement,
        Template::AlternativeStatement,
        Template::EmotionalRootCauses,
        Template::UnconventionalAssociations,
        Template::ImaginaryFeedback,
        Template::ConceptExpansion,
        Template::DefaultGuidance,
    ];

    /// File stem of the template (`{name}.pmt`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::ProblemStatement => "problem-statement",
            Self::AlternativeStatement => "alternative-statement",
            Self::EmotionalRootCauses => "emotional-root-causes",
            Self::UnconventionalAssociations => "unconventional-associations",
            Self::ImaginaryFeedback => "imaginary-feedback",
            Self::ConceptExpansion => "concept-expansion",
            Self::DefaultGuidance => "default-guidance",
        }
    }

    /// Look a template up by file stem
    pub fn from_name(name: &str) -> Option<Self> {
        debug!(%name, "Template::from_name: called");
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Context for rendering prompt templates
///
/// Every template sees the same shape; fields a template doesn't use are
/// simply left empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub target_audience: String,
    pub problem: String,
    /// The statement under work (statement A for the alternative, otherwise the final statement)
    pub problem_statement: String,
    /// "heading: content" of the branch being expanded
    pub concept: String,
    /// Name of the exploration thread the concept came from
    pub perspective: String,
    pub guidance: String,
}

impl PromptContext {
    /// Context for the first statement
    pub fn for_inputs(target_audience: &str, problem: &str) -> Self {
        debug!("PromptContext::for_inputs: called");
        Self {
            target_audience: target_audience.to_string(),
            problem: problem.to_string(),
            ..Self::default()
        }
    }

    /// Context for prompts built around one problem statement
    pub fn for_statement(problem_statement: &str) -> Self {
        debug!("PromptContext::for_statement: called");
        Self {
            problem_statement: problem_statement.to_string(),
            ..Self::default()
        }
    }

    /// Context for guidance and expansion prompts
    pub fn for_concept(problem_statement: &str, concept: &str, perspective: &str, guidance: &str) -> Self {
        debug!(%perspective, "PromptContext::for_concept: called");
        Self {
            problem_statement: problem_statement.to_string(),
            concept: concept.to_string(),
            perspective: perspective.to_string(),
            guidance: guidance.to_string(),
            ..Self::default()
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.mindbranch/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `root`
    ///
    /// Looks for `.mindbranch/prompts/` and `prompts/` under the root.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        debug!(?root, "PromptLoader::new: called");
        let user_dir = root.join(".mindbranch/prompts");
        let repo_dir = root.join("prompts");

        let user_dir_exists = user_dir.exists();
        let repo_dir_exists = repo_dir.exists();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: user_dir_exists.then_some(user_dir),
            repo_dir: repo_dir_exists.then_some(repo_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    /// Use `dir` as the override directory, ahead of everything else
    pub fn with_override_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(?dir, "PromptLoader::with_override_dir: called");
        self.user_dir = Some(dir);
        self
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, never HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template's source text
    ///
    /// Checks in order:
    /// 1. User override: `.mindbranch/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for (label, dir) in [("user", &self.user_dir), ("repo", &self.repo_dir)] {
            let Some(dir) = dir else {
                continue;
            };
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, %label, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read {} prompt {}: {}", label, path.display(), e));
            }
            debug!(?path, %label, "PromptLoader::load_template: not found on disk");
        }

        // Fall back to embedded
        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template: Template, context: &PromptContext) -> Result<String> {
        debug!(%template, "PromptLoader::render: called");
        let source = self.load_template(template.name())?;
        info!("Rendering template '{}'", template);

        self.hbs
            .render_template(&source, context)
            .map(|s| s.trim().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template, e))
    }

    /// The system persona, shared by every request
    pub fn system_prompt(&self) -> Result<String> {
        debug!("PromptLoader::system_prompt: called");
        self.render(Template::System, &PromptContext::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_names_round_trip() {
        for template in Template::ALL {
            assert_eq!(Template::from_name(template.name()), Some(template));
        }
        assert_eq!(Template::from_name("plan"), None);
    }

    #[test]
    fn test_every_template_is_embedded() {
        let loader = PromptLoader::embedded_only();
        for template in Template::ALL {
            assert!(loader.load_template(template.name()).is_ok(), "{template} missing");
        }
    }

    #[test]
    fn test_render_problem_statement() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext::for_inputs("college students", "difficulty connecting with professionals");
        let prompt = loader.render(Template::ProblemStatement, &ctx).unwrap();

        assert!(prompt.contains("Target Audience: college students"));
        assert!(prompt.contains("Problem: difficulty connecting with professionals"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_render_does_not_html_escape() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext::for_statement("How might we help \"night owls\" & <early birds>?");
        let prompt = loader.render(Template::AlternativeStatement, &ctx).unwrap();
        assert!(prompt.contains("\"night owls\" & <early birds>"));
    }

    #[test]
    fn test_render_concept_expansion() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext::for_concept("HMW?", "Fear: people worry", "Emotional Root Causes", "What forms?");
        let prompt = loader.render(Template::ConceptExpansion, &ctx).unwrap();
        assert!(prompt.contains("From the Emotional Root Causes perspective"));
        assert!(prompt.contains("concept: Fear: people worry"));
        assert!(prompt.contains("Here's the prompt: What forms?"));
    }

    #[test]
    fn test_override_dir_wins_over_embedded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("system.pmt"), "Custom persona for {{problem}}").unwrap();

        let loader = PromptLoader::embedded_only().with_override_dir(dir.path());
        let ctx = PromptContext::for_inputs("a", "b");
        assert_eq!(loader.render(Template::System, &ctx).unwrap(), "Custom persona for b");

        // Templates absent from the override dir still come from the embedded set
        assert!(loader.load_template("default-guidance").unwrap().contains("question"));
    }

    #[test]
    fn test_new_finds_repo_prompts_dir() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("prompts")).unwrap();
        std::fs::write(root.path().join("prompts/default-guidance.pmt"), "repo guidance").unwrap();

        let loader = PromptLoader::new(root.path());
        assert_eq!(loader.load_template("default-guidance").unwrap(), "repo guidance");
    }

    #[test]
    fn test_prompt_loader_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
