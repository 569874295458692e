//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for each workflow stage.
//!
//! Template loading chain:
//! 1. `.mindbranch/prompts/{name}.pmt` (user override, or `session.prompts-dir`)
//! 2. `prompts/{name}.pmt` (repo default)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader, Template};
