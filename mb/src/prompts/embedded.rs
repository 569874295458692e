//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Ideation partner persona, used as the system prompt for every call
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// First "How might we" statement from audience and problem
pub const PROBLEM_STATEMENT: &str = include_str!("../../prompts/problem-statement.pmt");

/// Alternative statement seeded with the first one
pub const ALTERNATIVE_STATEMENT: &str = include_str!("../../prompts/alternative-statement.pmt");

pub const EMOTIONAL_ROOT_CAUSES: &str = include_str!("../../prompts/emotional-root-causes.pmt");

pub const UNCONVENTIONAL_ASSOCIATIONS: &str = include_str!("../../prompts/unconventional-associations.pmt");

pub const IMAGINARY_FEEDBACK: &str = include_str!("../../prompts/imaginary-feedback.pmt");

/// Three sub-concepts for a branch
pub const CONCEPT_EXPANSION: &str = include_str!("../../prompts/concept-expansion.pmt");

/// One clarifying question suggested before expansion
pub const DEFAULT_GUIDANCE: &str = include_str!("../../prompts/default-guidance.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let found = match name {
        "system" => Some(SYSTEM),
        "problem-statement" => Some(PROBLEM_STATEMENT),
        "alternative-statement" => Some(ALTERNATIVE_STATEMENT),
        "emotional-root-causes" => Some(EMOTIONAL_ROOT_CAUSES),
        "unconventional-associations" => Some(UNCONVENTIONAL_ASSOCIATIONS),
        "imaginary-feedback" => Some(IMAGINARY_FEEDBACK),
        "concept-expansion" => Some(CONCEPT_EXPANSION),
        "default-guidance" => Some(DEFAULT_GUIDANCE),
        _ => None,
    };
    if found.is_none() {
        debug!("get_embedded: no match found");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_system() {
        let system = get_embedded("system").unwrap();
        assert!(system.contains("Persona"));
        assert!(system.contains("mindmap"));
    }

    #[test]
    fn test_thread_prompts_name_their_sections() {
        let emotional = get_embedded("emotional-root-causes").unwrap();
        assert!(emotional.contains("emotionalSeeds"));
        assert!(emotional.contains("habitHeuristicAlignment"));
        assert!(emotional.contains("delightfulSubversion"));

        let associations = get_embedded("unconventional-associations").unwrap();
        assert!(associations.contains("attributeBasedBridging"));
        assert!(associations.contains("broaderDomains"));
        assert!(associations.contains("metaphoricalLinks"));

        let feedback = get_embedded("imaginary-feedback").unwrap();
        assert!(feedback.contains("userProfile"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
