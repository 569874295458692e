//! Typed response schemas, one per thread plus concept expansion
//!
//! Each schema decodes strictly from the parsed JSON and knows how to flatten
//! itself into branch seeds.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::StructuredResponse;
use crate::domain::{BranchSeed, BranchSource, ThreadKind};

/// A decoded value that doesn't fit the expected schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("response does not match the {schema} schema: {source}")]
    Decode {
        schema: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("response for {0} contained no items")]
    Empty(&'static str),
}

/// `{heading, explanation, productDirection}`, the item shape of threads 1 and 2
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaItem {
    pub heading: String,
    pub explanation: String,
    pub product_direction: String,
}

impl IdeaItem {
    fn seed(&self, source: BranchSource) -> BranchSeed {
        BranchSeed::new(
            self.heading.clone(),
            format!("{} Product direction: {}", self.explanation, self.product_direction),
            source,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalRootCauses {
    pub emotional_seeds: Vec<IdeaItem>,
    pub habit_heuristic_alignment: Vec<IdeaItem>,
    pub delightful_subversion: Vec<IdeaItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnconventionalAssociations {
    pub attribute_based_bridging: Vec<IdeaItem>,
    pub broader_domains: Vec<IdeaItem>,
    pub metaphorical_links: Vec<IdeaItem>,
}

/// An imaginary customer and their feedback items
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub user_profile: String,
    #[serde(default)]
    pub feedback: Vec<FeedbackItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub product_direction: String,
}

/// One expanded sub-concept
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedConcept {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub product_direction: String,
}

/// Expansion arrives either as a bare array or wrapped in `expandedConcepts`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpansionShape {
    List(Vec<ExpandedConcept>),
    Wrapped {
        #[serde(rename = "expandedConcepts")]
        expanded_concepts: Vec<ExpandedConcept>,
    },
}

/// Decoded exploration data for one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorationSchema {
    EmotionalRootCauses(EmotionalRootCauses),
    UnconventionalAssociations(UnconventionalAssociations),
    ImaginaryFeedback(Vec<Persona>),
}

impl ExplorationSchema {
    /// Decode `value` with the schema belonging to `kind`
    pub fn decode(kind: ThreadKind, value: &Value) -> Result<Self, SchemaError> {
        debug!(%kind, "ExplorationSchema::decode: called");
        let schema = kind.template().name();
        let decoded = match kind {
            ThreadKind::EmotionalRootCauses => {
                serde_json::from_value(value.clone()).map(Self::EmotionalRootCauses)
            }
            ThreadKind::UnconventionalAssociations => {
                serde_json::from_value(value.clone()).map(Self::UnconventionalAssociations)
            }
            ThreadKind::ImaginaryFeedback => serde_json::from_value(value.clone()).map(Self::ImaginaryFeedback),
        }
        .map_err(|source| SchemaError::Decode { schema, source })?;

        if decoded.seeds().is_empty() {
            return Err(SchemaError::Empty(schema));
        }
        Ok(decoded)
    }

    /// Flatten into top-level branch seeds, section by section
    ///
    /// Personas flatten to one seed per feedback item, reusing the persona
    /// heading (or "User N") for each.
    pub fn seeds(&self) -> Vec<BranchSeed> {
        match self {
            Self::EmotionalRootCauses(data) => flatten_sections(&[
                (&data.emotional_seeds, BranchSource::EmotionalSeeds),
                (&data.habit_heuristic_alignment, BranchSource::HabitHeuristicAlignment),
                (&data.delightful_subversion, BranchSource::DelightfulSubversion),
            ]),
            Self::UnconventionalAssociations(data) => flatten_sections(&[
                (&data.attribute_based_bridging, BranchSource::AttributeBasedBridging),
                (&data.broader_domains, BranchSource::BroaderDomains),
                (&data.metaphorical_links, BranchSource::MetaphoricalLinks),
            ]),
            Self::ImaginaryFeedback(personas) => personas
                .iter()
                .enumerate()
                .flat_map(|(idx, persona)| {
                    let heading = persona.heading.clone().unwrap_or_else(|| format!("User {}", idx + 1));
                    persona.feedback.iter().map(move |item| {
                        BranchSeed::new(
                            heading.clone(),
                            format!(
                                "User: {}\nFeedback: {}\nProduct direction: {}",
                                persona.user_profile, item.explanation, item.product_direction
                            ),
                            BranchSource::ImaginaryFeedback,
                        )
                    })
                })
                .collect(),
        }
    }
}

fn flatten_sections(sections: &[(&Vec<IdeaItem>, BranchSource)]) -> Vec<BranchSeed> {
    sections
        .iter()
        .flat_map(|(items, source)| items.iter().map(move |item| item.seed(*source)))
        .collect()
}

/// Decoded concept expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionSchema {
    pub concepts: Vec<ExpandedConcept>,
}

impl ExpansionSchema {
    pub fn decode(value: &Value) -> Result<Self, SchemaError> {
        debug!("ExpansionSchema::decode: called");
        let shape: ExpansionShape = serde_json::from_value(value.clone()).map_err(|source| SchemaError::Decode {
            schema: "concept-expansion",
            source,
        })?;

        let concepts = match shape {
            ExpansionShape::List(c) => c,
            ExpansionShape::Wrapped { expanded_concepts } => expanded_concepts,
        };
        if concepts.is_empty() {
            return Err(SchemaError::Empty("concept-expansion"));
        }
        Ok(Self { concepts })
    }

    /// Child seeds; a missing heading becomes "Concept N"
    pub fn seeds(&self) -> Vec<BranchSeed> {
        self.concepts
            .iter()
            .enumerate()
            .map(|(idx, concept)| {
                BranchSeed::new(
                    concept.heading.clone().unwrap_or_else(|| format!("Concept {}", idx + 1)),
                    format!("{} Product Direction: {}", concept.explanation, concept.product_direction),
                    BranchSource::ConceptExpansion,
                )
            })
            .collect()
    }

    /// Stored form, always `{"expandedConcepts": [...]}`
    pub fn normalized(value: &Value) -> Value {
        match value {
            Value::Array(_) => serde_json::json!({ "expandedConcepts": value }),
            other => other.clone(),
        }
    }
}

/// Human-readable summary of an expansion payload
pub fn format_expansion(heading: &str, id: &str, payload: &StructuredResponse) -> String {
    let mut out = format!("Expanded Concept: {heading} ({id})\n");
    match payload {
        StructuredResponse::Structured(value) => {
            let concepts = ExpansionSchema::decode(value).map(|s| s.concepts).unwrap_or_default();
            for (idx, concept) in concepts.iter().enumerate() {
                out.push_str(&format!(
                    "\n{}. {}\n   Explanation: {}\n   Product Direction: {}\n",
                    idx + 1,
                    concept.heading.as_deref().unwrap_or(""),
                    concept.explanation,
                    concept.product_direction
                ));
            }
        }
        StructuredResponse::Degraded { raw_response } => {
            out.push('\n');
            out.push_str(raw_response);
            out.push('\n');
        }
    }
    out
}
