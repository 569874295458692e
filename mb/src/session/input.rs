//! Declarative input requests handed to the driver

use std::collections::BTreeMap;

use serde::Serialize;

/// Field names the workflow asks for
pub const TARGET_AUDIENCE: &str = "target_audience";
pub const PROBLEM: &str = "problem";
pub const CHOICE: &str = "choice";
pub const THREAD_CHOICE: &str = "thread_choice";
pub const CONCEPT_GUIDANCE: &str = "concept_guidance";

/// Values collected by the driver, keyed by field name
pub type InputValues = BTreeMap<String, String>;

/// One field the driver must collect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputField {
    pub name: String,
    pub prompt: String,
    pub required: bool,
    /// Value used when the answer is blank
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl InputField {
    pub fn required(name: &str, prompt: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, prompt: impl Into<String>, default: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.into(),
            required: false,
            default,
        }
    }
}

/// An enumerable choice shown alongside a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputOption {
    pub key: String,
    pub label: String,
}

impl InputOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// What the next stage needs from the human
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputSpec {
    pub fields: Vec<InputField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InputOption>,
}

impl InputSpec {
    pub fn new(fields: Vec<InputField>) -> Self {
        Self {
            fields,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<InputOption>) -> Self {
        self.options = options;
        self
    }

    /// The initial audience/problem request
    pub fn problem_context() -> Self {
        Self::new(vec![
            InputField::required(TARGET_AUDIENCE, "Target audience:"),
            InputField::required(PROBLEM, "Problem:"),
        ])
    }

    /// Required fields that are absent or blank in `values`
    pub fn missing(&self, values: &InputValues) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| values.get(&f.name).is_none_or(|v| v.trim().is_empty()))
            .map(|f| f.name.clone())
            .collect()
    }
}

/// Trimmed, non-blank value of a field
pub fn value_of<'a>(values: &'a InputValues, name: &str) -> Option<&'a str> {
    values.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reports_blank_and_absent() {
        let spec = InputSpec::problem_context();
        let mut values = InputValues::new();
        values.insert(TARGET_AUDIENCE.to_string(), "   ".to_string());

        assert_eq!(spec.missing(&values), vec![TARGET_AUDIENCE.to_string(), PROBLEM.to_string()]);

        values.insert(TARGET_AUDIENCE.to_string(), "students".to_string());
        values.insert(PROBLEM.to_string(), "loneliness".to_string());
        assert!(spec.missing(&values).is_empty());
    }

    #[test]
    fn test_optional_fields_never_missing() {
        let spec = InputSpec::new(vec![InputField::optional(CONCEPT_GUIDANCE, "Guidance?", None)]);
        assert!(spec.missing(&InputValues::new()).is_empty());
    }

    #[test]
    fn test_value_of_trims() {
        let mut values = InputValues::new();
        values.insert(CHOICE.to_string(), "  r1 ".to_string());
        values.insert(PROBLEM.to_string(), " ".to_string());
        assert_eq!(value_of(&values, CHOICE), Some("r1"));
        assert_eq!(value_of(&values, PROBLEM), None);
        assert_eq!(value_of(&values, TARGET_AUDIENCE), None);
    }
}
