//! Structured completion handling: resilient parsing and typed schemas

pub mod parser;
pub mod schema;

pub use parser::{StructuredResponse, parse, strip_code_fence};
pub use schema::{ExpansionSchema, ExplorationSchema, SchemaError, format_expansion};
