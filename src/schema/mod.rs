//! Schema system - form schemas, rule derivation and interactive prompts

pub mod model;
pub mod registry;
pub mod rules;
pub mod validator;
pub mod wizard;

#[cfg(test)]
pub(crate) mod fixtures;

pub use model::{Field, FieldType, Schema, SchemaError, SchemaIssue, Step};
pub use registry::{SchemaRegistry, DEFAULT_SCHEMA};
pub use rules::FormatRule;
pub use validator::{FieldErrors, FieldRule, FormData, RuleKind, StepValidator};
pub use wizard::{Navigation, StepWizard};
