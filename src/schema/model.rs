//! In-memory form schema: steps and the fields they present

use chrono::{DateTime, Utc};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Field ids starting with this marker are framework plumbing, never shown or validated
pub const HIDDEN_FIELD_MARKER: &str = "__";

/// A complete multi-step form description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Where the schema was captured from
    pub source: String,

    /// When the schema was captured
    pub scraped_at: DateTime<Utc>,

    /// Steps in presentation order
    pub steps: Vec<Step>,
}

/// One page of the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based step number
    pub step: u32,

    pub name: String,

    /// Presentation and validation order
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A single input on a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,

    /// Validation key; empty means "use the id"
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// Explicit regex source, overrides every heuristic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Alternative explicit rule carrying its own message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,

    /// Choices for `select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

/// Explicit regex with an optional custom message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub regex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Input type of a field
///
/// Unknown type strings are kept verbatim and treated as generic text inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Select,
    Checkbox,
    Textarea,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Textarea => "textarea",
            FieldType::Other(s) => s,
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldType::Text,
            "select" => FieldType::Select,
            "checkbox" => FieldType::Checkbox,
            "textarea" => FieldType::Textarea,
            _ => FieldType::Other(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Field {
    /// Validation key: `name`, falling back to `id`
    pub fn key(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Label used in messages: `label`, falling back to the key
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.key()
        } else {
            &self.label
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.id.starts_with(HIDDEN_FIELD_MARKER)
    }

    /// Explicit pattern, ignoring the empty string scrapers emit for "none"
    pub fn explicit_pattern(&self) -> Option<&str> {
        self.pattern.as_deref().filter(|p| !p.is_empty())
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref().filter(|p| !p.is_empty())
    }
}

impl Step {
    /// Fields the user actually sees, in order
    pub fn visible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_hidden())
    }
}

impl Schema {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Look up a step by its 1-based number
    pub fn step(&self, number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step == number)
    }

    /// Look up a step by its 0-based position
    pub fn step_at(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Check the invariants serde cannot express
    ///
    /// Every problem is collected, so one run reports the whole schema.
    pub fn check(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        if self.steps.is_empty() {
            issues.push(SchemaIssue::new("steps", "schema has no steps"));
        }

        for (index, step) in self.steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.step != expected {
                issues.push(SchemaIssue::new(
                    format!("steps[{}].step", index),
                    format!("step numbers must run 1..n without gaps: expected {}, found {}", expected, step.step),
                ));
            }

            let mut keys = HashSet::new();
            for (field_index, field) in step.fields.iter().enumerate() {
                let path = format!("steps[{}].fields[{}]", index, field_index);

                if field.id.is_empty() {
                    issues.push(SchemaIssue::new(&path, "field id must not be empty"));
                    continue;
                }
                if !keys.insert(field.key()) {
                    issues.push(SchemaIssue::new(
                        &path,
                        format!("duplicate field key '{}' in step {}", field.key(), step.step),
                    ));
                }
                if field.field_type == FieldType::Select && field.options.is_empty() {
                    issues.push(SchemaIssue::new(
                        &path,
                        format!("select field '{}' has no options", field.key()),
                    ));
                }
                if let Some(pattern) = field.explicit_pattern() {
                    if let Err(e) = crate::schema::rules::compile_pattern(pattern) {
                        issues.push(SchemaIssue::new(
                            format!("{}.pattern", path),
                            format!("pattern for '{}' does not compile: {}", field.key(), e),
                        ));
                    }
                }
                if let Some(validation) = &field.validation {
                    if let Err(e) = crate::schema::rules::compile_pattern(&validation.regex) {
                        issues.push(SchemaIssue::new(
                            format!("{}.validation.regex", path),
                            format!("validation regex for '{}' does not compile: {}", field.key(), e),
                        ));
                    }
                }
            }
        }

        issues
    }
}

/// A single schema problem, located by JSON path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A schema document that could not be loaded
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("Failed to read schema {path}: {message}")]
    #[diagnostic(code(udyam::schema::io))]
    Io { path: String, message: String },

    #[error("Schema {name} is not valid JSON: {reason}")]
    #[diagnostic(code(udyam::schema::parse), help("Check JSON syntax - commas, quotes and brackets"))]
    Parse {
        name: String,
        reason: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Schema {name} failed validation: {summary}")]
    #[diagnostic(code(udyam::schema::invalid))]
    Invalid {
        name: String,
        summary: String,
        #[related]
        violations: Vec<SchemaViolation>,
    },

    #[error("No embedded schema named '{0}'")]
    #[diagnostic(code(udyam::schema::not_found))]
    NotFound(String),
}

/// One violation inside [`SchemaError::Invalid`]
#[derive(Debug, Error, Diagnostic)]
#[error("{path}: {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaError {
    pub fn invalid(name: &str, issues: Vec<SchemaIssue>) -> Self {
        let count = issues.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self::Invalid {
            name: name.to_string(),
            summary,
            violations: issues
                .into_iter()
                .map(|i| SchemaViolation {
                    path: i.path,
                    message: i.message,
                })
                .collect(),
        }
    }

    /// Number of violations carried (0 for non-validation errors)
    pub fn violation_count(&self) -> usize {
        match self {
            SchemaError::Invalid { violations, .. } => violations.len(),
            _ => 0,
        }
    }
}
