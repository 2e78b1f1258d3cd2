//! Step validation derived from the schema
//!
//! [`StepValidator::build`] turns a step's field list into one rule per
//! field; [`StepValidator::validate`] applies every rule and reports all
//! failures at once, keyed by field name. The same code runs in the client
//! (wizard, `validate` command) and on the server (submission pipeline).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::model::{Field, FieldType, Step};
use crate::schema::rules::{self, FormatRule};

/// Submitted values for one step, keyed by field name
pub type FormData = Map<String, Value>;

/// What a field must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Non-empty string required
    RequiredText,
    /// Boolean `true` required
    RequiredCheckbox,
    /// May be omitted; format-checked only when provided
    OptionalText,
}

/// Derived validation rule for a single field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field_name: String,
    pub label: String,
    pub kind: RuleKind,
    pub format: Option<FormatRule>,
}

impl FieldRule {
    /// Derive the rule for a field
    pub fn for_field(field: &Field) -> Self {
        let (kind, format) = match field.field_type {
            FieldType::Checkbox => (RuleKind::RequiredCheckbox, None),
            _ if field.required => (RuleKind::RequiredText, rules::detect(field)),
            _ => (RuleKind::OptionalText, rules::detect(field)),
        };

        Self {
            field_name: field.key().to_string(),
            label: field.display_label().to_string(),
            kind,
            format,
        }
    }

    /// Check one value; `None` means the key was absent
    pub fn check(&self, value: Option<&Value>) -> Result<(), String> {
        if self.kind == RuleKind::RequiredCheckbox {
            return match value {
                Some(Value::Bool(true)) => Ok(()),
                _ => Err(format!("{} must be checked", self.label)),
            };
        }

        let text = match value {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(format!("{} must be text", self.label)),
        };

        if text.is_empty() {
            return match self.kind {
                RuleKind::RequiredText => Err(format!("{} is required", self.label)),
                _ => Ok(()),
            };
        }

        match &self.format {
            Some(rule) if !rule.is_match(text) => Err(rule.message().to_string()),
            _ => Ok(()),
        }
    }
}

/// Composite validator for one step
#[derive(Debug, Clone)]
pub struct StepValidator {
    step: u32,
    rules: Vec<FieldRule>,
}

impl StepValidator {
    /// Build the validator for a step, skipping hidden fields
    pub fn build(step: &Step) -> Self {
        Self {
            step: step.step,
            rules: step.visible_fields().map(FieldRule::for_field).collect(),
        }
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Validate submitted data; unknown keys are ignored
    pub fn validate(&self, input: &FormData) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        for rule in &self.rules {
            if let Err(message) = rule.check(input.get(&rule.field_name)) {
                errors.insert(&rule.field_name, message);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate a single field by name; unknown names pass
    pub fn validate_field(&self, name: &str, value: Option<&Value>) -> Result<(), String> {
        match self.rules.iter().find(|r| r.field_name == name) {
            Some(rule) => rule.check(value),
            None => Ok(()),
        }
    }
}

/// Field-level validation failures, one message per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record a failure; the first message for a field is kept
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Wire shape: field name to list of messages
    pub fn to_details(&self) -> BTreeMap<String, Vec<String>> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect()
    }

    /// Inverse of [`FieldErrors::to_details`], keeping the first message per field
    pub fn from_details(details: &BTreeMap<String, Vec<String>>) -> Self {
        let mut errors = Self::default();
        for (field, messages) in details {
            if let Some(first) = messages.first() {
                errors.insert(field, first.clone());
            }
        }
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}
