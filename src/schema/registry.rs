//! Schema registry - embedded schema documents and loading
//!
//! The `schemas/` folder is compiled into the binary. `form.schema.json`
//! describes the shape every form schema must have; the other documents are
//! form schemas that can be selected by name.

use jsonschema::{validator_for, Validator as JsonValidator};
use rust_embed::Embed;
use serde_json::Value;
use std::path::Path;

use crate::schema::model::{Schema, SchemaError, SchemaIssue};

/// Embedded schema documents
#[derive(Embed)]
#[folder = "schemas/"]
struct SchemaAssets;

/// Structural schema for form schema documents
const META_SCHEMA: &str = "form.schema.json";

/// Form schema used when none is configured
pub const DEFAULT_SCHEMA: &str = "udyam_steps_1_2.json";

/// Registry of embedded form schemas plus the structural checker
pub struct SchemaRegistry {
    meta: Option<JsonValidator>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let meta = Self::embedded(META_SCHEMA)
            .and_then(|src| serde_json::from_str::<Value>(&src).ok())
            .and_then(|json| validator_for(&json).ok());

        if meta.is_none() {
            tracing::warn!("structural form schema unavailable, only semantic checks will run");
        }

        Self { meta }
    }

    /// Names of the embedded form schemas
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = SchemaAssets::iter()
            .map(|n| n.to_string())
            .filter(|n| n != META_SCHEMA && n.ends_with(".json"))
            .collect();
        names.sort();
        names
    }

    /// Raw text of an embedded document
    pub fn embedded(name: &str) -> Option<String> {
        SchemaAssets::get(name).map(|file| String::from_utf8_lossy(&file.data).into_owned())
    }

    pub fn has_schema(&self, name: &str) -> bool {
        name != META_SCHEMA && SchemaAssets::get(name).is_some()
    }

    /// Load the default embedded schema
    pub fn load_default(&self) -> Result<Schema, SchemaError> {
        self.load_embedded(DEFAULT_SCHEMA)
    }

    /// Load an embedded schema by file name
    pub fn load_embedded(&self, name: &str) -> Result<Schema, SchemaError> {
        if !self.has_schema(name) {
            return Err(SchemaError::NotFound(name.to_string()));
        }
        let content = Self::embedded(name).ok_or_else(|| SchemaError::NotFound(name.to_string()))?;
        self.parse(name, &content)
    }

    /// Load a schema from disk
    pub fn load_file(&self, path: &Path) -> Result<Schema, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.parse(&name, &content)
    }

    /// Load from a path when given, otherwise the default embedded schema
    pub fn load(&self, path: Option<&Path>) -> Result<Schema, SchemaError> {
        match path {
            Some(p) => self.load_file(p),
            None => self.load_default(),
        }
    }

    /// Parse and check a schema document
    pub fn parse(&self, name: &str, content: &str) -> Result<Schema, SchemaError> {
        let json: Value = serde_json::from_str(content).map_err(|e| SchemaError::Parse {
            name: name.to_string(),
            reason: e.to_string(),
            src: miette::NamedSource::new(name, content.to_string()),
            span: line_col_span(content, e.line(), e.column()),
        })?;

        let structural = self.structural_issues(&json);
        if !structural.is_empty() {
            return Err(SchemaError::invalid(name, structural));
        }

        let schema: Schema = serde_json::from_value(json).map_err(|e| {
            SchemaError::invalid(name, vec![SchemaIssue::new("document root", e.to_string())])
        })?;

        let issues = schema.check();
        if !issues.is_empty() {
            return Err(SchemaError::invalid(name, issues));
        }

        tracing::debug!(schema = name, steps = schema.step_count(), "schema loaded");
        Ok(schema)
    }

    fn structural_issues(&self, json: &Value) -> Vec<SchemaIssue> {
        let Some(meta) = &self.meta else {
            return Vec::new();
        };
        meta.iter_errors(json)
            .map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() {
                    "document root".to_string()
                } else {
                    path
                };
                SchemaIssue::new(path, error.to_string())
            })
            .collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert serde_json's 1-based line/column into a byte span
fn line_col_span(content: &str, line: usize, column: usize) -> miette::SourceSpan {
    let offset: usize = content
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>()
        + column.saturating_sub(1);
    let offset = offset.min(content.len());
    (offset, 0).into()
}
