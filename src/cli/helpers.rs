//! Shared helper functions for CLI commands
//!
//! Loading the configured schema, opening the local pipeline and reading
//! payload files are needed by most commands, so they live here.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalOpts;
use crate::core::identity::SubmissionId;
use crate::core::{Config, SqliteSink, SubmissionPipeline, SubmitError, Workspace, WorkspaceError};
use crate::schema::{FieldErrors, FormData, Schema, SchemaRegistry};

/// Configuration plus the workspace it was discovered in, if any
pub struct Context {
    pub config: Config,
    pub workspace: Option<Workspace>,
}

impl Context {
    pub fn load() -> Self {
        let workspace = Workspace::discover().ok();
        let config = Config::load_with(workspace.as_ref(), |key| std::env::var(key).ok());
        Self { config, workspace }
    }

    /// Schema file from the flag, then config; `None` means the embedded default
    pub fn schema_path(&self, global: &GlobalOpts) -> Option<PathBuf> {
        global.schema.clone().or_else(|| self.config.schema.clone())
    }

    /// Load and check the active schema
    pub fn load_schema(&self, global: &GlobalOpts) -> Result<Arc<Schema>> {
        let path = self.schema_path(global);
        let schema = SchemaRegistry::new().load(path.as_deref())?;
        Ok(Arc::new(schema))
    }

    /// Database file from the flag, then config, then the workspace default
    pub fn database_path(&self, global: &GlobalOpts) -> Result<PathBuf> {
        if let Some(path) = global.database.clone() {
            return Ok(path);
        }
        if let Some(path) = self.config.database_path(self.workspace.as_ref()) {
            return Ok(path);
        }
        let searched_from = std::env::current_dir().into_diagnostic()?;
        Err(WorkspaceError::NotFound { searched_from }.into())
    }

    /// Pipeline over the local SQLite store
    pub fn open_pipeline(&self, global: &GlobalOpts) -> Result<SubmissionPipeline> {
        let schema = self.load_schema(global)?;
        let path = self.database_path(global)?;
        let sink = SqliteSink::open(&path)?;
        Ok(SubmissionPipeline::new(schema, Box::new(sink)).with_admin_key(self.config.admin_key.clone()))
    }

    /// Server URL from the flag, then config
    pub fn server_url(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| self.config.server.clone())
    }
}

/// Read a JSON object of field values from a file, or stdin for `-`
pub fn read_form_data(path: &Path) -> Result<FormData> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?
    };

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| miette::miette!("{} is not valid JSON: {}", path.display(), e))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(miette::miette!(
            "{} must contain a JSON object of field values",
            path.display()
        )),
    }
}

/// Print one line per failing field to stderr
pub fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {} {}: {}", style("✗").red(), style(field).bold(), message);
    }
}

/// Turn a submit failure into a report, listing field errors first
pub fn submit_failure(e: SubmitError) -> miette::Report {
    if let Some(errors) = e.field_errors() {
        print_field_errors(errors);
    }
    miette::Report::new(e)
}

/// Format a SubmissionId for display, truncating if too long
pub fn format_short_id(id: &SubmissionId) -> String {
    truncate_str(&id.to_string(), 16)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
