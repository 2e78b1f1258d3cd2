//! Workspace discovery and layout
//!
//! A workspace is any directory containing `.udyam/`. It holds the local
//! configuration and, unless configured otherwise, the submission database.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Name of the marker directory
pub const WORKSPACE_DIR: &str = ".udyam";

const DATABASE_FILE: &str = "submissions.db";

/// A directory containing `.udyam/`
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Find the workspace by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find the workspace by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create `.udyam/` with a commented default config
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(WORKSPACE_DIR).exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }
        Self::write_layout(root)
    }

    /// Like [`Workspace::init`] but rewrites the config if `.udyam/` exists
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_layout(root)
    }

    fn write_layout(root: PathBuf) -> Result<Self, WorkspaceError> {
        let dir = root.join(WORKSPACE_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        std::fs::write(dir.join("config.yaml"), Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        // The database and its WAL files are local state
        std::fs::write(dir.join(".gitignore"), "submissions.db*\n")
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# udyam workspace configuration
# Relative paths are resolved against the workspace root.

# Form schema (default: the embedded Udyam steps 1-2 schema)
# schema: schemas/my_form.json

# Submission database (default: .udyam/submissions.db)
# database: .udyam/submissions.db

# Key required by `GET /submissions` and `udyam submissions`
# admin_key: ""

# Address for `udyam serve`
# bind: 127.0.0.1:4000

# Server used by `udyam submit --server` and `udyam fill --server`
# server: http://127.0.0.1:4000
"#
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.udyam` directory
    pub fn udyam_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.udyam_dir().join("config.yaml")
    }

    pub fn default_database_path(&self) -> PathBuf {
        self.udyam_dir().join(DATABASE_FILE)
    }

    /// Resolve a configured path against the workspace root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error, Diagnostic)]
pub enum WorkspaceError {
    #[error("not a udyam workspace (searched from {searched_from:?})")]
    #[diagnostic(
        code(udyam::workspace::not_found),
        help("run 'udyam init' to create one, or pass --database explicitly")
    )]
    NotFound { searched_from: PathBuf },

    #[error("udyam workspace already exists at {0:?}")]
    #[diagnostic(code(udyam::workspace::exists), help("use --force to rewrite the config"))]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    #[diagnostic(code(udyam::workspace::io))]
    IoError(String),
}
