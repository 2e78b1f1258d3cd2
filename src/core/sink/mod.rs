//! Record sinks - where accepted submissions are stored
//!
//! The pipeline only sees the [`RecordSink`] trait. Two renditions exist: a
//! SQLite file (the default for a workspace) and an in-memory list used by
//! tests and throwaway servers. Both assign the submission id and timestamp.

mod memory;
mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::identity::SubmissionId;
use crate::schema::FormData;

/// An accepted, stored submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub step: u32,
    pub data: FormData,
    pub created_at: DateTime<Utc>,
}

/// Persistence collaborator for accepted submissions
pub trait RecordSink: Send + Sync {
    /// Store a validated payload, assigning its id and creation time
    fn create(&self, step: u32, data: &FormData) -> Result<Submission, SinkError>;

    /// All stored submissions, most recent first
    fn list(&self) -> Result<Vec<Submission>, SinkError>;
}

/// Errors raised by record sinks
#[derive(Debug, Error, Diagnostic)]
pub enum SinkError {
    #[error("database error: {0}")]
    #[diagnostic(code(udyam::sink::database))]
    Database(#[from] rusqlite::Error),

    #[error("could not open submission store at {path}: {message}")]
    #[diagnostic(code(udyam::sink::open))]
    Open { path: String, message: String },

    #[error("submission store was written by a newer version (schema {found}, supported {supported})")]
    #[diagnostic(
        code(udyam::sink::version),
        help("upgrade udyam or point --database at a different file")
    )]
    IncompatibleVersion { found: i32, supported: i32 },

    #[error("stored record {id} is unreadable: {message}")]
    #[diagnostic(code(udyam::sink::corrupt))]
    Corrupt { id: String, message: String },

    #[error("submission store unavailable: {0}")]
    #[diagnostic(code(udyam::sink::unavailable))]
    Unavailable(String),
}
