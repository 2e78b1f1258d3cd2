//! Core module - submission handling, persistence and workspace plumbing

pub mod client;
pub mod config;
pub mod export;
pub mod form;
pub mod identity;
pub mod pipeline;
pub mod sink;
pub mod workspace;

pub use client::RemoteClient;
pub use config::Config;
pub use form::{Advance, FormSession, FormState, NavigationError, SessionError, Transition};
pub use identity::{IdParseError, SubmissionId};
pub use pipeline::{SubmissionPipeline, SubmissionRequest, SubmitError, Submitter};
pub use sink::{MemorySink, RecordSink, SinkError, SqliteSink, Submission};
pub use workspace::{Workspace, WorkspaceError};
