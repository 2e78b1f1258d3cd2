//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs,
    fill::FillArgs,
    init::InitArgs,
    schema::SchemaCommands,
    serve::ServeArgs,
    submissions::SubmissionsCommands,
    submit::SubmitArgs,
    validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "udyam")]
#[command(author, version, about = "Schema-driven multi-step registration intake")]
#[command(long_about = "Collects multi-step registration data through a form described by a JSON schema. \
The same validation rules run in the interactive client and on the HTTP server.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Form schema file (default: configured schema, else the embedded one)
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Submission database (default: .udyam/submissions.db in the workspace)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a udyam workspace
    Init(InitArgs),

    /// Inspect and check form schemas
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Validate a step payload without submitting it
    Validate(ValidateArgs),

    /// Fill in the form interactively, step by step
    Fill(FillArgs),

    /// Submit one step payload from a JSON file
    Submit(SubmitArgs),

    /// List or export stored submissions (admin)
    #[command(subcommand)]
    Submissions(SubmissionsCommands),

    /// Run the HTTP API
    Serve(ServeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// Long-running commands log at info by default
    pub fn is_server(&self) -> bool {
        matches!(self, Commands::Serve(_))
    }
}

/// Output format for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON array (same shape as GET /submissions)
    Json,
    /// CSV with ID, Step, Data, Created At columns
    Csv,
}
