//! `udyam init` command - create a workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Rewrite the config even if .udyam/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let workspace = if args.force {
        Workspace::init_force(&path)
    } else {
        Workspace::init(&path)
    };

    match workspace {
        Ok(ws) => {
            println!(
                "{} Initialized udyam workspace at {}",
                style("✓").green(),
                style(ws.root().display()).cyan()
            );
            println!();
            println!("  .udyam/config.yaml    settings (schema, database, admin key)");
            println!("  .udyam/submissions.db created on first submission");
            println!();
            println!("Next steps:");
            println!("  {} Review the form steps", style("udyam schema list").yellow());
            println!("  {} Fill in the form", style("udyam fill").yellow());
            println!("  {} Start the HTTP API", style("udyam serve").yellow());
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} udyam workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("udyam init --force").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
