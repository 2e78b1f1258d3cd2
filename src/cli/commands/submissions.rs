//! `udyam submissions` - admin read path over stored submissions

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_short_id, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::export::{self, write_csv};
use crate::core::{RemoteClient, Submission};

#[derive(Subcommand, Debug)]
pub enum SubmissionsCommands {
    /// List submissions, most recent first
    List(ListArgs),

    /// Export submissions as CSV
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    /// Admin key (must match the configured admin_key)
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Case-insensitive filter on id, step and data
    #[arg(long)]
    pub search: Option<String>,

    /// Read from a running server instead of the local database
    #[arg(long)]
    pub server: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(cmd: SubmissionsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SubmissionsCommands::List(args) => run_list(args, global),
        SubmissionsCommands::Export(args) => run_export(args, global),
    }
}

fn fetch(source: &SourceArgs, global: &GlobalOpts) -> Result<Vec<Submission>> {
    let ctx = Context::load();
    let key = source.key.as_deref();

    let records = match ctx.server_url(source.server.as_deref()) {
        Some(url) => RemoteClient::new(&url).list(key)?,
        None => ctx.open_pipeline(global)?.list(key)?,
    };

    Ok(export::filter(records, source.search.as_deref()))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let records = fetch(&args.source, global)?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            write_csv(&records, io::stdout().lock()).into_diagnostic()?;
        }
        OutputFormat::Table => {
            if records.is_empty() {
                if !global.quiet {
                    println!("No submissions found.");
                }
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(["ID", "STEP", "DATA", "CREATED"]);
            for s in &records {
                let data = serde_json::Value::Object(s.data.clone()).to_string();
                builder.push_record([
                    format_short_id(&s.id),
                    s.step.to_string(),
                    truncate_str(&data, 50),
                    s.created_at.format("%Y-%m-%d %H:%M").to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));

            if !global.quiet {
                println!(
                    "\n{} submission(s) found.",
                    style(records.len()).cyan()
                );
            }
        }
    }
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let records = fetch(&args.source, global)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| miette::miette!("Failed to create {}: {}", path.display(), e))?;
            let mut out = BufWriter::new(file);
            write_csv(&records, &mut out).into_diagnostic()?;
            out.flush().into_diagnostic()?;

            if !global.quiet {
                eprintln!(
                    "{} Exported {} submission(s) to {}",
                    style("✓").green(),
                    records.len(),
                    style(path.display()).cyan()
                );
            }
        }
        None => write_csv(&records, io::stdout().lock()).into_diagnostic()?,
    }
    Ok(())
}
