//! `udyam fill` command - interactive multi-step form
//!
//! Drives a [`FormSession`] with terminal prompts. Each step is validated
//! before moving on; the last step submits every step's payload, either to
//! the local database or to a running server.

use console::{style, Term};
use miette::Result;
use std::sync::Arc;

use crate::cli::helpers::{print_field_errors, Context};
use crate::cli::GlobalOpts;
use crate::core::{
    Advance, FormSession, FormState, RemoteClient, SessionError, Submitter,
};
use crate::schema::{Navigation, Schema, StepWizard};

#[derive(clap::Args, Debug)]
pub struct FillArgs {
    /// Submit to a running server (its schema is used) instead of the local database
    #[arg(long)]
    pub server: Option<String>,
}

pub fn run(args: FillArgs, global: &GlobalOpts) -> Result<()> {
    if !Term::stdout().is_term() {
        return Err(miette::miette!(
            help = "use 'udyam submit --step N file.json' for scripted submissions",
            "udyam fill needs an interactive terminal"
        ));
    }

    let ctx = Context::load();
    let (schema, submitter): (Arc<Schema>, Box<dyn Submitter>) =
        match ctx.server_url(args.server.as_deref()) {
            Some(url) => {
                let client = RemoteClient::new(&url);
                let schema = Arc::new(client.schema()?);
                println!("Submitting to {}", style(client.base_url()).cyan());
                (schema, Box::new(client))
            }
            None => {
                let pipeline = ctx.open_pipeline(global)?;
                (pipeline.schema().clone(), Box::new(pipeline))
            }
        };

    let wizard = StepWizard::new();
    let mut session = FormSession::new(schema.clone());
    let total = schema.step_count();

    while let FormState::Editing { index } = session.state() {
        let Some(step) = session.current_step() else {
            break;
        };

        if let Some(failure) = session.failure().filter(|f| f.field_errors().is_none()) {
            eprintln!("{} {}", style("✗").red(), failure);
        }

        let input = wizard.prompt_step(step, index, total, session.draft(index), session.errors())?;

        match wizard.prompt_navigation(index > 0, session.is_last_step())? {
            Navigation::Quit => {
                println!("{} Nothing was submitted", style("!").yellow());
                return Ok(());
            }
            Navigation::Back => {
                session.retreat(Some(input))?;
            }
            Navigation::Next => match session.advance(input)? {
                Advance::Moved(_) => {}
                Advance::Rejected => {
                    if let Some(errors) = session.errors() {
                        eprintln!("\n{} Please fix the following:", style("✗").red().bold());
                        print_field_errors(errors);
                    }
                }
                Advance::ReadyToSubmit => match session.finalize(submitter.as_ref()) {
                    Ok(ids) => {
                        println!();
                        println!("{} Registration submitted", style("✓").green().bold());
                        if !global.quiet {
                            for (step, id) in schema.steps.iter().zip(&ids) {
                                println!("  Step {}: {}", step.step, style(id).cyan());
                            }
                        }
                    }
                    Err(SessionError::Submit(e)) => {
                        tracing::debug!(error = %e, "returning to last step after failed submission");
                    }
                    Err(e) => return Err(e.into()),
                },
            },
        }
    }

    Ok(())
}
