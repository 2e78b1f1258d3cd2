//! `udyam validate` command - check a step payload without submitting it

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{print_field_errors, read_form_data, Context};
use crate::cli::GlobalOpts;
use crate::schema::StepValidator;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Step number the payload belongs to
    #[arg(long, short = 's')]
    pub step: u32,

    /// JSON file with field values (`-` for stdin)
    pub file: PathBuf,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let schema = Context::load().load_schema(global)?;
    let Some(step) = schema.step(args.step) else {
        return Err(miette::miette!(
            help = format!("valid steps are 1 to {}", schema.step_count()),
            "Unknown step: {}",
            args.step
        ));
    };

    let data = read_form_data(&args.file)?;
    let validator = StepValidator::build(step);

    match validator.validate(&data) {
        Ok(()) => {
            if !global.quiet {
                println!(
                    "{} Step {} payload is valid ({} fields checked)",
                    style("✓").green().bold(),
                    step.step,
                    validator.rules().len()
                );
            }
            Ok(())
        }
        Err(errors) => {
            eprintln!(
                "{} Step {}: {}",
                style("✗").red().bold(),
                step.step,
                style(&step.name).bold()
            );
            print_field_errors(&errors);
            if errors.len() == 1 {
                Err(miette::miette!("Validation failed: 1 field has errors"))
            } else {
                Err(miette::miette!(
                    "Validation failed: {} fields have errors",
                    errors.len()
                ))
            }
        }
    }
}
