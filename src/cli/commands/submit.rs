//! `udyam submit` command - submit one step payload

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{read_form_data, submit_failure, Context};
use crate::cli::GlobalOpts;
use crate::core::{RemoteClient, Submitter};

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Step number the payload belongs to
    #[arg(long, short = 's')]
    pub step: u32,

    /// JSON file with field values (`-` for stdin)
    pub file: PathBuf,

    /// Submit to a running server instead of the local database
    #[arg(long)]
    pub server: Option<String>,
}

pub fn run(args: SubmitArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load();
    let data = read_form_data(&args.file)?;

    let result = match ctx.server_url(args.server.as_deref()) {
        Some(url) => {
            tracing::debug!(%url, "submitting to remote server");
            RemoteClient::new(&url).submit(args.step, &data)
        }
        None => ctx.open_pipeline(global)?.submit(args.step, &data),
    };

    let id = result.map_err(submit_failure)?;

    if global.quiet {
        println!("{}", id);
    } else {
        println!(
            "{} Submitted step {} as {}",
            style("✓").green(),
            args.step,
            style(id).cyan()
        );
    }
    Ok(())
}
