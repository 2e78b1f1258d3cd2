//! `udyam serve` command - run the HTTP API

use miette::{IntoDiagnostic, Result};
use std::sync::Arc;

use crate::cli::helpers::Context;
use crate::cli::GlobalOpts;
use crate::core::{MemorySink, SubmissionPipeline};
use crate::server;

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default: bind from config, PORT, or 127.0.0.1:4000)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Keep submissions in memory only (nothing is written to disk)
    #[arg(long)]
    pub memory: bool,
}

pub fn run(args: ServeArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load();
    let addr = args.bind.unwrap_or_else(|| ctx.config.bind_address());

    let pipeline = if args.memory {
        let schema = ctx.load_schema(global)?;
        SubmissionPipeline::new(schema, Box::new(MemorySink::new()))
            .with_admin_key(ctx.config.admin_key.clone())
    } else {
        ctx.open_pipeline(global)?
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(server::serve(&addr, Arc::new(pipeline)))?;
    Ok(())
}
