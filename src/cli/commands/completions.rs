//! Shell completion generation
//!
//! ```bash
//! # Bash - add to ~/.bashrc
//! source <(udyam completions bash)
//!
//! # Zsh - add to ~/.zshrc
//! source <(udyam completions zsh)
//!
//! # Fish
//! udyam completions fish > ~/.config/fish/completions/udyam.fish
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::Result;
use std::io;

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
