use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use udyam::cli::{Cli, Commands, GlobalOpts};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global, cli.command.is_server());

    match cli.command {
        Commands::Init(args) => udyam::cli::commands::init::run(args),
        Commands::Schema(cmd) => udyam::cli::commands::schema::run(cmd, &global),
        Commands::Validate(args) => udyam::cli::commands::validate::run(args, &global),
        Commands::Fill(args) => udyam::cli::commands::fill::run(args, &global),
        Commands::Submit(args) => udyam::cli::commands::submit::run(args, &global),
        Commands::Submissions(cmd) => udyam::cli::commands::submissions::run(cmd, &global),
        Commands::Serve(args) => udyam::cli::commands::serve::run(args, &global),
        Commands::Completions(args) => udyam::cli::commands::completions::run(args),
    }
}

/// RUST_LOG wins; otherwise the level follows -v / -q and the command
fn init_logging(global: &GlobalOpts, server: bool) {
    let default = if global.verbose {
        "udyam=debug,tower_http=debug"
    } else if global.quiet {
        "error"
    } else if server {
        "udyam=info,tower_http=info"
    } else {
        "warn"
    };

    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
