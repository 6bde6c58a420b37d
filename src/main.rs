mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;

use cli::context::Context;
use cli::logging::{LoggingConfig, init_logging};
use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    init_logging(LoggingConfig::from_flags(args.verbose, args.quiet));

    let result = Context::from_cli(&args).and_then(|ctx| match &args.command {
        Commands::Synth => cli::commands::synth::execute(&ctx),
        Commands::Diff { fail } => cli::commands::diff::execute(&ctx, *fail),
        Commands::Deploy { dry_run } => cli::commands::deploy::execute(&ctx, *dry_run),
        Commands::Destroy { force, dry_run } => {
            cli::commands::destroy::execute(&ctx, *force, *dry_run)
        }
        Commands::Check => cli::commands::check::execute(&ctx),
        Commands::Environments => cli::commands::environments::execute(&ctx),
    });

    if let Err(e) = result {
        tracing::debug!(kind = ?e.kind(), "command failed");
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
