//! CLI entry point for the harvester.

use clap::Parser;
use figshare_oai_harvester::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // WARN by default (DEBUG with --verbose), respecting RUST_LOG
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if let Err(e) = cli::run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(cli::exit_code(&e));
    }
}
