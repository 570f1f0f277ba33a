use clap::Parser;
use smartsort::cli::{Cli, exit_code, run_cli};
use smartsort::output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise only warnings unless --verbose.
    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_cli(&cli);
    if let Err(e) = &result {
        OutputFormatter::error(&format!("Error: {}", e));
    }

    ExitCode::from(exit_code(&result))
}
