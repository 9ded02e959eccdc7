//! restcheck - declarative HTTP contract checks
//!
//! Runs table-driven request/expectation suites against live JSON REST APIs
//! and exits non-zero when any scenario fails.

use clap::Parser;
use restcheck::{cli, commands, common::logging};
use commands::Commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "restcheck", about = "Declarative HTTP contract checks for JSON REST APIs")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: the platform config dir's restcheck/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print method, URI, status and body for every scenario
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let result = tokio::select! {
        result = cli::dispatch(cli.command, cli.config.as_deref(), cli.verbose) => result,
        _ = tokio::signal::ctrl_c() => {
            // In-flight requests are abandoned with the runtime
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
