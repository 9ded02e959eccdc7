//! CLI command definitions
//!
//! Defines the clap commands for the restcheck CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run suites against their APIs (the bundled suites when none are given)
    Run {
        /// YAML suite files to run
        suites: Vec<PathBuf>,

        /// Override a suite's base URL; can be given once per suite:
        /// --base-url jsonplaceholder=http://localhost:3000
        #[arg(long = "base-url", value_name = "SUITE=URL", value_parser = parse_base_url)]
        base_urls: Vec<(String, String)>,

        /// Only run scenarios whose `suite/name` contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Number of scenarios to run concurrently (default: 1)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Per-request timeout in seconds (default: 10)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List suites and their scenarios
    List {
        /// YAML suite files to list
        suites: Vec<PathBuf>,
    },

    /// Validate suite files without sending any requests
    Check {
        /// YAML suite files to check
        #[arg(required = true)]
        suites: Vec<PathBuf>,
    },
}

/// Parse a `SUITE=URL` pair
pub fn parse_base_url(s: &str) -> Result<(String, String), String> {
    let (suite, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SUITE=URL, got '{}'", s))?;
    let suite = suite.trim();
    let url = url.trim();
    if suite.is_empty() || url.is_empty() {
        return Err(format!("expected SUITE=URL, got '{}'", s));
    }
    reqwest::Url::parse(url).map_err(|e| format!("invalid URL '{}': {}", url, e))?;
    Ok((suite.to_string(), url.to_string()))
}
