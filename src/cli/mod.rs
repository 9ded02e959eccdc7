//! CLI command handling
//!
//! Loads configuration and suites, dispatches commands and formats output.

use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assertions::SchemaStore;
use crate::commands::Commands;
use crate::common::{Config, Error, Result};
use crate::http::HttpClient;
use crate::testing::{self, LoadedSuite, Planned, RunOptions};

/// Dispatch a CLI command
///
/// Returns `Ok(true)` when everything passed, `Ok(false)` when any
/// scenario failed or a suite was invalid.
pub async fn dispatch(command: Commands, config_path: Option<&Path>, verbose: bool) -> Result<bool> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match command {
        Commands::Run {
            suites,
            base_urls,
            filter,
            jobs,
            timeout,
        } => {
            let loaded = load_suites(&suites)?;

            let timeout = timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.http.timeout());
            if timeout.is_zero() {
                return Err(Error::Config("--timeout must be at least 1 second".to_string()));
            }
            let jobs = jobs.unwrap_or(config.runner.jobs);
            if jobs == 0 {
                return Err(Error::Config("--jobs must be at least 1".to_string()));
            }

            let options = RunOptions {
                jobs,
                verbose,
                filter,
                base_urls: merge_base_urls(&config, base_urls, &loaded),
            };

            let client = HttpClient::new(timeout, &config.http.user_agent)?;
            let mut schemas = SchemaStore::new(config.schemas.dir.clone());
            let planned = testing::plan(&loaded, &mut schemas, &options);

            if planned.is_empty() {
                println!("{}", "No scenarios matched".yellow());
                return Ok(true);
            }

            println!(
                "\n{} {} scenario(s) from {}",
                "Running".blue().bold(),
                planned.len(),
                suite_names(&loaded)
            );

            let summary = testing::run_planned(planned, &client, &schemas, &options).await;
            testing::print_summary(&summary);
            Ok(summary.all_passed())
        }

        Commands::List { suites } => {
            let loaded = load_suites(&suites)?;
            for suite in &loaded {
                println!(
                    "{} {} {}",
                    suite.suite.name.white().bold(),
                    config
                        .base_url(&suite.suite.name)
                        .unwrap_or(&suite.suite.base_url)
                        .dimmed(),
                    suite.source.to_string().dimmed()
                );
                if let Some(description) = &suite.suite.description {
                    println!("  {}", description.dimmed());
                }
                for scenario in &suite.suite.scenarios {
                    println!(
                        "  {:<28} {:<7} {} → {}",
                        scenario.name,
                        scenario.request.method.to_string(),
                        scenario.request.path,
                        scenario.expect.status
                    );
                }
            }
            Ok(true)
        }

        Commands::Check { suites } => {
            let loaded = load_suites(&suites)?;
            let mut schemas = SchemaStore::new(config.schemas.dir.clone());
            let options = RunOptions {
                base_urls: merge_base_urls(&config, Vec::new(), &loaded),
                ..RunOptions::default()
            };

            let mut invalid = 0;
            for planned in testing::plan(&loaded, &mut schemas, &options) {
                let outcome = match planned {
                    Planned::Ready { scenario, base_url } => scenario
                        .request
                        .resolve(&base_url)
                        .map(|_| format!("{}/{}", scenario.suite, scenario.name))
                        .map_err(|e| (format!("{}/{}", scenario.suite, scenario.name), e)),
                    Planned::Invalid(mut result) => Err((
                        result.id(),
                        result
                            .error
                            .take()
                            .unwrap_or_else(|| Error::Internal("invalid scenario without error".to_string())),
                    )),
                };
                match outcome {
                    Ok(id) => println!("  {} {}", "✓".green(), id),
                    Err((id, e)) => {
                        invalid += 1;
                        println!("  {} {}: {}", "✗".red(), id, e);
                    }
                }
            }

            if invalid == 0 {
                println!("\n{}", "All scenarios are valid".green().bold());
                Ok(true)
            } else {
                println!(
                    "\n{}",
                    format!("{} invalid scenario(s)", invalid).red().bold()
                );
                Ok(false)
            }
        }
    }
}

/// Load the given suite files, or the bundled suites when none are given
pub fn load_suites(paths: &[PathBuf]) -> Result<Vec<LoadedSuite>> {
    if paths.is_empty() {
        return testing::builtin_suites();
    }

    let mut loaded: Vec<LoadedSuite> = Vec::with_capacity(paths.len());
    for path in paths {
        let suite = LoadedSuite::load(path)?;
        if loaded.iter().any(|s| s.suite.name == suite.suite.name) {
            return Err(Error::Config(format!(
                "Suite name '{}' is used by more than one file",
                suite.suite.name
            )));
        }
        loaded.push(suite);
    }
    Ok(loaded)
}

/// Config file overrides first, then command line overrides on top
fn merge_base_urls(
    config: &Config,
    cli: Vec<(String, String)>,
    suites: &[LoadedSuite],
) -> HashMap<String, String> {
    let mut merged = config.base_urls.clone();
    merged.extend(cli);

    for name in merged.keys() {
        if !suites.iter().any(|s| &s.suite.name == name) {
            tracing::warn!(suite = %name, "Base URL override for unknown suite");
        }
    }
    merged
}

fn suite_names(suites: &[LoadedSuite]) -> String {
    suites
        .iter()
        .map(|s| s.suite.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
