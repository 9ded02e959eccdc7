//! Scenario suites and the runner
//!
//! Suites are YAML files (or the bundled defaults) listing request and
//! expectation pairs. The runner executes them independently and reports
//! a pass/fail summary.

mod builtin;
mod config;
mod report;
mod runner;

pub use builtin::builtin_suites;
pub use config::*;
pub use report::{print_result, print_summary};
pub use runner::{
    plan, run_planned, run_scenario, run_suites, Planned, RunOptions, RunSummary, ScenarioResult,
    Stage,
};
