//! Test runner implementation
//!
//! Each scenario is a linear pipeline: build the request, send it, validate
//! the response. A failure at any stage ends that scenario only and is
//! recorded in its [`ScenarioResult`]; the rest of the run carries on.

use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::assertions::{validate, Failure, FailureKind, SchemaStore};
use crate::common::Error;
use crate::http::{HttpClient, HttpResponse, ResolvedRequest};

use super::config::{LoadedSuite, Scenario};
use super::report;

/// Options controlling a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum scenarios in flight at once (1 = sequential)
    pub jobs: usize,
    /// Print request and response detail for every scenario
    pub verbose: bool,
    /// Only run scenarios whose `suite/name` contains this text
    pub filter: Option<String>,
    /// Base URL overrides keyed by suite name
    pub base_urls: HashMap<String, String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            verbose: false,
            filter: None,
            base_urls: HashMap::new(),
        }
    }
}

impl RunOptions {
    fn selects(&self, suite: &str, scenario: &str) -> bool {
        match &self.filter {
            Some(filter) => format!("{}/{}", suite, scenario).contains(filter.as_str()),
            None => true,
        }
    }

    fn base_url<'a>(&'a self, suite: &'a LoadedSuite) -> &'a str {
        self.base_urls
            .get(&suite.suite.name)
            .map(String::as_str)
            .unwrap_or(&suite.suite.base_url)
    }
}

/// Last pipeline stage a scenario completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Built,
    Sent,
    Validated,
    Reported,
}

/// Outcome of one scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub suite: String,
    pub name: String,
    pub description: Option<String>,
    pub passed: bool,
    /// None when the scenario could not be built
    pub stage: Option<Stage>,
    pub request: Option<ResolvedRequest>,
    pub response: Option<HttpResponse>,
    pub failures: Vec<Failure>,
    /// Configuration or network error that stopped the pipeline
    pub error: Option<Error>,
    pub extracted: Vec<(String, Value)>,
    pub duration: Duration,
}

impl ScenarioResult {
    fn new(suite: &str, name: &str, description: Option<String>) -> Self {
        Self {
            suite: suite.to_string(),
            name: name.to_string(),
            description,
            passed: false,
            stage: None,
            request: None,
            response: None,
            failures: Vec::new(),
            error: None,
            extracted: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Scenario that failed before a request could be built
    pub fn invalid(suite: &str, name: &str, error: Error) -> Self {
        let mut result = Self::new(suite, name, None);
        result.error = Some(error);
        result
    }

    /// `suite/name`
    pub fn id(&self) -> String {
        format!("{}/{}", self.suite, self.name)
    }

    /// Advance a validated result once it has been printed
    fn mark_reported(&mut self) {
        if self.stage == Some(Stage::Validated) {
            self.stage = Some(Stage::Reported);
        }
    }
}

/// Aggregate outcome of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<ScenarioResult>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

/// A scenario ready to send, or the reason it cannot be
#[derive(Debug)]
pub enum Planned {
    Ready { scenario: Scenario, base_url: String },
    Invalid(ScenarioResult),
}

/// Build every selected scenario, compiling schemas into the store
///
/// After planning the store is only read, so scenarios can share it.
pub fn plan(suites: &[LoadedSuite], schemas: &mut SchemaStore, options: &RunOptions) -> Vec<Planned> {
    let mut planned = Vec::new();

    for loaded in suites {
        let suite_name = &loaded.suite.name;
        let base_url = options.base_url(loaded);
        for config in &loaded.suite.scenarios {
            if !options.selects(suite_name, &config.name) {
                continue;
            }
            match config.build(suite_name, schemas, loaded.dir()) {
                Ok(scenario) => planned.push(Planned::Ready {
                    scenario,
                    base_url: base_url.to_string(),
                }),
                Err(e) => {
                    tracing::warn!(suite = %suite_name, scenario = %config.name, error = %e, "Invalid scenario");
                    planned.push(Planned::Invalid(ScenarioResult::invalid(
                        suite_name,
                        &config.name,
                        e,
                    )));
                }
            }
        }
    }

    planned
}

/// Run planned scenarios, printing each result in definition order
pub async fn run_planned(
    planned: Vec<Planned>,
    client: &HttpClient,
    schemas: &SchemaStore,
    options: &RunOptions,
) -> RunSummary {
    let started = Instant::now();
    let jobs = options.jobs.max(1);
    let verbose = options.verbose;

    tracing::info!(scenarios = planned.len(), jobs, "Starting run");

    let results: Vec<ScenarioResult> = stream::iter(planned)
        .map(|planned| async move {
            match planned {
                Planned::Ready { scenario, base_url } => {
                    run_scenario(&scenario, &base_url, client, schemas).await
                }
                Planned::Invalid(result) => result,
            }
        })
        .buffered(jobs)
        .map(|mut result| {
            report::print_result(&result, verbose);
            result.mark_reported();
            result
        })
        .collect()
        .await;

    let summary = RunSummary {
        results,
        duration: started.elapsed(),
    };
    tracing::info!(
        passed = summary.passed(),
        failed = summary.failed(),
        elapsed_ms = summary.duration.as_millis() as u64,
        "Run finished"
    );
    summary
}

/// Plan and run suites in one step
pub async fn run_suites(
    suites: &[LoadedSuite],
    client: &HttpClient,
    schemas: &mut SchemaStore,
    options: &RunOptions,
) -> RunSummary {
    let planned = plan(suites, schemas, options);
    run_planned(planned, client, schemas, options).await
}

/// Run one scenario: build, send, validate
pub async fn run_scenario(
    scenario: &Scenario,
    base_url: &str,
    client: &HttpClient,
    schemas: &SchemaStore,
) -> ScenarioResult {
    let started = Instant::now();
    let mut result = ScenarioResult::new(
        &scenario.suite,
        &scenario.name,
        scenario.description.clone(),
    );

    let request = match scenario.request.resolve(base_url) {
        Ok(request) => request,
        Err(e) => {
            result.error = Some(e);
            result.duration = started.elapsed();
            return result;
        }
    };
    result.stage = Some(Stage::Built);
    tracing::debug!(scenario = %result.id(), request = %request, "Scenario built");

    let sent = client.send(&request).await;
    result.request = Some(request);
    let response = match sent {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(scenario = %result.id(), error = %e, "Request failed");
            result.error = Some(e);
            result.duration = started.elapsed();
            return result;
        }
    };
    result.stage = Some(Stage::Sent);

    result.failures = validate(&response, &scenario.expectation, schemas);
    result.stage = Some(Stage::Validated);

    if result.failures.is_empty() && !scenario.extract.is_empty() {
        extract(scenario, &response, &mut result);
    }

    result.passed = result.failures.is_empty();
    result.response = Some(response);
    result.duration = started.elapsed();
    result
}

fn extract(scenario: &Scenario, response: &HttpResponse, result: &mut ScenarioResult) {
    let body = match response.json() {
        Ok(body) => body,
        Err(e) => {
            result.failures.push(Failure {
                kind: FailureKind::Assertion,
                selector: "body".to_string(),
                message: format!("cannot extract values, body is not valid JSON: {}", e),
            });
            return;
        }
    };

    for extraction in &scenario.extract {
        match extraction.selector.resolve(&body) {
            Ok(value) => result
                .extracted
                .push((extraction.name.clone(), value.into_owned())),
            Err(e) => result.failures.push(Failure {
                kind: FailureKind::Assertion,
                selector: extraction.selector.to_string(),
                message: format!("cannot extract '{}': {}", extraction.name, e),
            }),
        }
    }
}
