//! End-to-end integration tests for restcheck
//!
//! These tests verify the complete run pipeline by:
//! 1. Starting a local mock server that reproduces the two public APIs
//! 2. Pointing the bundled suites at it through base URL overrides
//! 3. Checking results through both the library runner and the binary

use httpmock::prelude::*;
use httpmock::{Method, Mock};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use restcheck::assertions::{FailureKind, SchemaStore};
use restcheck::http::HttpClient;
use restcheck::testing::{self, LoadedSuite, RunOptions, RunSummary, Stage};

const JSON: &str = "application/json; charset=utf-8";

/// Register a JSON response for a method and path
fn json_route<'a>(server: &'a MockServer, method: Method, path: &str, status: u16, body: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(method).path(path);
        then.status(status)
            .header("content-type", JSON)
            .body(body.to_string());
    })
}

fn post(id: u64) -> Value {
    json!({
        "userId": 1,
        "id": id,
        "title": "sunt aut facere repellat provident",
        "body": "quia et suscipit suscipit recusandae"
    })
}

/// Mount the JSONPlaceholder routes the bundled suite exercises
fn mount_jsonplaceholder(server: &MockServer) {
    json_route(server, GET, "/posts", 200, json!([post(1), post(2)]));
    json_route(server, GET, "/posts/1", 200, post(1));
    json_route(
        server,
        GET,
        "/posts/1/comments",
        200,
        json!([{
            "postId": 1,
            "id": 1,
            "name": "id labore ex et quam laborum",
            "email": "Eliseo@gardner.biz",
            "body": "laudantium enim quasi est"
        }]),
    );
    json_route(
        server,
        GET,
        "/users",
        200,
        json!([{"id": 1, "name": "Leanne Graham", "username": "Bret", "email": "Sincere@april.biz"}]),
    );
    json_route(server, DELETE, "/posts/1", 200, json!({}));

    server.mock(|when, then| {
        when.method(PUT)
            .path("/posts/1")
            .json_body(json!({"id": 1, "title": "updated title", "body": "updated body", "userId": 1}));
        then.status(200)
            .header("content-type", JSON)
            .body(json!({"id": 1, "title": "updated title", "body": "updated body", "userId": 1}).to_string());
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/posts")
            .json_body(json!({"title": "foo", "body": "bar", "userId": 1}));
        then.status(201)
            .header("content-type", JSON)
            .body(json!({"title": "foo", "body": "bar", "userId": 1, "id": 101}).to_string());
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/posts")
            .json_body(json!({"body": "a body without a title", "userId": 1}));
        then.status(201)
            .header("content-type", JSON)
            .body(json!({"body": "a body without a title", "userId": 1, "id": 101}).to_string());
    });
}

/// Mount the randomuser.me route
fn mount_randomuser(server: &MockServer) {
    json_route(
        server,
        GET,
        "/api/",
        200,
        json!({
            "results": [{
                "gender": "female",
                "name": {"title": "Miss", "first": "Jennie", "last": "Nichols"},
                "email": "jennie.nichols@example.com",
                "login": {"username": "yellowpeacock117"},
                "phone": "(272) 790-0888"
            }],
            "info": {"seed": "56d27f4a53bd5441", "results": 1, "page": 1, "version": "1.4"}
        }),
    );
}

fn overrides(server: &MockServer) -> HashMap<String, String> {
    HashMap::from([
        ("jsonplaceholder".to_string(), server.base_url()),
        ("randomuser".to_string(), server.base_url()),
    ])
}

/// Run suites through the library on a private runtime
fn run(suites: &[LoadedSuite], options: &RunOptions) -> RunSummary {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    runtime.block_on(async {
        let client = HttpClient::new(Duration::from_secs(5), "restcheck-tests").unwrap();
        let mut schemas = SchemaStore::default();
        testing::run_suites(suites, &client, &mut schemas, options).await
    })
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn failed_ids(summary: &RunSummary) -> Vec<String> {
    summary
        .results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| r.id())
        .collect()
}

#[test]
fn test_builtin_suites_pass_against_conforming_server() {
    let server = MockServer::start();
    mount_jsonplaceholder(&server);
    mount_randomuser(&server);

    let options = RunOptions {
        base_urls: overrides(&server),
        ..RunOptions::default()
    };
    let summary = run(&testing::builtin_suites().unwrap(), &options);

    assert_eq!(summary.results.len(), 11);
    assert!(summary.all_passed(), "failed: {:?}", failed_ids(&summary));
    assert!(summary
        .results
        .iter()
        .all(|r| r.stage == Some(Stage::Reported)));

    let created = summary
        .results
        .iter()
        .find(|r| r.name == "create-post")
        .unwrap();
    assert_eq!(created.response.as_ref().unwrap().status, 201);
    assert_eq!(
        created.extracted,
        vec![("Created Post ID".to_string(), json!(101))]
    );

    let missing = summary
        .results
        .iter()
        .find(|r| r.name == "get-missing-post")
        .unwrap();
    assert_eq!(missing.response.as_ref().unwrap().status, 404);
}

#[test]
fn test_concurrent_run_keeps_definition_order() {
    let server = MockServer::start();
    mount_jsonplaceholder(&server);
    mount_randomuser(&server);

    let sequential = run(
        &testing::builtin_suites().unwrap(),
        &RunOptions {
            base_urls: overrides(&server),
            ..RunOptions::default()
        },
    );
    let concurrent = run(
        &testing::builtin_suites().unwrap(),
        &RunOptions {
            jobs: 4,
            base_urls: overrides(&server),
            ..RunOptions::default()
        },
    );

    let order = |s: &RunSummary| s.results.iter().map(|r| r.id()).collect::<Vec<_>>();
    assert_eq!(order(&sequential), order(&concurrent));
    assert!(concurrent.all_passed(), "failed: {:?}", failed_ids(&concurrent));
}

#[test]
fn test_contract_drift_fails_only_affected_scenarios() {
    let server = MockServer::start();
    // Title missing from the single post, users endpoint broken
    json_route(&server, GET, "/posts/1", 200, json!({"userId": 2, "id": 1, "body": "b"}));
    json_route(&server, GET, "/users", 500, json!({"error": "boom"}));

    let options = RunOptions {
        filter: Some("jsonplaceholder/get-".to_string()),
        base_urls: overrides(&server),
        ..RunOptions::default()
    };
    let summary = run(&testing::builtin_suites().unwrap(), &options);

    let single = summary
        .results
        .iter()
        .find(|r| r.name == "get-single-post")
        .unwrap();
    assert!(!single.passed);
    let selectors: Vec<&str> = single.failures.iter().map(|f| f.selector.as_str()).collect();
    assert_eq!(selectors, vec!["title", "userId"]);

    let users = summary.results.iter().find(|r| r.name == "get-users").unwrap();
    assert_eq!(users.failures.len(), 1);
    assert_eq!(users.failures[0].selector, "status");

    // 404 is the expected status for the absent post, so it still passes
    let missing = summary
        .results
        .iter()
        .find(|r| r.name == "get-missing-post")
        .unwrap();
    assert!(missing.passed);
}

#[test]
fn test_fixture_suite_with_local_schema() {
    let server = MockServer::start();
    json_route(
        &server,
        GET,
        "/posts/1/comments",
        200,
        json!([{"postId": 1, "id": 1, "name": "n", "email": 42, "body": "b"}]),
    );

    let suite = LoadedSuite::load(&fixture("comments.yaml")).unwrap();
    let options = RunOptions {
        base_urls: HashMap::from([("comments".to_string(), server.base_url())]),
        ..RunOptions::default()
    };
    let summary = run(&[suite], &options);

    let result = &summary.results[0];
    assert!(!result.passed);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::Schema);
    assert_eq!(result.failures[0].selector, "[0]");
    assert!(result.failures[0].message.contains("/email"));
}

#[test]
fn test_invalid_scenarios_do_not_abort_run() {
    let server = MockServer::start();
    json_route(&server, GET, "/posts", 200, json!([]));

    let suite = LoadedSuite::load(&fixture("invalid.yaml")).unwrap();
    let options = RunOptions {
        base_urls: HashMap::from([("invalid".to_string(), server.base_url())]),
        ..RunOptions::default()
    };
    let summary = run(&[suite], &options);

    assert_eq!(summary.results.len(), 3);
    assert!(summary.results[0].passed);
    assert!(summary.results[1].stage.is_none());
    assert!(summary.results[2].stage.is_none());
    assert_eq!(summary.failed(), 2);
}

/// Output from running the binary
struct RestcheckOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

/// Run the restcheck binary with an isolated config directory
fn run_restcheck(args: &[&str]) -> RestcheckOutput {
    let config_home = tempfile::tempdir().expect("Failed to create config dir");
    let output = Command::new(env!("CARGO_BIN_EXE_restcheck"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run restcheck");

    RestcheckOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        code: output.status.code(),
    }
}

#[test]
fn test_binary_exits_zero_when_all_pass() {
    let server = MockServer::start();
    mount_jsonplaceholder(&server);
    mount_randomuser(&server);

    let jsonplaceholder = format!("jsonplaceholder={}", server.base_url());
    let randomuser = format!("randomuser={}", server.base_url());
    let output = run_restcheck(&[
        "run",
        "--base-url",
        &jsonplaceholder,
        "--base-url",
        &randomuser,
    ]);

    assert_eq!(
        output.code,
        Some(0),
        "stdout: {}\nstderr: {}",
        output.stdout,
        output.stderr
    );
    assert!(output.stdout.contains("11 of 11 scenarios passed"));
    assert!(output.stdout.contains("Created Post ID: 101"));
}

#[test]
fn test_binary_exits_non_zero_on_failure() {
    let server = MockServer::start();
    mount_randomuser(&server);
    // No JSONPlaceholder routes: every request gets a 404

    let jsonplaceholder = format!("jsonplaceholder={}", server.base_url());
    let randomuser = format!("randomuser={}", server.base_url());
    let output = run_restcheck(&[
        "run",
        "--base-url",
        &jsonplaceholder,
        "--base-url",
        &randomuser,
        "--jobs",
        "3",
    ]);

    assert_eq!(output.code, Some(1), "stdout: {}", output.stdout);
    assert!(output.stdout.contains("jsonplaceholder/get-posts"));
    assert!(output.stdout.contains("expected 200, got 404"));
}

#[test]
fn test_binary_verbose_logs_exchange() {
    let server = MockServer::start();
    mount_randomuser(&server);

    let randomuser = format!("randomuser={}", server.base_url());
    let output = run_restcheck(&[
        "run",
        "--verbose",
        "--filter",
        "randomuser/",
        "--base-url",
        &randomuser,
    ]);

    assert_eq!(output.code, Some(0), "stdout: {}", output.stdout);
    assert!(output.stdout.contains("Request method: GET"));
    assert!(output.stdout.contains(&format!("Request URI: {}/api/", server.base_url())));
    assert!(output.stdout.contains("Status code: 200"));
    assert!(output.stdout.contains("yellowpeacock117"));
}

#[test]
fn test_binary_check_reports_invalid_scenarios() {
    let invalid = fixture("invalid.yaml");
    let output = run_restcheck(&["check", invalid.to_str().unwrap()]);
    assert_eq!(output.code, Some(1));
    assert!(output.stdout.contains("invalid/unresolved-placeholder"));
    assert!(output.stdout.contains("invalid/unknown-schema"));
    assert!(output.stdout.contains("2 invalid scenario(s)"));

    let comments = fixture("comments.yaml");
    let output = run_restcheck(&["check", comments.to_str().unwrap()]);
    assert_eq!(output.code, Some(0), "stdout: {}", output.stdout);
}

#[test]
fn test_binary_list_builtin_suites() {
    let output = run_restcheck(&["list"]);
    assert_eq!(output.code, Some(0));
    assert!(output.stdout.contains("jsonplaceholder"));
    assert!(output.stdout.contains("get-missing-post"));
    assert!(output.stdout.contains("randomuser"));
}

#[test]
fn test_binary_uses_config_file_base_urls() {
    let server = MockServer::start();
    mount_randomuser(&server);

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!("[base_urls]\nrandomuser = \"{}\"\n\n[http]\ntimeout_secs = 5\n", server.base_url()),
    )
    .unwrap();

    let output = run_restcheck(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--filter",
        "randomuser/",
    ]);
    assert_eq!(output.code, Some(0), "stdout: {}", output.stdout);
    assert!(output.stdout.contains("1 of 1 scenarios passed"));
}
