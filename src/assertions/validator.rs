//! Response validation
//!
//! Status and content type are checked first. Body assertions only run when
//! both gates pass, and every body assertion is evaluated so one run reports
//! all mismatches.

use serde_json::Value;
use std::fmt;

use crate::http::HttpResponse;

use super::predicate::Predicate;
use super::schema::{SchemaRef, SchemaStore};
use super::selector::FieldSelector;

/// One body check: a selector and what must hold there
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssertion {
    pub selector: FieldSelector,
    pub predicate: Predicate,
}

/// Everything a response must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseExpectation {
    pub status: u16,
    pub content_type: Option<String>,
    pub assertions: Vec<FieldAssertion>,
    pub schema: Option<SchemaRef>,
}

impl ResponseExpectation {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            assertions: Vec::new(),
            schema: None,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn field(mut self, selector: FieldSelector, predicate: Predicate) -> Self {
        self.assertions.push(FieldAssertion { selector, predicate });
        self
    }

    pub fn schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    fn needs_body(&self) -> bool {
        !self.assertions.is_empty() || self.schema.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Assertion,
    Schema,
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Selector or pseudo-field (`status`, `content-type`, `body`) that failed
    pub selector: String,
    pub message: String,
}

impl Failure {
    fn assertion(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Assertion,
            selector: selector.into(),
            message: message.into(),
        }
    }

    fn schema(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Schema,
            selector: selector.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.selector, self.message)
    }
}

/// Check a response against an expectation, collecting every failure
pub fn validate(
    response: &HttpResponse,
    expectation: &ResponseExpectation,
    schemas: &SchemaStore,
) -> Vec<Failure> {
    let mut failures = Vec::new();

    if response.status != expectation.status {
        failures.push(Failure::assertion(
            "status",
            format!("expected {}, got {}", expectation.status, response.status),
        ));
    }

    if let Some(expected) = &expectation.content_type {
        let actual = response.content_type();
        if !content_type_matches(expected, actual) {
            failures.push(Failure::assertion(
                "content-type",
                format!("expected {}, got {}", expected, actual.unwrap_or("<none>")),
            ));
        }
    }

    if !failures.is_empty() || !expectation.needs_body() {
        return failures;
    }

    let body = match response.json() {
        Ok(body) => body,
        Err(e) => {
            failures.push(Failure::assertion("body", format!("not valid JSON: {}", e)));
            return failures;
        }
    };

    for assertion in &expectation.assertions {
        check_field(assertion, &body, schemas, &mut failures);
    }

    if let Some(schema) = &expectation.schema {
        check_schema("$", schema, &body, schemas, &mut failures);
    }

    failures
}

fn check_field(
    assertion: &FieldAssertion,
    body: &Value,
    schemas: &SchemaStore,
    failures: &mut Vec<Failure>,
) {
    let selector = assertion.selector.to_string();
    let value = match assertion.selector.resolve(body) {
        Ok(value) => value,
        Err(e) if e.is_missing_leaf() && assertion.predicate.accepts_missing_leaf() => {
            return;
        }
        Err(e) => {
            failures.push(Failure::assertion(selector, e.to_string()));
            return;
        }
    };

    match &assertion.predicate {
        Predicate::MatchesSchema(schema) => {
            check_schema(&selector, schema, &value, schemas, failures);
        }
        predicate => {
            if let Err(message) = predicate.check(&value) {
                failures.push(Failure::assertion(selector, message));
            }
        }
    }
}

fn check_schema(
    selector: &str,
    schema: &SchemaRef,
    value: &Value,
    schemas: &SchemaStore,
    failures: &mut Vec<Failure>,
) {
    match schemas.validate(schema, value) {
        Ok(violations) => failures.extend(violations.into_iter().map(|violation| {
            Failure::schema(
                selector,
                format!("schema '{}' violated at {}", schema.name, violation),
            )
        })),
        Err(e) => failures.push(Failure::schema(selector, e.to_string())),
    }
}

/// Compare media types, ignoring parameters and case
///
/// `json` is shorthand for `application/json`, which also accepts
/// structured-syntax types such as `application/problem+json`.
pub fn content_type_matches(expected: &str, actual: Option<&str>) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let expected = essence(expected);
    let expected = if expected == "json" {
        "application/json".to_string()
    } else {
        expected
    };
    let actual = essence(actual);

    actual == expected || (expected == "application/json" && actual.ends_with("+json"))
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
