//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML test suites and
//! turning each scenario definition into a runnable [`Scenario`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assertions::{FieldSelector, Predicate, ResponseExpectation, SchemaStore};
use crate::common::{Error, Result};
use crate::http::{HttpMethod, RequestBody, RequestSpec};

/// A suite of scenarios sharing one base URL, loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestSuite {
    /// Suite name, also the key for base URL overrides
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Base URL every request path is resolved against
    pub base_url: String,
    /// The scenarios, run independently of each other
    pub scenarios: Vec<ScenarioConfig>,
}

/// One request-and-validate test case
#[derive(Deserialize, Debug)]
pub struct ScenarioConfig {
    /// Name of the scenario, unique within the suite
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// The request to send
    pub request: RequestConfig,
    /// What the response must satisfy
    pub expect: ExpectConfig,
    /// Values to capture from a passing response
    #[serde(default)]
    pub extract: Vec<ExtractConfig>,
}

/// Request definition
#[derive(Deserialize, Debug)]
pub struct RequestConfig {
    pub method: HttpMethod,
    /// Path template, e.g. `/posts/{id}`
    pub path: String,
    /// Values for the path template placeholders
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    /// A string is sent verbatim; any other value is serialized as JSON
    #[serde(default, deserialize_with = "present")]
    pub body: Option<Value>,
    /// Content-Type of the body
    pub content_type: Option<String>,
}

/// A scalar path parameter value
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Float(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Expectations for the response
#[derive(Deserialize, Debug)]
pub struct ExpectConfig {
    /// Expected status code
    pub status: u16,
    /// Expected media type (`json` is shorthand for `application/json`)
    pub content_type: Option<String>,
    /// Body field checks, all evaluated
    #[serde(default)]
    pub body: Vec<BodyCheck>,
    /// Schema document the whole body must match
    pub schema: Option<String>,
}

/// A check on one body field; exactly one predicate must be set
#[derive(Deserialize, Debug)]
pub struct BodyCheck {
    /// Field selector, e.g. `results[0].name.first`
    pub path: String,
    /// Expected value (exact match, numbers compared numerically)
    #[serde(default, deserialize_with = "present")]
    pub equals: Option<Value>,
    /// Value must be present and not null
    #[serde(default)]
    pub not_null: bool,
    /// Value must be null, an empty string, or absent
    #[serde(default)]
    pub empty_or_null: bool,
    /// Value must be a number greater than this
    pub greater_than: Option<f64>,
    /// Value must be an array
    #[serde(default)]
    pub is_array: bool,
    /// Value must match this schema document
    pub matches_schema: Option<String>,
}

/// A value to capture from the response body
#[derive(Deserialize, Debug)]
pub struct ExtractConfig {
    /// Label the value is reported under
    pub name: String,
    /// Field selector for the value
    pub path: String,
}

/// Distinguish an explicit `null` from an absent key
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A captured value definition
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub name: String,
    pub selector: FieldSelector,
}

/// A scenario ready to run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub suite: String,
    pub name: String,
    pub description: Option<String>,
    pub request: RequestSpec,
    pub expectation: ResponseExpectation,
    pub extract: Vec<Extraction>,
}

impl ScenarioConfig {
    /// Build a runnable scenario, locating and compiling any schemas
    pub fn build(
        &self,
        suite: &str,
        schemas: &mut SchemaStore,
        suite_dir: Option<&Path>,
    ) -> Result<Scenario> {
        let mut request = RequestSpec::new(self.request.method, &self.request.path);
        for (name, value) in &self.request.params {
            request = request.param(name, value);
        }
        if let Some(body) = &self.request.body {
            request = request.body(match body {
                Value::String(text) => RequestBody::Raw(text.clone()),
                other => RequestBody::Json(other.clone()),
            });
        }
        if let Some(content_type) = &self.request.content_type {
            request = request.content_type(content_type);
        }
        // Surface template mistakes before anything is sent
        request.resolve_path()?;

        let mut expectation = ResponseExpectation::status(self.expect.status);
        if let Some(content_type) = &self.expect.content_type {
            expectation = expectation.content_type(content_type);
        }
        for check in &self.expect.body {
            let selector = FieldSelector::parse(&check.path)?;
            let predicate = check.predicate(schemas, suite_dir)?;
            expectation = expectation.field(selector, predicate);
        }
        if let Some(name) = &self.expect.schema {
            expectation = expectation.schema(schemas.load_named(name, suite_dir)?);
        }

        let extract = self
            .extract
            .iter()
            .map(|e| {
                Ok(Extraction {
                    name: e.name.clone(),
                    selector: FieldSelector::parse(&e.path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Scenario {
            suite: suite.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            request,
            expectation,
            extract,
        })
    }
}

impl BodyCheck {
    fn predicate(&self, schemas: &mut SchemaStore, suite_dir: Option<&Path>) -> Result<Predicate> {
        let mut predicates = Vec::new();
        if let Some(value) = &self.equals {
            predicates.push(Predicate::Equals(value.clone()));
        }
        if self.not_null {
            predicates.push(Predicate::NotNull);
        }
        if self.empty_or_null {
            predicates.push(Predicate::EmptyOrNull);
        }
        if let Some(bound) = self.greater_than {
            predicates.push(Predicate::GreaterThan(bound));
        }
        if self.is_array {
            predicates.push(Predicate::IsArray);
        }
        if let Some(name) = &self.matches_schema {
            predicates.push(Predicate::MatchesSchema(schemas.load_named(name, suite_dir)?));
        }

        match predicates.len() {
            1 => Ok(predicates.remove(0)),
            0 => Err(Error::Config(format!(
                "Body check on '{}' has no predicate (use one of equals, not_null, empty_or_null, greater_than, is_array, matches_schema)",
                self.path
            ))),
            n => Err(Error::Config(format!(
                "Body check on '{}' sets {} predicates; split it into one check per predicate",
                self.path, n
            ))),
        }
    }
}

/// Where a suite was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteSource {
    Bundled,
    File(PathBuf),
}

/// A parsed suite plus its origin
#[derive(Debug)]
pub struct LoadedSuite {
    pub suite: TestSuite,
    pub source: SuiteSource,
}

impl LoadedSuite {
    /// Parse a suite from YAML text
    pub fn parse(content: &str, source: SuiteSource) -> Result<Self> {
        let suite: TestSuite = serde_yaml::from_str(content).map_err(|e| {
            Error::Config(format!("Failed to parse test suite {}: {}", source, e))
        })?;

        let mut seen = std::collections::HashSet::new();
        for scenario in &suite.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate scenario name '{}' in suite '{}'",
                    scenario.name, suite.name
                )));
            }
        }

        Ok(Self { suite, source })
    }

    /// Load a suite from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test suite '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content, SuiteSource::File(path.to_path_buf()))
    }

    /// Directory relative schema references resolve against
    pub fn dir(&self) -> Option<&Path> {
        match &self.source {
            SuiteSource::Bundled => None,
            SuiteSource::File(path) => Some(path.parent().unwrap_or(Path::new("."))),
        }
    }
}

impl fmt::Display for SuiteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteSource::Bundled => write!(f, "(bundled)"),
            SuiteSource::File(path) => write!(f, "'{}'", path.display()),
        }
    }
}
