//! Predicates applied to a resolved field value

use serde_json::Value;
use std::fmt;

use super::schema::SchemaRef;
use super::selector::json_type;

/// A check on a single JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Value equals the expected JSON value (numbers compare numerically)
    Equals(Value),
    NotNull,
    /// null or an empty string
    EmptyOrNull,
    /// Numeric value strictly greater than the bound
    GreaterThan(f64),
    IsArray,
    /// Value validates against a schema document
    MatchesSchema(SchemaRef),
}

impl Predicate {
    /// Whether an absent final key counts as a null value
    pub fn accepts_missing_leaf(&self) -> bool {
        matches!(self, Predicate::EmptyOrNull)
    }

    /// Evaluate against a value, describing the mismatch on failure
    ///
    /// `MatchesSchema` needs a schema store and is evaluated by the validator.
    pub fn check(&self, actual: &Value) -> Result<(), String> {
        let passed = match self {
            Predicate::Equals(expected) => json_equals(expected, actual),
            Predicate::NotNull => !actual.is_null(),
            Predicate::EmptyOrNull => match actual {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            },
            Predicate::GreaterThan(bound) => match actual.as_f64() {
                Some(n) => n > *bound,
                None => {
                    return Err(format!(
                        "expected a number greater than {}, found {} {}",
                        format_bound(*bound),
                        json_type(actual),
                        preview(actual)
                    ))
                }
            },
            Predicate::IsArray => actual.is_array(),
            Predicate::MatchesSchema(_) => true,
        };

        if passed {
            Ok(())
        } else {
            Err(format!("expected {}, found {}", self, preview(actual)))
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals(value) => write!(f, "{}", preview(value)),
            Predicate::NotNull => write!(f, "a non-null value"),
            Predicate::EmptyOrNull => write!(f, "null or an empty string"),
            Predicate::GreaterThan(bound) => write!(f, "a number greater than {}", format_bound(*bound)),
            Predicate::IsArray => write!(f, "an array"),
            Predicate::MatchesSchema(schema) => write!(f, "a value matching schema '{}'", schema.name),
        }
    }
}

fn json_equals(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => expected == actual,
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

/// Compact rendering of a value for failure messages
pub fn preview(value: &Value) -> String {
    const LIMIT: usize = 80;
    let text = value.to_string();
    if text.chars().count() > LIMIT {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{}…", cut)
    } else {
        text
    }
}
