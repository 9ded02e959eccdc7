//! Field selectors: path expressions into a JSON document
//!
//! Syntax follows the GPath style used by REST test suites:
//!
//! - `id`, `name.first` — object keys joined with `.`
//! - `[0].id`, `results[0]`, `results[-1]` — array indexes, negative counts from the end
//! - `size()`, `results.size()` — element count, only as the last segment
//! - `` or `$` — the whole document

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::common::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(i64),
    Size,
}

/// A parsed path into a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    source: String,
    segments: Vec<Segment>,
}

/// Why a selector did not resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("field '{key}' not found at '{at}'")]
    MissingKey { at: String, key: String, terminal: bool },

    #[error("index {index} out of range at '{at}' (length {len})")]
    IndexOutOfRange { at: String, index: i64, len: usize },

    #[error("expected an object at '{at}' to look up '{key}', found {found}")]
    NotAnObject { at: String, key: String, found: &'static str },

    #[error("expected an array at '{at}' to index [{index}], found {found}")]
    NotAnArray { at: String, index: i64, found: &'static str },

    #[error("size() needs an array, object or string at '{at}', found {found}")]
    NotSized { at: String, found: &'static str },
}

impl ResolveError {
    /// True when only the final key was absent from an existing object
    pub fn is_missing_leaf(&self) -> bool {
        matches!(self, ResolveError::MissingKey { terminal: true, .. })
    }
}

impl FieldSelector {
    pub fn parse(source: &str) -> Result<Self, Error> {
        let trimmed = source.trim();
        let body = if trimmed == "$" {
            ""
        } else if let Some(rest) = trimmed.strip_prefix("$.") {
            rest
        } else if trimmed.starts_with("$[") {
            &trimmed[1..]
        } else {
            trimmed
        };

        let mut segments = Vec::new();
        if !body.is_empty() {
            let parts: Vec<&str> = body.split('.').collect();
            for (i, part) in parts.iter().enumerate() {
                if *part == "size()" {
                    if i + 1 != parts.len() {
                        return Err(invalid(source, "size() must be the last segment"));
                    }
                    segments.push(Segment::Size);
                    continue;
                }
                parse_part(source, part, &mut segments)?;
            }
        }

        Ok(Self {
            source: trimmed.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Resolve against a document
    ///
    /// `size()` yields a computed number, so the result may be owned.
    pub fn resolve<'a>(&self, document: &'a Value) -> Result<Cow<'a, Value>, ResolveError> {
        let mut current = document;
        let mut at = String::from("$");
        let last = self.segments.len().saturating_sub(1);

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    let object = current.as_object().ok_or_else(|| ResolveError::NotAnObject {
                        at: at.clone(),
                        key: key.clone(),
                        found: json_type(current),
                    })?;
                    current = object.get(key).ok_or_else(|| ResolveError::MissingKey {
                        at: at.clone(),
                        key: key.clone(),
                        terminal: i == last,
                    })?;
                    at.push('.');
                    at.push_str(key);
                }
                Segment::Index(index) => {
                    let array = current.as_array().ok_or_else(|| ResolveError::NotAnArray {
                        at: at.clone(),
                        index: *index,
                        found: json_type(current),
                    })?;
                    let position = if *index < 0 {
                        array.len() as i64 + index
                    } else {
                        *index
                    };
                    current = usize::try_from(position)
                        .ok()
                        .and_then(|p| array.get(p))
                        .ok_or_else(|| ResolveError::IndexOutOfRange {
                            at: at.clone(),
                            index: *index,
                            len: array.len(),
                        })?;
                    at.push_str(&format!("[{}]", index));
                }
                Segment::Size => {
                    let size = match current {
                        Value::Array(items) => items.len(),
                        Value::Object(map) => map.len(),
                        Value::String(s) => s.chars().count(),
                        other => {
                            return Err(ResolveError::NotSized {
                                at,
                                found: json_type(other),
                            })
                        }
                    };
                    return Ok(Cow::Owned(Value::from(size)));
                }
            }
        }

        Ok(Cow::Borrowed(current))
    }
}

fn parse_part(source: &str, part: &str, segments: &mut Vec<Segment>) -> Result<(), Error> {
    let (name, mut rest) = match part.find('[') {
        Some(open) => (&part[..open], &part[open..]),
        None => (part, ""),
    };

    if name.is_empty() && rest.is_empty() {
        return Err(invalid(source, "empty segment"));
    }
    if name.contains([']', '(', ')']) {
        return Err(invalid(source, &format!("unexpected character in '{}'", name)));
    }
    if !name.is_empty() {
        segments.push(Segment::Key(name.to_string()));
    }

    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.split_once(']'))
            .ok_or_else(|| invalid(source, &format!("malformed index in '{}'", part)))?;
        let index: i64 = inner
            .0
            .trim()
            .parse()
            .map_err(|_| invalid(source, &format!("index '{}' is not an integer", inner.0)))?;
        segments.push(Segment::Index(index));
        rest = inner.1;
    }

    Ok(())
}

fn invalid(source: &str, reason: &str) -> Error {
    Error::Config(format!("Invalid field selector '{}': {}", source, reason))
}

/// JSON type name for diagnostics
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            write!(f, "$")
        } else {
            write!(f, "{}", self.source)
        }
    }
}

impl FromStr for FieldSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
