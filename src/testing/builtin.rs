//! Suites bundled into the binary

use crate::common::{Error, Result};

use super::config::{LoadedSuite, SuiteSource};

const BUILTIN: &[(&str, &str)] = &[
    (
        "jsonplaceholder",
        include_str!("../../suites/jsonplaceholder.yaml"),
    ),
    ("randomuser", include_str!("../../suites/randomuser.yaml")),
];

/// Parse every bundled suite
pub fn builtin_suites() -> Result<Vec<LoadedSuite>> {
    BUILTIN
        .iter()
        .map(|(name, content)| parse_builtin(name, content))
        .collect()
}

/// Parse one bundled suite, checking it carries the name it is registered under
fn parse_builtin(name: &str, content: &str) -> Result<LoadedSuite> {
    let loaded = LoadedSuite::parse(content, SuiteSource::Bundled)?;
    if loaded.suite.name != name {
        return Err(Error::Internal(format!(
            "bundled suite '{}' declares name '{}'",
            name, loaded.suite.name
        )));
    }
    Ok(loaded)
}
