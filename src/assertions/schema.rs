//! JSON Schema loading and validation
//!
//! Schema documents are looked up by name: first among the schemas bundled
//! into the binary, then next to the suite file, then in the configured
//! schema directory. Compiled validators are cached for the whole run and
//! only read once the run starts.

use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Schemas compiled into the binary
const BUNDLED: &[(&str, &str)] = &[(
    "post-schema.json",
    include_str!("../../schemas/post-schema.json"),
)];

/// Where a schema document lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaLocation {
    Bundled,
    File(PathBuf),
}

/// A located schema document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef {
    pub name: String,
    pub location: SchemaLocation,
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            SchemaLocation::Bundled => write!(f, "{}", self.name),
            SchemaLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the validated instance
    pub instance_path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.instance_path.is_empty() {
            "/"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "{}: {}", path, self.message)
    }
}

/// Compiled schema cache
#[derive(Default)]
pub struct SchemaStore {
    schema_dir: Option<PathBuf>,
    compiled: HashMap<SchemaRef, Validator>,
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("schema_dir", &self.schema_dir)
            .field("compiled", &self.compiled.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaStore {
    pub fn new(schema_dir: Option<PathBuf>) -> Self {
        Self {
            schema_dir,
            compiled: HashMap::new(),
        }
    }

    /// Find a schema document by name
    pub fn locate(&self, name: &str, suite_dir: Option<&Path>) -> Result<SchemaRef> {
        if BUNDLED.iter().any(|(bundled, _)| *bundled == name) {
            return Ok(SchemaRef {
                name: name.to_string(),
                location: SchemaLocation::Bundled,
            });
        }

        let candidates = suite_dir
            .into_iter()
            .chain(self.schema_dir.as_deref())
            .map(|dir| dir.join(name));
        let mut searched = Vec::new();
        for candidate in candidates {
            if candidate.is_file() {
                return Ok(SchemaRef {
                    name: name.to_string(),
                    location: SchemaLocation::File(candidate),
                });
            }
            searched.push(candidate.display().to_string());
        }

        let searched = if searched.is_empty() {
            "bundled schemas".to_string()
        } else {
            format!("bundled schemas, {}", searched.join(", "))
        };
        Err(Error::schema(name, format!("not found (searched: {})", searched)))
    }

    /// Compile a schema into the cache if not already present
    pub fn load(&mut self, schema: &SchemaRef) -> Result<()> {
        if self.compiled.contains_key(schema) {
            return Ok(());
        }

        let text = match &schema.location {
            SchemaLocation::Bundled => BUNDLED
                .iter()
                .find(|(name, _)| *name == schema.name)
                .map(|(_, text)| text.to_string())
                .ok_or_else(|| Error::schema(&schema.name, "not bundled"))?,
            SchemaLocation::File(path) => {
                std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?
            }
        };

        let document: Value = serde_json::from_str(&text)
            .map_err(|e| Error::schema(&schema.name, format!("not valid JSON: {}", e)))?;
        let validator = jsonschema::validator_for(&document)
            .map_err(|e| Error::schema(&schema.name, e))?;

        tracing::debug!(schema = %schema, "Compiled JSON schema");
        self.compiled.insert(schema.clone(), validator);
        Ok(())
    }

    /// Locate and compile in one step
    pub fn load_named(&mut self, name: &str, suite_dir: Option<&Path>) -> Result<SchemaRef> {
        let schema = self.locate(name, suite_dir)?;
        self.load(&schema)?;
        Ok(schema)
    }

    /// Validate an instance, returning every violation
    pub fn validate(&self, schema: &SchemaRef, instance: &Value) -> Result<Vec<SchemaViolation>> {
        let validator = self
            .compiled
            .get(schema)
            .ok_or_else(|| Error::Internal(format!("schema '{}' was not loaded before the run", schema)))?;

        Ok(validator
            .iter_errors(instance)
            .map(|error| SchemaViolation {
                instance_path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect())
    }
}
