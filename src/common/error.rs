//! Error types for restcheck
//!
//! Scenario-level errors are captured in the scenario result and never abort
//! the whole run; only suite loading and CLI setup errors are fatal.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for restcheck
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Network Errors ===
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    // === Schema Errors ===
    #[error("Invalid JSON schema '{name}': {reason}")]
    Schema { name: String, reason: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a network error for a request URL
    pub fn network<S: ToString>(url: &str, reason: S) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a schema load/compile error
    pub fn schema<S: ToString>(name: &str, reason: S) -> Self {
        Self::Schema {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Short machine-friendly category, used in the run summary
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::ConfigParse(_) | Error::FileRead { .. } => "configuration",
            Error::Network { .. } | Error::Timeout(_) => "network",
            Error::Schema { .. } => "schema",
            Error::Json(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }
}
