//! restcheck - declarative HTTP contract checks
//!
//! This library provides a small harness for building parameterized HTTP
//! requests, sending them, and validating JSON responses against status,
//! content type, field and JSON Schema expectations.

pub mod assertions;
pub mod cli;
pub mod commands;
pub mod common;
pub mod http;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
