//! Response assertions
//!
//! Field selectors locate values in a JSON body, predicates check them, and
//! the validator applies a whole [`ResponseExpectation`] to a response.

mod predicate;
mod schema;
mod selector;
mod validator;

pub use predicate::{preview, Predicate};
pub use schema::{SchemaLocation, SchemaRef, SchemaStore, SchemaViolation};
pub use selector::{json_type, FieldSelector, ResolveError, Segment};
pub use validator::{
    content_type_matches, validate, Failure, FailureKind, FieldAssertion, ResponseExpectation,
};
