//! HTTP request building and sending

mod client;
mod method;
mod request;

pub use client::{HttpClient, HttpResponse};
pub use method::HttpMethod;
pub use request::{RequestBody, RequestSpec, ResolvedRequest, JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE};
