//! HTTP client adapter
//!
//! Thin wrapper over `reqwest`: one attempt per request, bounded by a
//! timeout, no retries.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::time::{Duration, Instant};

use crate::common::{Error, Result};

use super::request::ResolvedRequest;

/// A captured response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub duration: Duration,
}

impl HttpResponse {
    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Body decoded as UTF-8, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Shared HTTP client; cheap to clone
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { inner, timeout })
    }

    /// Send a request and read the full response body
    pub async fn send(&self, request: &ResolvedRequest) -> Result<HttpResponse> {
        let mut builder = self.inner.request(request.method.into(), &request.url);
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        tracing::debug!(method = %request.method, url = %request.url, "Sending request");
        if let Some(body) = &request.body {
            tracing::trace!(body = %body, "Request body");
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(&request.url, e))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(&request.url, e))?
            .to_vec();
        let duration = started.elapsed();

        tracing::debug!(
            status,
            bytes = body.len(),
            elapsed_ms = duration.as_millis() as u64,
            "Received response"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
            duration,
        })
    }

    fn map_error(&self, url: &str, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.timeout.as_secs())
        } else {
            Error::network(url, error_chain(&error))
        }
    }
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect()
}

/// Flatten an error and its sources into one line
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
