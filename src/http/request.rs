//! Request building
//!
//! A [`RequestSpec`] is a method, a path template such as `/posts/{id}`,
//! the values for its placeholders and an optional body. Resolving it
//! against a base URL is pure: nothing touches the network until the
//! resolved request is handed to the client.

use std::collections::BTreeMap;
use std::fmt;

use crate::common::{Error, Result};

use super::method::HttpMethod;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Caller-supplied request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent verbatim (may already be serialized JSON)
    Raw(String),
    /// Serialized with serde_json before sending
    Json(serde_json::Value),
}

impl RequestBody {
    fn to_text(&self) -> Result<String> {
        match self {
            RequestBody::Raw(text) => Ok(text.clone()),
            RequestBody::Json(value) => Ok(serde_json::to_string(value)?),
        }
    }

    fn default_content_type(&self) -> &'static str {
        match self {
            RequestBody::Raw(_) => TEXT_CONTENT_TYPE,
            RequestBody::Json(_) => JSON_CONTENT_TYPE,
        }
    }
}

/// An unresolved request: method, path template, parameters and body
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path_template: String,
    pub path_params: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub content_type: Option<String>,
}

/// A request ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

impl fmt::Display for ResolvedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A piece of a parsed path template
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path_template: impl Into<String>) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            path_params: BTreeMap::new(),
            body: None,
            content_type: None,
        }
    }

    /// Supply a value for a `{name}` placeholder
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.insert(name.into(), value.to_string());
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Substitute path parameters into the template
    ///
    /// Values are percent-encoded so each fills exactly one path segment.
    /// Fails if a placeholder has no value or a supplied value is unused.
    pub fn resolve_path(&self) -> Result<String> {
        let parts = parse_template(&self.path_template)?;
        let mut path = String::with_capacity(self.path_template.len());
        let mut used = Vec::new();

        for part in parts {
            match part {
                TemplatePart::Literal(text) => path.push_str(text),
                TemplatePart::Placeholder(name) => {
                    let value = self.path_params.get(name).ok_or_else(|| {
                        Error::Config(format!(
                            "No value supplied for path parameter '{{{}}}' in '{}'",
                            name, self.path_template
                        ))
                    })?;
                    path.push_str(&encode_segment(name, value)?);
                    used.push(name);
                }
            }
        }

        let unused: Vec<&str> = self
            .path_params
            .keys()
            .map(String::as_str)
            .filter(|name| !used.contains(name))
            .collect();
        if !unused.is_empty() {
            return Err(Error::Config(format!(
                "Path parameter(s) {} not used by '{}'",
                unused.join(", "),
                self.path_template
            )));
        }

        Ok(path)
    }

    /// Resolve against a base URL into a sendable request
    pub fn resolve(&self, base_url: &str) -> Result<ResolvedRequest> {
        let path = self.resolve_path()?;
        let joined = join_url(base_url, &path);
        let url = reqwest::Url::parse(&joined)
            .map_err(|e| Error::Config(format!("Invalid request URL '{}': {}", joined, e)))?;

        let body = self.body.as_ref().map(RequestBody::to_text).transpose()?;
        let content_type = match (&self.content_type, &self.body) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, Some(body)) => Some(body.default_content_type().to_string()),
            (None, None) => None,
        };

        if body.is_some() && !self.method.allows_body() {
            tracing::warn!(method = %self.method, path = %self.path_template, "Request body on a method that usually has none");
        }

        Ok(ResolvedRequest {
            method: self.method,
            url: url.to_string(),
            body,
            content_type,
        })
    }
}

fn parse_template(template: &str) -> Result<Vec<TemplatePart<'_>>> {
    let mut parts = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(Error::Config(format!(
                "Unmatched '}}' in path template '{}'",
                template
            )));
        }
        if open > 0 {
            parts.push(TemplatePart::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            Error::Config(format!("Unclosed '{{' in path template '{}'", template))
        })?;
        let name = &after[..close];
        if name.is_empty() || name.contains('{') {
            return Err(Error::Config(format!(
                "Invalid placeholder '{{{}}}' in path template '{}'",
                name, template
            )));
        }
        parts.push(TemplatePart::Placeholder(name));
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        parts.push(TemplatePart::Literal(rest));
    }
    Ok(parts)
}

/// Percent-encode a path parameter value
///
/// `.` and `..` are rejected: URL parsing treats them (encoded or not) as
/// dot segments and would move the request to another path.
fn encode_segment(name: &str, value: &str) -> Result<String> {
    if value == "." || value == ".." {
        return Err(Error::Config(format!(
            "Path parameter '{}' cannot be '{}'",
            name, value
        )));
    }
    Ok(urlencoding::encode(value).into_owned())
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_substitutes_params() {
        let spec = RequestSpec::new(HttpMethod::Get, "/posts/{id}/comments").param("id", 1);
        let req = spec.resolve("https://jsonplaceholder.typicode.com").unwrap();
        assert_eq!(req.url, "https://jsonplaceholder.typicode.com/posts/1/comments");
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.body.is_none());
        assert!(req.content_type.is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let spec = RequestSpec::new(HttpMethod::Put, "/posts/{id}")
            .param("id", 1)
            .body(RequestBody::Json(json!({"id": 1, "title": "updated title"})));
        let first = spec.resolve("https://example.com/").unwrap();
        let second = spec.resolve("https://example.com/").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "PUT https://example.com/posts/1");
    }

    #[test]
    fn test_missing_param_is_config_error() {
        let spec = RequestSpec::new(HttpMethod::Get, "/posts/{id}");
        let err = spec.resolve("https://example.com").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("{id}")));
    }

    #[test]
    fn test_unused_param_is_config_error() {
        let spec = RequestSpec::new(HttpMethod::Get, "/posts").param("id", 1);
        let err = spec.resolve_path().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("id")));
    }

    #[test]
    fn test_malformed_templates() {
        for template in ["/posts/{id", "/posts/id}", "/posts/{}", "/posts/{{id}}"] {
            let spec = RequestSpec::new(HttpMethod::Get, template).param("id", 1);
            assert!(spec.resolve_path().is_err(), "template {template} should fail");
        }
    }

    #[test]
    fn test_multiple_placeholders() {
        let spec = RequestSpec::new(HttpMethod::Get, "/users/{user}/posts/{post}")
            .param("user", 3)
            .param("post", 7);
        assert_eq!(spec.resolve_path().unwrap(), "/users/3/posts/7");
    }

    #[test]
    fn test_param_cannot_add_query_or_fragment() {
        let spec = RequestSpec::new(HttpMethod::Get, "/posts/{id}").param("id", "1?userId=2#x");
        let req = spec.resolve("https://jsonplaceholder.typicode.com").unwrap();
        assert_eq!(
            req.url,
            "https://jsonplaceholder.typicode.com/posts/1%3FuserId%3D2%23x"
        );
        let url = reqwest::Url::parse(&req.url).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_param_slash_stays_in_one_segment() {
        let spec = RequestSpec::new(HttpMethod::Get, "/posts/{id}/comments").param("id", "../users");
        let req = spec.resolve("https://jsonplaceholder.typicode.com").unwrap();
        assert_eq!(
            req.url,
            "https://jsonplaceholder.typicode.com/posts/..%2Fusers/comments"
        );
        let url = reqwest::Url::parse(&req.url).unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_dot_segment_params_rejected() {
        for value in [".", ".."] {
            let spec = RequestSpec::new(HttpMethod::Get, "/posts/{id}").param("id", value);
            let err = spec.resolve("https://jsonplaceholder.typicode.com").unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains("'id'")), "{value}: {err}");
        }
    }

    #[test]
    fn test_plain_param_values_unchanged() {
        let spec = RequestSpec::new(HttpMethod::Get, "/users/{name}").param("name", "Bret-1_a.b~");
        assert_eq!(spec.resolve_path().unwrap(), "/users/Bret-1_a.b~");
    }

    #[test]
    fn test_json_body_gets_json_content_type() {
        let spec = RequestSpec::new(HttpMethod::Post, "/posts")
            .body(RequestBody::Json(json!({"title": "foo", "body": "bar", "userId": 1})));
        let req = spec.resolve("https://example.com").unwrap();
        assert_eq!(req.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
        let sent: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, json!({"title": "foo", "body": "bar", "userId": 1}));
    }

    #[test]
    fn test_raw_body_sent_verbatim() {
        let raw = r#"{"title": "foo", "body": "bar", "userId": 1}"#;
        let spec = RequestSpec::new(HttpMethod::Post, "/posts")
            .body(RequestBody::Raw(raw.to_string()))
            .content_type(JSON_CONTENT_TYPE);
        let req = spec.resolve("https://example.com").unwrap();
        assert_eq!(req.body.as_deref(), Some(raw));
        assert_eq!(req.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn test_invalid_base_url() {
        let spec = RequestSpec::new(HttpMethod::Get, "/posts");
        assert!(matches!(spec.resolve("not a url"), Err(Error::Config(_))));
    }

    #[test]
    fn test_join_url_slashes() {
        assert_eq!(join_url("https://randomuser.me", "/api/"), "https://randomuser.me/api/");
        assert_eq!(join_url("https://randomuser.me/", "api/"), "https://randomuser.me/api/");
        assert_eq!(join_url("https://randomuser.me/", ""), "https://randomuser.me");
    }
}
