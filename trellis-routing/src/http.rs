//! Minimal HTTP vocabulary for route registration.
//!
//! These types carry just enough request/response shape for before/after
//! handlers to run against; parsing, matching, and transport belong to the
//! external dispatch engine.

use std::collections::HashMap;
use std::fmt;

/// HTTP verbs the builder can register routes for.
///
/// `HEAD` and `OPTIONS` never appear in the fluent verb methods but are
/// recognized verb prefixes in controller action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// HTTP PATCH.
    Patch,
    /// HTTP HEAD.
    Head,
    /// HTTP OPTIONS.
    Options,
}

impl Method {
    /// Canonical upper-case name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Map a lower-case controller-action prefix to a verb.
    pub(crate) fn from_verb_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            "head" => Some(Self::Head),
            "options" => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-flight request as seen by before/after handlers.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request verb.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Parameters extracted from the matched pattern.
    pub path_params: HashMap<String, String>,
    /// Decoded query-string parameters.
    pub query_params: HashMap<String, String>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl Request {
    /// Create a request with the given verb and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            body: Vec::new(),
        }
    }
}

/// A response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// A `200 OK` response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// A `401 Unauthorized` response.
    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    /// Set a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_verb_prefixes() {
        assert_eq!(Method::from_verb_prefix("get"), Some(Method::Get));
        assert_eq!(Method::from_verb_prefix("options"), Some(Method::Options));
        assert_eq!(Method::from_verb_prefix("update"), None);
        assert_eq!(Method::from_verb_prefix(""), None);
    }

    #[test]
    fn test_response_builder() {
        let response = Response::ok()
            .with_header("Content-Type", "application/json")
            .with_body("{}");

        assert_eq!(response.status, 200);
        assert_eq!(response.headers["Content-Type"], "application/json");
        assert_eq!(response.body_str(), "{}");
    }

    #[test]
    fn test_request_new() {
        let request = Request::new(Method::Post, "/posts");
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/posts");
        assert!(request.path_params.is_empty());
        assert!(request.body.is_empty());
    }
}
