//! The inbound request / outbound response contract the dispatch controller works against.
//!
//! `Transport` decouples the dispatcher from `hyper` so the same dispatch logic can run against
//! an in-memory request for tests, not just a live socket.

use hyper::{HeaderMap, Method, StatusCode};

/// A decoded inbound request: method, path, query string, headers, and a body buffer that has
/// not yet been parsed into typed arguments.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    /// Path only, still percent-encoded as received on the wire; never includes the query string.
    /// The router matches segments verbatim (encoded), and only the binder decodes a capture once
    /// it is bound to a single path argument.
    pub path: String,
    /// Raw query string, not including the leading `?`.
    pub query: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>) -> Self {
        TransportRequest {
            method: Method::GET,
            path: path.into(),
            query: String::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: hyper::header::HeaderName, value: &str) -> Self {
        if let Ok(v) = hyper::header::HeaderValue::from_str(value) {
            self.headers.insert(name, v);
        }
        self
    }

    pub fn with_json_body(mut self, value: &serde_json::Value) -> Self {
        self.body = serde_json::to_vec(value).unwrap_or_default();
        if let Ok(value) = hyper::header::HeaderValue::from_str(mime::APPLICATION_JSON.as_ref()) {
            self.headers.insert(hyper::header::CONTENT_TYPE, value);
        }
        self
    }
}

/// An outbound response assembled from a `DispatchError` or a handler's `hyper::Response`.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}
