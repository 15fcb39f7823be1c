//! Error taxonomy for the dispatch core, and its mapping onto HTTP responses.
//!
//! The source this crate is modelled after used an open-ended exception hierarchy caught at the
//! outermost dispatch boundary. We replace that with a closed `thiserror` enum so every error that
//! can reach a response has a known HTTP status baked in at the type level.

use hyper::{Body, Response, StatusCode};
use std::fmt;

/// The error taxonomy described in the error handling design: each variant carries its own HTTP
/// status and body text, except `Internal`, whose detail is logged but never sent to the client.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    /// Missing or malformed argument, or malformed query/body syntax.
    #[error("{0}")]
    BadRequest(String),

    /// The caller is not authorized to invoke this route.
    #[error("{0}")]
    Unauthorized(String),

    /// No route matched, or a handler explicitly reported a miss.
    #[error("{0}")]
    NotFound(String),

    /// The caller should back off and retry later.
    #[error("{0}")]
    TooManyRequests(String),

    /// An escape hatch for handlers that want to report an arbitrary status code.
    #[error("{message}")]
    HttpException {
        /// The status code to report to the client.
        status: StatusCode,
        /// The message to report to the client.
        message: String,
    },

    /// Any other failure. The detail is logged server-side; the client sees a generic message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// A `BadRequest` built from a `Display`-able value, for convenient use with `?`.
    pub fn bad_request(msg: impl fmt::Display) -> Self {
        DispatchError::BadRequest(msg.to_string())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::HttpException { status, .. } => *status,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body text returned to the client. `Internal` never leaks its cause.
    pub fn client_message(&self) -> String {
        match self {
            DispatchError::Internal(e) => {
                log::error!("internal dispatch error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Renders this error as the HTTP response the dispatch controller emits.
    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        let body = self.client_message();
        Response::builder()
            .status(status)
            .header(hyper::header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())
            .body(Body::from(body))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}

impl DispatchError {
    /// A best-effort `Clone`: every variant round-trips exactly except `Internal`, whose wrapped
    /// `anyhow::Error` cause isn't `Clone`, so it collapses to the equivalent `HttpException`
    /// (same status, same client-visible message). Used where an error needs to be forwarded
    /// across more than one combinator boundary (e.g. through both a plugin chain and the
    /// dispatch listener) without being consumed by the first.
    pub fn fork(&self) -> Self {
        match self {
            DispatchError::BadRequest(m) => DispatchError::BadRequest(m.clone()),
            DispatchError::Unauthorized(m) => DispatchError::Unauthorized(m.clone()),
            DispatchError::NotFound(m) => DispatchError::NotFound(m.clone()),
            DispatchError::TooManyRequests(m) => DispatchError::TooManyRequests(m.clone()),
            DispatchError::HttpException { status, message } => DispatchError::HttpException {
                status: *status,
                message: message.clone(),
            },
            DispatchError::Internal(e) => DispatchError::HttpException {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{:#}", e),
            },
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::BadRequest(format!("invalid JSON: {}", e))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DispatchError>;
