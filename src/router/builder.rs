//! Fluent route registration, wired through the plugin registry.

use std::sync::Arc;

use hyper::Method;

use crate::error::DispatchError;
use crate::handler::{boxed, Handler, IntoResponse, RouteContext};
use crate::router::segment::{Arg, ArgSource, Route, Segment, Visibility};
use crate::router::Router;
use crate::task::Task;
use crate::value::ArgType;

/// Builds one `Route` fluently, then registers it with a `Router` on [`RouteBuilder::register`].
pub struct RouteBuilder<'r> {
    router: &'r mut Router,
    method: Method,
    version: u32,
    path: String,
    args: Vec<Arg>,
    body_arg_index: Option<usize>,
}

impl<'r> RouteBuilder<'r> {
    pub(crate) fn new(router: &'r mut Router, method: Method, path: impl Into<String>) -> Self {
        RouteBuilder {
            router,
            method,
            version: 1,
            path: path.into(),
            args: Vec::new(),
            body_arg_index: None,
        }
    }

    /// Sets this route's API version; routes registered at the same method and path with
    /// different versions coexist, and the dispatcher picks the best match per request.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Declares a required argument bound from the request's query string or path captures.
    pub fn arg(mut self, name: impl Into<String>, ty: ArgType, source: ArgSource) -> Self {
        self.args.push(Arg {
            name: name.into(),
            ty,
            source,
            visibility: Visibility::Public,
            optional: false,
            default: None,
        });
        self
    }

    /// Declares an optional argument with a default raw value used when absent.
    pub fn optional_arg(
        mut self,
        name: impl Into<String>,
        ty: ArgType,
        source: ArgSource,
        default: impl Into<String>,
    ) -> Self {
        self.args.push(Arg {
            name: name.into(),
            ty,
            source,
            visibility: Visibility::Public,
            optional: true,
            default: Some(default.into()),
        });
        self
    }

    /// Declares that one argument receives the entire request body verbatim, rather than one
    /// named field of it.
    pub fn body_arg(mut self, name: impl Into<String>, ty: ArgType) -> Self {
        self.body_arg_index = Some(self.args.len());
        self.args.push(Arg {
            name: name.into(),
            ty,
            source: ArgSource::Body,
            visibility: Visibility::Public,
            optional: false,
            default: None,
        });
        self
    }

    /// Finalizes the route with a typed handler function and registers it on the router,
    /// running every plugin's `modify_route` hook over its argument list first.
    pub fn register<T, F>(self, f: F)
    where
        T: IntoResponse + Send + 'static,
        F: Fn(RouteContext) -> Task<Result<T, DispatchError>> + Send + Sync + 'static,
    {
        self.register_handler(boxed(f))
    }

    /// Finalizes the route with a pre-boxed handler; used when a handler is shared across
    /// multiple registrations.
    pub fn register_handler(self, handler: Arc<dyn Handler>) {
        let segments = parse_segments(&self.path);
        let mut route = Route {
            method: self.method,
            version: self.version,
            segments,
            args: self.args,
            handler,
            body_arg_index: self.body_arg_index,
        };
        self.router.plugins().apply_modify_route(&mut route);
        self.router.insert(route);
    }
}

/// Splits a `/users/{id}` style template into `Segment`s.
fn parse_segments(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Segment::Capture {
                    arg_name: name.to_string(),
                }
            } else {
                Segment::Literal(s.to_string())
            }
        })
        .collect()
}
