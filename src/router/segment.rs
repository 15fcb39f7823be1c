//! Route, argument, and URI-segment types shared by the tree builder and matcher.

use std::fmt;
use std::sync::Arc;

use hyper::Method;

use crate::handler::BoxedHandler;
use crate::value::ArgType;

/// One `/`-delimited piece of a route's URI template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// A fixed path component, matched by exact text (e.g. `users` in `/users/{id}`).
    Literal(String),
    /// A capturing component bound to the argument named `arg_name` (e.g. `{id}`).
    Capture { arg_name: String },
}

/// Where in the request an argument's raw value is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgSource {
    /// Bound from a `{name}` path segment.
    Path,
    /// Bound from a `?name=value` query parameter.
    Query,
    /// Bound from a field of the JSON or form-encoded request body.
    Body,
}

/// An argument declared by a route: its name, wire-level type, source, and defaulting behavior.
pub struct Arg {
    pub name: String,
    pub ty: ArgType,
    pub source: ArgSource,
    /// Visible in route introspection/help output; has no effect on binding.
    pub visibility: Visibility,
    /// If true, a missing value is not an error: `default` (or the type's zero value) is used.
    pub optional: bool,
    /// The raw text substituted when an optional argument is absent. `None` falls back to the
    /// absence of any default, which binder.rs treats as "do not include this argument at all"
    /// for body/query sources — callers relying on a default should set one explicitly.
    pub default: Option<String>,
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("source", &self.source)
            .field("visibility", &self.visibility)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .finish()
    }
}

/// Whether a declared argument shows up in generated route documentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Injected by a plugin at registration time; hidden from external route listings.
    Internal,
}

/// A single registered endpoint: one HTTP method, one URI template, one version.
pub struct Route {
    pub method: Method,
    /// The route's API version. Higher versions are preferred when several routes with the same
    /// method and URI template coexist; see the tree's descending-version ordering.
    pub version: u32,
    pub segments: Vec<Segment>,
    pub args: Vec<Arg>,
    pub handler: Arc<BoxedHandler>,
    /// Index into `args` of the argument (if any) bound to the whole request body, rather than to
    /// one of its fields. `None` means the body, if present, is decoded field-by-field.
    pub body_arg_index: Option<usize>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("version", &self.version)
            .field("segments", &self.segments)
            .field("args", &self.args)
            .field("body_arg_index", &self.body_arg_index)
            .finish()
    }
}

impl Route {
    /// The literal-only prefix path this route was registered under, for diagnostics.
    pub fn path_template(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Capture { arg_name } => {
                    out.push('{');
                    out.push_str(arg_name);
                    out.push('}');
                }
            }
        }
        out
    }
}
