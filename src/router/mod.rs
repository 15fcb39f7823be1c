//! The router: one segment tree per HTTP method, plus the plugin registry routes are built
//! against.

pub mod builder;
pub mod hash;
pub mod segment;
pub mod tree;

use std::collections::HashMap;
use std::sync::Arc;

use hyper::Method;

use crate::plugin::{Plugin, PluginRegistry};
use crate::router::segment::Route;
use crate::router::tree::SegmentTree;

pub use builder::RouteBuilder;

/// Holds every registered route, partitioned by HTTP method, and the plugins applied to them.
#[derive(Default)]
pub struct Router {
    trees: HashMap<Method, SegmentTree>,
    plugins: PluginRegistry,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    /// Registers a plugin. Plugins must be registered before any route that should see their
    /// `modify_route` hook is built.
    pub fn plugin(&mut self, plugin: Arc<dyn Plugin>) -> usize {
        self.plugins.register(plugin)
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    /// Starts building a route for `method` at `path` (a `/users/{id}`-style template).
    pub fn route(&mut self, method: Method, path: impl Into<String>) -> RouteBuilder<'_> {
        RouteBuilder::new(self, method, path)
    }

    pub(crate) fn insert(&mut self, route: Route) {
        self.trees
            .entry(route.method.clone())
            .or_insert_with(SegmentTree::new)
            .insert(Arc::new(route));
    }

    /// Matches an inbound method/path/version against the registered routes.
    pub fn match_request(
        &self,
        method: &Method,
        path: &str,
        requested_version: u32,
    ) -> Option<(Arc<Route>, Vec<(String, String)>)> {
        self.trees.get(method)?.match_path(path, requested_version)
    }
}
