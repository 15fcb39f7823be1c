//! Plugins: registration-time route augmentation and call-time authorization.
//!
//! Plugins run in the order they were registered on the `PluginRegistry`, both when
//! `modify_route` rewrites a route at build time and when `modify_call` is consulted on the hot
//! path for every request.

use crate::handler::RouteContext;
use crate::router::segment::{Arg, Route};
use crate::task::Task;

/// A registration-time and call-time hook.
pub trait Plugin: Send + Sync {
    /// A human-readable name, used to look the plugin up by index in the `PluginRegistry` and in
    /// diagnostics.
    fn name(&self) -> &str;

    /// Called once per route at registration time. Implementations that need extra data on every
    /// call (e.g. an auth token) append an `Arg` with `Visibility::Internal` here; the binder
    /// leaves that slot unbound from the wire, and `modify_call` writes its value via
    /// `ctx.arg_mut` before the handler runs.
    fn modify_route(&self, _args: &mut Vec<Arg>) {}

    /// Called on every request for routes this plugin applies to, after arguments are bound and
    /// before the handler runs. Takes `ctx` mutably so a plugin can populate an internal argument
    /// it declared in `modify_route`. Returning an `Err` short-circuits the call: the handler
    /// never runs, and the listener's `on_fail` fires with that error.
    fn modify_call(&self, ctx: &mut RouteContext) -> Task<Result<(), crate::error::DispatchError>> {
        let _ = ctx;
        Task::finished(Ok(()))
    }
}

/// Registration-order index of plugins applied to a route.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<std::sync::Arc<dyn Plugin>>,
    by_name: std::collections::HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, returning its registration-order index.
    pub fn register(&mut self, plugin: std::sync::Arc<dyn Plugin>) -> usize {
        let index = self.plugins.len();
        self.by_name.insert(plugin.name().to_string(), index);
        self.plugins.push(plugin);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// All registered plugins, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &std::sync::Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    /// Runs every plugin's `modify_route` over `route`'s argument list, in registration order.
    pub fn apply_modify_route(&self, route: &mut Route) {
        for plugin in &self.plugins {
            plugin.modify_route(&mut route.args);
        }
    }

    /// Runs every plugin's `modify_call` in registration order against the same `ctx`,
    /// short-circuiting on the first failure. Mutations a plugin makes (e.g. filling in an
    /// internal argument) are visible to every later plugin and to the handler.
    pub async fn apply_modify_call(&self, ctx: &mut RouteContext) -> Result<(), crate::error::DispatchError> {
        for plugin in &self.plugins {
            plugin.modify_call(ctx).await?;
        }
        Ok(())
    }
}
