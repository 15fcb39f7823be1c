//! Call lifecycle notifications.
//!
//! The source this is modelled after allowed registering an anonymous listener object per
//! dispatcher with three lifecycle callbacks. We keep the three-callback shape but name the
//! concrete type `PerCallListener` rather than leaving it anonymous, since Rust has no ad-hoc
//! object-literal syntax to match it against.

use std::sync::Arc;

use crate::error::DispatchError;
use crate::router::segment::Route;

/// Observes a single call's lifecycle. The dispatch controller guarantees exactly one of
/// `on_succeed`/`on_fail` fires for every call that reaches `on_start`, even if the call never
/// reaches its handler (e.g. binding failed).
pub trait Listener: Send + Sync {
    /// Fired once routing has resolved a route and binding is about to begin.
    fn on_start(&self, _call_id: uuid::Uuid, _route: &Route) {}
    /// Fired once the handler's response has been produced successfully.
    fn on_succeed(&self, _call_id: uuid::Uuid, _route: &Route) {}
    /// Fired when any stage of the call (binding, plugin authorization, or the handler itself)
    /// ends in an error.
    fn on_fail(&self, _call_id: uuid::Uuid, _route: &Route, _error: &DispatchError) {}
}

/// A `Listener` built from up to three independent closures, for callers who want lifecycle hooks
/// without defining a named type.
#[derive(Default, Clone)]
pub struct PerCallListener {
    on_start: Option<Arc<dyn Fn(uuid::Uuid, &Route) + Send + Sync>>,
    on_succeed: Option<Arc<dyn Fn(uuid::Uuid, &Route) + Send + Sync>>,
    on_fail: Option<Arc<dyn Fn(uuid::Uuid, &Route, &DispatchError) + Send + Sync>>,
}

impl PerCallListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_start(mut self, f: impl Fn(uuid::Uuid, &Route) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(f));
        self
    }

    pub fn with_on_succeed(mut self, f: impl Fn(uuid::Uuid, &Route) + Send + Sync + 'static) -> Self {
        self.on_succeed = Some(Arc::new(f));
        self
    }

    pub fn with_on_fail(mut self, f: impl Fn(uuid::Uuid, &Route, &DispatchError) + Send + Sync + 'static) -> Self {
        self.on_fail = Some(Arc::new(f));
        self
    }
}

impl Listener for PerCallListener {
    fn on_start(&self, call_id: uuid::Uuid, route: &Route) {
        if let Some(f) = &self.on_start {
            f(call_id, route);
        }
    }

    fn on_succeed(&self, call_id: uuid::Uuid, route: &Route) {
        if let Some(f) = &self.on_succeed {
            f(call_id, route);
        }
    }

    fn on_fail(&self, call_id: uuid::Uuid, route: &Route, error: &DispatchError) {
        if let Some(f) = &self.on_fail {
            f(call_id, route, error);
        }
    }
}

/// The default listener: logs each lifecycle event at `debug`/`warn` level and does nothing else.
#[derive(Default)]
pub struct LoggingListener;

impl Listener for LoggingListener {
    fn on_start(&self, call_id: uuid::Uuid, route: &Route) {
        log::debug!("call {} started: {} {}", call_id, route.method, route.path_template());
    }

    fn on_succeed(&self, call_id: uuid::Uuid, route: &Route) {
        log::debug!("call {} succeeded: {} {}", call_id, route.method, route.path_template());
    }

    fn on_fail(&self, call_id: uuid::Uuid, route: &Route, error: &DispatchError) {
        log::warn!(
            "call {} failed: {} {} -> {}",
            call_id,
            route.method,
            route.path_template(),
            error
        );
    }
}
