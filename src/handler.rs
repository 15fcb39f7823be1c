//! The handler contract: what a registered route actually runs, and how its result becomes a
//! response.
//!
//! Modelled on the old `Handler`/`NewHandler`/`IntoResponse` split, updated from a futures-0.1
//! `HandlerFuture` to a `Task<Response<Body>>` so handlers can resume on whatever thread finishes
//! their underlying work.

use std::fmt;
use std::sync::Arc;

use hyper::{Body, HeaderMap, Response};

use crate::error::DispatchError;
use crate::router::segment::Route;
use crate::task::Task;
use crate::value::ArgValue;

/// Everything a handler needs about the call it is serving: the bound, typed arguments, the
/// matched route, a unique call id for logging/correlation, and the inbound/outbound headers.
#[derive(Clone)]
pub struct RouteContext {
    pub call_id: uuid::Uuid,
    pub route: Arc<Route>,
    pub args: Vec<ArgValue>,
    pub request_headers: HeaderMap,
    /// Headers the handler may add to before the response is built; starts empty.
    pub response_headers: HeaderMap,
}

impl RouteContext {
    /// Looks up a bound argument by the name it was declared with on the route.
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.route
            .args
            .iter()
            .position(|a| a.name == name)
            .and_then(|i| self.args.get(i))
    }

    /// Mutable access to a bound argument slot by name, for a plugin's `modify_call` to write an
    /// internal (non-wire) value into before the handler runs.
    pub fn arg_mut(&mut self, name: &str) -> Option<&mut ArgValue> {
        let index = self.route.args.iter().position(|a| a.name == name)?;
        self.args.get_mut(index)
    }
}

impl fmt::Debug for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteContext")
            .field("call_id", &self.call_id)
            .field("route", &self.route.path_template())
            .finish()
    }
}

/// A value a handler can return, turned into the final HTTP body and content type. Takes only the
/// outbound headers rather than the whole `RouteContext`, so a handler can move its `ctx` into an
/// async block and still return something renderable.
pub trait IntoResponse {
    fn into_response(self, response_headers: &HeaderMap) -> Response<Body>;
}

impl IntoResponse for Response<Body> {
    fn into_response(self, _response_headers: &HeaderMap) -> Response<Body> {
        self
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self, response_headers: &HeaderMap) -> Response<Body> {
        let body = serde_json::to_vec(&self).unwrap_or_else(|_| b"null".to_vec());
        with_headers(Body::from(body), response_headers, mime::APPLICATION_JSON)
    }
}

impl IntoResponse for String {
    fn into_response(self, response_headers: &HeaderMap) -> Response<Body> {
        with_headers(Body::from(self), response_headers, mime::TEXT_PLAIN_UTF_8)
    }
}

fn with_headers(body: Body, response_headers: &HeaderMap, default_content_type: mime::Mime) -> Response<Body> {
    let mut resp = Response::new(body);
    *resp.headers_mut() = response_headers.clone();
    if !resp.headers().contains_key(hyper::header::CONTENT_TYPE) {
        if let Ok(value) = hyper::header::HeaderValue::from_str(default_content_type.as_ref()) {
            resp.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
        }
    }
    resp
}

/// A registered route's executable body: given a bound call, produce a `Task` of its eventual
/// response. Implemented for any closure with this signature, matching the old handler crate's
/// blanket `impl<F> Handler for F` idiom.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: RouteContext) -> Task<Response<Body>>;
}

impl<F> Handler for F
where
    F: Fn(RouteContext) -> Task<Response<Body>> + Send + Sync,
{
    fn handle(&self, ctx: RouteContext) -> Task<Response<Body>> {
        self(ctx)
    }
}

/// The type-erased form stored on a `Route`, so routes built from different handler closures can
/// live in the same tree.
pub type BoxedHandler = dyn Handler;

/// Wraps a typed handler function returning any `IntoResponse` (or a `DispatchError`) into a
/// `BoxedHandler`. The response headers accumulated on `ctx` (e.g. by a plugin's `modify_call`)
/// are captured before `f` runs and applied to whatever `f` eventually produces.
pub fn boxed<T, F>(f: F) -> Arc<BoxedHandler>
where
    T: IntoResponse + Send + 'static,
    F: Fn(RouteContext) -> Task<Result<T, DispatchError>> + Send + Sync + 'static,
{
    struct Wrapped<T, F>(F, std::marker::PhantomData<fn() -> T>);
    impl<T, F> Handler for Wrapped<T, F>
    where
        T: IntoResponse + Send + 'static,
        F: Fn(RouteContext) -> Task<Result<T, DispatchError>> + Send + Sync + 'static,
    {
        fn handle(&self, ctx: RouteContext) -> Task<Response<Body>> {
            let response_headers = ctx.response_headers.clone();
            let inner = (self.0)(ctx);
            let (out, completer) = Task::pending();
            tokio::spawn(async move {
                match inner.await {
                    Ok(Ok(value)) => completer.finish(value.into_response(&response_headers)),
                    Ok(Err(err)) => completer.fail(err),
                    Err(err) => completer.fail(err),
                }
            });
            out
        }
    }
    Arc::new(Wrapped(f, std::marker::PhantomData))
}
