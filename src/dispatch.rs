//! The dispatch controller: turns a `TransportRequest` into a `TransportResponse` by running
//! version negotiation, routing, argument binding, plugin authorization, and the handler itself,
//! notifying a `Listener` at each stage.

use std::sync::Arc;

use hyper::{Body, HeaderMap};

use crate::binder;
use crate::error::DispatchError;
use crate::handler::RouteContext;
use crate::listener::Listener;
use crate::router::Router;
use crate::task::Task;
use crate::transport::{TransportRequest, TransportResponse};

/// Negotiates the requested API version from, in order of precedence, the `Accept` header (its
/// value must parse as a non-negative integer, same rule as `API-VERSION`), the `API-VERSION`
/// header, or `0` if neither is present or parses.
pub fn negotiate_version(headers: &HeaderMap) -> u32 {
    if let Some(v) = headers
        .get(hyper::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
    {
        return v;
    }
    if let Some(v) = headers
        .get("API-VERSION")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok())
    {
        return v;
    }
    0
}

/// Dispatches `request` against `router`, notifying `listener` at each lifecycle stage. Exactly
/// one of `on_succeed`/`on_fail` fires for every request that makes it past routing, even when
/// the failure happens before the handler ever runs.
pub fn dispatch(router: Arc<Router>, listener: Arc<dyn Listener>, request: TransportRequest) -> Task<TransportResponse> {
    let version = negotiate_version(&request.headers);
    let matched = router.match_request(&request.method, &request.path, version);

    let (route, path_captures) = match matched {
        Some(found) => found,
        None => {
            let error = DispatchError::NotFound(format!("no route for {} {}", request.method, request.path));
            return Task::finished(response_for_error(&error));
        }
    };

    let call_id = uuid::Uuid::new_v4();
    listener.on_start(call_id, &route);

    let content_type = request
        .headers
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let args = match binder::bind_args(&route, &path_captures, &request.query, &request.body, content_type) {
        Ok(args) => args,
        Err(e) => {
            listener.on_fail(call_id, &route, &e);
            return Task::finished(response_for_error(&e));
        }
    };

    let mut ctx = RouteContext {
        call_id,
        route: route.clone(),
        args,
        request_headers: request.headers,
        response_headers: HeaderMap::new(),
    };

    let (out, completer) = Task::pending();
    let route_for_task = route.clone();
    let listener_for_task = listener.clone();

    tokio::spawn(async move {
        match router.plugins().apply_modify_call(&mut ctx).await {
            Ok(()) => {
                let handler_task = route_for_task.handler.handle(ctx);
                match handler_task.await {
                    Ok(resp) => {
                        listener_for_task.on_succeed(call_id, &route_for_task);
                        completer.finish(to_transport_response(resp));
                    }
                    Err(err) => {
                        listener_for_task.on_fail(call_id, &route_for_task, &err);
                        completer.finish(response_for_error(&err));
                    }
                }
            }
            Err(err) => {
                listener_for_task.on_fail(call_id, &route_for_task, &err);
                completer.finish(response_for_error(&err));
            }
        }
    });

    out
}

fn response_for_error(error: &DispatchError) -> TransportResponse {
    let resp = error_to_hyper(error);
    to_transport_response(resp)
}

fn error_to_hyper(error: &DispatchError) -> hyper::Response<Body> {
    let status = error.status();
    let body = error.client_message();
    hyper::Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(serde_json::json!({ "error": body }).to_string()))
        .unwrap_or_else(|_| hyper::Response::new(Body::empty()))
}

fn to_transport_response(resp: hyper::Response<Body>) -> TransportResponse {
    let (parts, body) = resp.into_parts();
    // Bodies produced inside this crate (JSON/String/error responses) are always fully-buffered
    // `Body::from(Vec<u8>|String)`, never a streamed body, so this never actually awaits I/O.
    let bytes = futures_util::executor::block_on(hyper::body::to_bytes(body)).unwrap_or_default();
    TransportResponse {
        status: parts.status,
        headers: parts.headers,
        body: bytes.to_vec(),
    }
}
