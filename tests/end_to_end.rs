//! In-memory end-to-end coverage of routing, versioning, binding, plugins, and listener balance,
//! driven entirely through `dispatch::dispatch` against a `Router` — no socket involved.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hyper::Method;
use waypoint::binder;
use waypoint::dispatch::dispatch;
use waypoint::error::DispatchError;
use waypoint::handler::RouteContext;
use waypoint::listener::Listener;
use waypoint::plugin::Plugin;
use waypoint::router::segment::{Arg, ArgSource, Route, Visibility};
use waypoint::router::Router;
use waypoint::task::Task;
use waypoint::transport::TransportRequest;
use waypoint::value::{ArgType, ArgValue};

#[derive(Default)]
struct CountingListener {
    starts: AtomicUsize,
    succeeds: AtomicUsize,
    fails: AtomicUsize,
}

impl Listener for CountingListener {
    fn on_start(&self, _call_id: uuid::Uuid, _route: &Route) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_succeed(&self, _call_id: uuid::Uuid, _route: &Route) {
        self.succeeds.fetch_add(1, Ordering::SeqCst);
    }
    fn on_fail(&self, _call_id: uuid::Uuid, _route: &Route, _error: &DispatchError) {
        self.fails.fetch_add(1, Ordering::SeqCst);
    }
}

fn build_router() -> Router {
    let mut router = Router::new();

    // R1: simple literal GET, v1.
    router.route(Method::GET, "/status").register(|_ctx| {
        Task::finished(Ok(serde_json::json!({ "status": "ok" })))
    });

    // R2: versioned route: v0 (the legacy default, served when no version is requested) and v2
    // coexist, dispatch must prefer the highest version not exceeding the requested one.
    router
        .route(Method::GET, "/greeting")
        .version(0)
        .register(|_ctx| Task::finished(Ok(serde_json::json!({ "message": "hello" }))));
    router
        .route(Method::GET, "/greeting")
        .version(2)
        .register(|_ctx| Task::finished(Ok(serde_json::json!({ "message": "hi there" }))));

    // R3: path capture plus query argument.
    router
        .route(Method::GET, "/users/{id}")
        .arg("id", ArgType::Int32, ArgSource::Path)
        .optional_arg("verbose", ArgType::Bool, ArgSource::Query, "false")
        .register(|ctx| {
            let id = ctx.arg("id").and_then(|v| v.as_i64()).unwrap_or(-1);
            let verbose = ctx.arg("verbose").and_then(|v| v.as_bool()).unwrap_or(false);
            Task::finished(Ok(serde_json::json!({ "id": id, "verbose": verbose })))
        });

    // R4: JSON body field.
    router
        .route(Method::POST, "/users")
        .arg("name", ArgType::String, ArgSource::Body)
        .register(|ctx| {
            let name = ctx.arg("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
            Task::finished(Ok(serde_json::json!({ "created": name })))
        });

    // R5: a route a plugin will reject.
    router
        .route(Method::DELETE, "/users/{id}")
        .arg("id", ArgType::Int32, ArgSource::Path)
        .register(|_ctx| Task::finished(Ok(serde_json::json!({ "deleted": true }))));

    router
}

struct RejectDeletes;

impl Plugin for RejectDeletes {
    fn name(&self) -> &str {
        "reject-deletes"
    }

    fn modify_call(&self, ctx: &mut RouteContext) -> Task<Result<(), DispatchError>> {
        if ctx.route.method == Method::DELETE {
            Task::finished(Err(DispatchError::Unauthorized("deletes are disabled".into())))
        } else {
            Task::finished(Ok(()))
        }
    }
}

struct InjectAuthToken;

impl Plugin for InjectAuthToken {
    fn name(&self) -> &str {
        "inject-auth-token"
    }

    fn modify_route(&self, args: &mut Vec<Arg>) {
        args.push(Arg {
            name: "auth_token".to_string(),
            ty: ArgType::String,
            source: ArgSource::Query,
            visibility: Visibility::Internal,
            optional: true,
            default: None,
        });
    }

    fn modify_call(&self, ctx: &mut RouteContext) -> Task<Result<(), DispatchError>> {
        if let Some(slot) = ctx.arg_mut("auth_token") {
            *slot = ArgValue::String("service-internal-token".to_string());
        }
        Task::finished(Ok(()))
    }
}

#[tokio::test]
async fn request_1_literal_route_returns_200() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());
    let resp = dispatch(router, listener, TransportRequest::get("/status")).await.unwrap();
    assert_eq!(resp.status, hyper::StatusCode::OK);
}

#[tokio::test]
async fn request_2_version_negotiation_picks_best_match() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());

    let req = TransportRequest::get("/greeting").with_header(hyper::header::ACCEPT, "1");
    let resp = dispatch(router.clone(), listener.clone(), req).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["message"], "hello");

    let req = TransportRequest::get("/greeting").with_header(hyper::header::ACCEPT, "2");
    let resp = dispatch(router.clone(), listener.clone(), req).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["message"], "hi there");

    // No version header at all: requested version defaults to 0, which matches only the v=0
    // route — there is no "pick the newest" fallback.
    let resp = dispatch(router, listener, TransportRequest::get("/greeting")).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["message"], "hello");
}

#[tokio::test]
async fn request_3_path_and_query_args_bind_together() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());
    let req = TransportRequest::get("/users/12").with_query("verbose=true");
    let resp = dispatch(router, listener, req).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["id"], 12);
    assert_eq!(body["verbose"], true);
}

#[tokio::test]
async fn request_4_optional_query_arg_defaults_when_absent() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());
    let resp = dispatch(router, listener, TransportRequest::get("/users/3")).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["verbose"], false);
}

#[tokio::test]
async fn request_5_json_body_field_binds() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());
    let req = TransportRequest::get("/users")
        .with_method(Method::POST)
        .with_json_body(&serde_json::json!({ "name": "ana" }));
    let resp = dispatch(router, listener, req).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["created"], "ana");
}

#[tokio::test]
async fn request_6_missing_required_arg_is_bad_request() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());
    let req = TransportRequest::get("/users")
        .with_method(Method::POST)
        .with_json_body(&serde_json::json!({}));
    let resp = dispatch(router, listener, req).await.unwrap();
    assert_eq!(resp.status, hyper::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_7_unmatched_path_is_not_found() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());
    let resp = dispatch(router, listener, TransportRequest::get("/nope")).await.unwrap();
    assert_eq!(resp.status, hyper::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_8_plugin_rejects_call_before_handler_runs() {
    let mut router = build_router();
    router.plugin(Arc::new(RejectDeletes));
    let router = Arc::new(router);
    let listener = Arc::new(CountingListener::default());
    let req = TransportRequest::get("/users/9").with_method(Method::DELETE);
    let resp = dispatch(router, listener.clone(), req).await.unwrap();
    assert_eq!(resp.status, hyper::StatusCode::UNAUTHORIZED);
    assert_eq!(listener.starts.load(Ordering::SeqCst), 1);
    assert_eq!(listener.fails.load(Ordering::SeqCst), 1);
    assert_eq!(listener.succeeds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn request_9_plugin_injected_argument_is_filled_in_before_handler_runs() {
    let mut router = Router::new();
    router.plugin(Arc::new(InjectAuthToken));
    router
        .route(Method::GET, "/secure")
        .register(|ctx| {
            let token = ctx.arg("auth_token").and_then(|v| v.as_str()).unwrap_or("").to_string();
            Task::finished(Ok(serde_json::json!({ "token": token })))
        });
    let router = Arc::new(router);
    let listener = Arc::new(CountingListener::default());
    let resp = dispatch(router, listener, TransportRequest::get("/secure")).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["token"], "service-internal-token");
}

#[tokio::test]
async fn request_10_path_capture_decodes_percent_encoding_without_resplitting() {
    let mut router = Router::new();
    router
        .route(Method::GET, "/files/{name}")
        .arg("name", ArgType::String, ArgSource::Path)
        .register(|ctx| {
            let name = ctx.arg("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
            Task::finished(Ok(serde_json::json!({ "name": name })))
        });
    let router = Arc::new(router);
    let listener = Arc::new(CountingListener::default());
    // `a%2Fb` must match as a single `{name}` capture and decode to `a/b`, not split into two
    // path segments before the tree ever sees it.
    let resp = dispatch(router, listener, TransportRequest::get("/files/a%2Fb")).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["name"], "a/b");
}

#[tokio::test]
async fn listener_fires_exactly_once_per_call_on_success_and_failure() {
    let router = Arc::new(build_router());
    let listener = Arc::new(CountingListener::default());

    dispatch(router.clone(), listener.clone(), TransportRequest::get("/status"))
        .await
        .unwrap();
    dispatch(
        router.clone(),
        listener.clone(),
        TransportRequest::get("/users")
            .with_method(Method::POST)
            .with_json_body(&serde_json::json!({})),
    )
    .await
    .unwrap();

    assert_eq!(listener.starts.load(Ordering::SeqCst), 2);
    assert_eq!(listener.succeeds.load(Ordering::SeqCst), 1);
    assert_eq!(listener.fails.load(Ordering::SeqCst), 1);
}

#[test]
fn check_args_agrees_with_bind_args_on_completeness() {
    let route = Route {
        method: Method::GET,
        version: 1,
        segments: vec![],
        args: vec![Arg {
            name: "id".to_string(),
            ty: ArgType::Int32,
            source: ArgSource::Query,
            visibility: Visibility::Public,
            optional: false,
            default: None,
        }],
        handler: waypoint::handler::boxed(|_ctx| Task::finished(Ok(serde_json::json!({})))),
        body_arg_index: None,
    };

    assert!(binder::check_args(&route, &[], "", false).is_err());
    assert!(binder::bind_args(&route, &[], "", &[], None).is_err());

    assert!(binder::check_args(&route, &[], "id=1", false).is_ok());
    assert!(binder::bind_args(&route, &[], "id=1", &[], None).is_ok());
}

#[tokio::test]
async fn task_map_then_catch_compose_through_dispatch_like_chains() {
    let base = Task::finished(5i32);
    let doubled = base.map(|v| v * 2);
    let chained = doubled.then(|v| Task::finished(v + 1));
    assert_eq!(chained.await.unwrap(), 11);

    let failed: Task<i32> = Task::failed(DispatchError::NotFound("missing".into()));
    let recovered = failed.catch(|_e| -1);
    assert_eq!(recovered.await.unwrap(), -1);
}

#[test]
fn per_call_listener_runs_only_the_hooks_that_were_set() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    let listener = waypoint::listener::PerCallListener::new().with_on_start(move |_id, route| {
        seen2.lock().unwrap().push(route.path_template());
    });
    let route = Route {
        method: Method::GET,
        version: 1,
        segments: vec![],
        args: vec![],
        handler: waypoint::handler::boxed(|_ctx| Task::finished(Ok(serde_json::json!({})))),
        body_arg_index: None,
    };
    listener.on_start(uuid::Uuid::new_v4(), &route);
    listener.on_succeed(uuid::Uuid::new_v4(), &route);
    assert_eq!(seen.lock().unwrap().len(), 1);
}
