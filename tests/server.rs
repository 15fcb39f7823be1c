//! Boots the real `hyper` server on an ephemeral port and drives it with `reqwest`, exercising the
//! full stack including the `tokio::net::TcpListener` bind path `server::serve` wraps.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use hyper::Method;
use waypoint::listener::LoggingListener;
use waypoint::router::segment::ArgSource;
use waypoint::router::Router;
use waypoint::task::Task;
use waypoint::value::ArgType;

fn build_router() -> Router {
    let mut router = Router::new();
    router.route(Method::GET, "/ping").register(|_ctx| {
        Task::finished(Ok(serde_json::json!({ "pong": true })))
    });
    router
        .route(Method::GET, "/echo/{word}")
        .arg("word", ArgType::String, ArgSource::Path)
        .register(|ctx| {
            let word = ctx.arg("word").and_then(|v| v.as_str()).unwrap_or("").to_string();
            Task::finished(Ok(serde_json::json!({ "word": word })))
        });
    router
}

fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("read local addr")
}

#[tokio::test]
async fn serves_requests_over_a_real_socket() {
    let addr = free_addr();
    let router = build_router();
    let listener = Arc::new(LoggingListener);

    tokio::spawn(async move {
        waypoint::server::serve(addr, router, listener).await.ok();
    });

    // Give the listener a moment to bind before the first request.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/ping", addr))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["pong"], true);

    let resp = client
        .get(format!("http://{}/echo/hello", addr))
        .send()
        .await
        .expect("request should succeed");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["word"], "hello");

    let resp = client
        .get(format!("http://{}/missing", addr))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}
