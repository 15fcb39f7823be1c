//! `hyper`/`tokio` bootstrap: turns a `Router` into a bound TCP listener serving requests through
//! [`dispatch::dispatch`].
//!
//! Modelled on the old `start`/`start_with_num_threads`/`init_server` split, updated from a
//! `tokio::runtime::Runtime` + `hyper::server::conn::Http` pairing to the single `hyper::Server`
//! entry point tokio 1.x exposes directly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};

use crate::dispatch::dispatch;
use crate::listener::{Listener, LoggingListener};
use crate::router::Router;
use crate::transport::TransportRequest;

/// Bind address and worker thread count for [`run_with_config`]. Deserializable so a caller can
/// load it from a config file or environment rather than constructing it in code.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `0` defers to `num_cpus::get()`, matching the old crate's no-argument `start()`.
    pub worker_threads: usize,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        ServerConfig {
            bind_addr,
            worker_threads: 0,
        }
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }
}

/// Binds `addr` and serves `router` using `num_cpus::get()` worker threads and a logging-only
/// listener, blocking until the process is asked to shut down.
pub fn run(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    run_with_config(ServerConfig::new(addr), router, Arc::new(LoggingListener))
}

/// Binds and serves `router` per `config`, notifying `listener` on every call.
pub fn run_with_config(config: ServerConfig, router: Router, listener: Arc<dyn Listener>) -> std::io::Result<()> {
    let worker_threads = config.resolved_worker_threads();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;
    runtime.block_on(serve(config.bind_addr, router, listener))
}

/// The async core of [`run_with_config`], split out so tests can drive it on an already-running
/// runtime with an ephemeral port.
pub async fn serve(addr: SocketAddr, router: Router, listener: Arc<dyn Listener>) -> std::io::Result<()> {
    let router = Arc::new(router);
    let make_svc = make_service_fn(move |_conn| {
        let router = router.clone();
        let listener = listener.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let router = router.clone();
                let listener = listener.clone();
                async move {
                    let transport_req = to_transport_request(req).await;
                    // `dispatch` turns every failure into a response internally and only ever
                    // completes its Task via `finish`; the `Result` here is a vestige of sharing
                    // `Task<T>`'s Future impl, not a real error path.
                    let resp = match dispatch(router, listener, transport_req).await {
                        Ok(resp) => resp,
                        Err(e) => crate::transport::TransportResponse {
                            status: e.status(),
                            headers: hyper::HeaderMap::new(),
                            body: e.client_message().into_bytes(),
                        },
                    };
                    Ok::<_, Infallible>(to_hyper_response(resp))
                }
            }))
        }
    });

    log::info!("binding on {}", addr);
    let server = Server::bind(&addr).serve(make_svc);
    server.await.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

async fn to_transport_request(req: Request<Body>) -> TransportRequest {
    let (parts, body) = req.into_parts();
    let query = parts.uri.query().unwrap_or("").to_string();
    // Left percent-encoded: the router matches on raw segments, and only the binder decodes an
    // individual path capture once it knows that segment is bound to a single argument.
    let path = parts.uri.path().to_string();
    let body = hyper::body::to_bytes(body).await.map(|b| b.to_vec()).unwrap_or_default();
    TransportRequest {
        method: parts.method,
        path,
        query,
        headers: parts.headers,
        body,
    }
}

fn to_hyper_response(resp: crate::transport::TransportResponse) -> Response<Body> {
    let mut builder = Response::builder().status(resp.status);
    if let Some(headers) = builder.headers_mut() {
        *headers = resp.headers;
    }
    builder
        .body(Body::from(resp.body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
