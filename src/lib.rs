//! A request routing and dispatch core for a lightweight RPC/HTTP framework.
//!
//! Requests are matched against per-method segment trees ([`router`]), arguments are bound from
//! the query string, path captures, or request body ([`binder`]), plugins get a say at
//! registration and call time ([`plugin`]), and a handler's eventual result is carried by a
//! [`task::Task`] until the [`dispatch`] controller turns it into a response.

pub mod binder;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod listener;
pub mod plugin;
pub mod router;
pub mod server;
pub mod task;
pub mod transport;
pub mod value;

pub use error::{DispatchError, Result};
pub use router::Router;
pub use server::{run, run_with_config, ServerConfig};
pub use task::Task;
