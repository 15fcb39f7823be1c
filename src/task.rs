//! `Task<T>`: a single-shot deferred result with `map`/`then`/`catch`/`always` combinators.
//!
//! The source this is modelled after represented a handler's eventual outcome as a mutable object
//! with exactly one terminal-handler slot, fired synchronously the moment `finish`/`fail` is
//! called (even if that happens before a handler was ever installed, in which case the cached
//! outcome fires immediately on installation instead). We keep that contract, but store it behind
//! a `Mutex` rather than assuming single-threaded confinement, since a handler may be resumed on a
//! different worker thread than the one which started it.
//!
//! Installing a terminal handler on an already-resolved task must be able to fire any number of
//! times with the same cached outcome, so `on_complete`/`on_finish`/`on_fail` and the combinators
//! built on them require `T: Clone` — the cached value is never removed from the slot, only
//! cloned out to each handler that asks for it. Code that needs to move a non-`Clone` outcome
//! exactly once (a streamed `hyper::Body`, for instance) should drive the `Task` through its
//! `Future` impl instead, which hands out ownership on its single resolution.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::error::DispatchError;

enum Slot<T> {
    Waiting,
    Finished(T),
    Error(DispatchError),
}

enum Handler<T> {
    None,
    Terminal(Box<dyn FnOnce(Option<T>, Option<&DispatchError>) + Send>),
    Waker(Waker),
}

struct Inner<T> {
    slot: Slot<T>,
    handler: Handler<T>,
}

/// A single-shot deferred result. Cloning a `Task` shares the same underlying state; only one
/// caller should drive it to completion with `finish`/`fail`.
pub struct Task<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Task {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock().unwrap();
        let state = match guard.slot {
            Slot::Waiting => "Waiting",
            Slot::Finished(_) => "Finished",
            Slot::Error(_) => "Error",
        };
        f.debug_struct("Task").field("state", &state).finish()
    }
}

impl<T: Send + 'static> Task<T> {
    /// A task still waiting for its outcome.
    pub fn pending() -> (Task<T>, TaskCompleter<T>) {
        let task = Task {
            inner: Arc::new(Mutex::new(Inner {
                slot: Slot::Waiting,
                handler: Handler::None,
            })),
        };
        let completer = TaskCompleter {
            inner: task.inner.clone(),
        };
        (task, completer)
    }

    /// A task that is already `Finished` with `value`.
    pub fn finished(value: T) -> Task<T> {
        Task {
            inner: Arc::new(Mutex::new(Inner {
                slot: Slot::Finished(value),
                handler: Handler::None,
            })),
        }
    }

    /// A task that is already in the `Error` state.
    pub fn failed(error: DispatchError) -> Task<T> {
        Task {
            inner: Arc::new(Mutex::new(Inner {
                slot: Slot::Error(error),
                handler: Handler::None,
            })),
        }
    }

    /// Installs a terminal handler. If the task is already terminal, `f` fires synchronously
    /// before this call returns, with the cached outcome, and the task remains terminal with that
    /// same outcome afterward — installing another handler later fires again with the same value.
    /// Replaces any previously-installed handler when the task is still waiting (there is exactly
    /// one terminal-handler slot).
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(Option<T>, Option<&DispatchError>) + Send + 'static,
        T: Clone,
    {
        let mut guard = self.inner.lock().unwrap();
        match &guard.slot {
            Slot::Waiting => {
                guard.handler = Handler::Terminal(Box::new(f));
            }
            Slot::Finished(v) => {
                let v = v.clone();
                drop(guard);
                f(Some(v), None);
            }
            Slot::Error(e) => {
                let e = e.fork();
                drop(guard);
                f(None, Some(&e));
            }
        }
    }

    /// Installs a handler that only runs on success.
    pub fn on_finish<F>(&self, f: F)
    where
        F: FnOnce(T) + Send + 'static,
        T: Clone,
    {
        self.on_complete(move |v, _e| {
            if let Some(v) = v {
                f(v);
            }
        });
    }

    /// Installs a handler that only runs on failure.
    pub fn on_fail<F>(&self, f: F)
    where
        F: FnOnce(&DispatchError) + Send + 'static,
        T: Clone,
    {
        self.on_complete(move |_v, e| {
            if let Some(e) = e {
                f(e);
            }
        });
    }

    /// Maps a successful outcome through `f`, forwarding failures unchanged. A panic unwind is not
    /// caught (Rust has no general exception model); `f` should return `Result` internally and
    /// use `?` if it can fail, composing with `then` instead.
    pub fn map<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
        T: Clone,
    {
        let (out, completer) = Task::pending();
        self.on_complete(move |v, e| match (v, e) {
            (Some(v), _) => completer.finish(f(v)),
            (None, Some(e)) => completer.fail(e.fork()),
            (None, None) => unreachable!("terminal outcome always carries value or error"),
        });
        out
    }

    /// Maps both legs to `U`: `succeed` on success, `fail` on failure.
    pub fn map_both<U, S, E>(&self, succeed: S, fail: E) -> Task<U>
    where
        U: Send + 'static,
        S: FnOnce(T) -> U + Send + 'static,
        E: FnOnce(&DispatchError) -> U + Send + 'static,
        T: Clone,
    {
        let (out, completer) = Task::pending();
        self.on_complete(move |v, e| match (v, e) {
            (Some(v), _) => completer.finish(succeed(v)),
            (None, Some(e)) => completer.finish(fail(e)),
            (None, None) => unreachable!(),
        });
        out
    }

    /// Chains an asynchronous continuation: on success, `f(v)` produces the next `Task<U>` whose
    /// outcome propagates verbatim; failures are forwarded without calling `f`.
    pub fn then<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Task<U> + Send + 'static,
        T: Clone,
    {
        let (out, completer) = Task::pending();
        self.on_complete(move |v, e| match (v, e) {
            (Some(v), _) => {
                let inner = f(v);
                inner.on_complete(move |v2, e2| match (v2, e2) {
                    (Some(v2), _) => completer.finish(v2),
                    (None, Some(e2)) => completer.fail(e2.fork()),
                    (None, None) => unreachable!(),
                });
            }
            (None, Some(e)) => completer.fail(e.fork()),
            (None, None) => unreachable!(),
        });
        out
    }

    /// Chains both legs to `Task<U>`-producing continuations.
    pub fn then_both<U, S, E>(&self, succeed: S, fail: E) -> Task<U>
    where
        U: Send + 'static,
        S: FnOnce(T) -> Task<U> + Send + 'static,
        E: FnOnce(&DispatchError) -> Task<U> + Send + 'static,
        T: Clone,
    {
        let (out, completer) = Task::pending();
        self.on_complete(move |v, e| {
            let inner = match (v, e) {
                (Some(v), _) => succeed(v),
                (None, Some(e)) => fail(e),
                (None, None) => unreachable!(),
            };
            inner.on_complete(move |v2, e2| match (v2, e2) {
                (Some(v2), _) => completer.finish(v2),
                (None, Some(e2)) => completer.fail(e2.fork()),
                (None, None) => unreachable!(),
            });
        });
        out
    }

    /// Recovers from a failure, converting it to a successful `T`. Equivalent to
    /// `map_both(id, f)`.
    pub fn catch<F>(&self, f: F) -> Task<T>
    where
        T: Clone,
        F: FnOnce(&DispatchError) -> T + Send + 'static,
    {
        self.map_both(|v| v, f)
    }

    /// Runs `side_effect` with the outcome, then forwards the original outcome unchanged. If
    /// `side_effect` panics the panic propagates (there is no secondary error channel to redirect
    /// it to); callers that can fail should use `Result` inside `side_effect` and log.
    pub fn always<F>(&self, side_effect: F) -> Task<T>
    where
        T: Clone,
        F: FnOnce(Option<&T>, Option<&DispatchError>) + Send + 'static,
    {
        let (out, completer) = Task::pending();
        self.on_complete(move |v, e| {
            side_effect(v.as_ref(), e);
            match (v, e) {
                (Some(v), _) => completer.finish(v),
                (None, Some(e)) => completer.fail(e.fork()),
                (None, None) => unreachable!(),
            }
        });
        out
    }
}

/// The write side of a `Task`, returned by [`Task::pending`]. Kept separate from `Task` so that a
/// handler cannot accidentally call `finish`/`fail` on a `Task` it only received to read.
pub struct TaskCompleter<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T: Send + 'static> TaskCompleter<T> {
    /// Transitions the task to `Finished`, firing any installed handler or waker immediately.
    /// Calling this more than once, or after `fail`, is a programmer error and panics.
    pub fn finish(self, value: T) {
        let mut guard = self.inner.lock().unwrap();
        match guard.slot {
            Slot::Waiting => {}
            _ => panic!("Task::finish/fail called on a task that is already terminal"),
        }
        match std::mem::replace(&mut guard.handler, Handler::None) {
            Handler::None => guard.slot = Slot::Finished(value),
            Handler::Terminal(h) => {
                drop(guard);
                h(Some(value), None);
            }
            Handler::Waker(w) => {
                guard.slot = Slot::Finished(value);
                drop(guard);
                w.wake();
            }
        }
    }

    /// Transitions the task to `Error`, firing any installed handler or waker immediately.
    pub fn fail(self, error: DispatchError) {
        let mut guard = self.inner.lock().unwrap();
        match guard.slot {
            Slot::Waiting => {}
            _ => panic!("Task::finish/fail called on a task that is already terminal"),
        }
        match std::mem::replace(&mut guard.handler, Handler::None) {
            Handler::None => guard.slot = Slot::Error(error),
            Handler::Terminal(h) => {
                drop(guard);
                h(None, Some(&error));
            }
            Handler::Waker(w) => {
                guard.slot = Slot::Error(error);
                drop(guard);
                w.wake();
            }
        }
    }
}


impl<T: Send + 'static> Future for Task<T> {
    type Output = Result<T, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.inner.lock().unwrap();
        match std::mem::replace(&mut guard.slot, Slot::Waiting) {
            Slot::Finished(v) => Poll::Ready(Ok(v)),
            Slot::Error(e) => Poll::Ready(Err(e)),
            Slot::Waiting => {
                guard.handler = Handler::Waker(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
