//! Execution contexts bound to constructed services.
//!
//! Every service handed out by the registry carries a [`Worker`]: the place
//! where the service runs its deferred work. The hosting application decides
//! what a worker is; the registry only binds the one it was configured with.

use std::fmt;
use tokio::runtime::Handle;
use tracing::trace;

/// A unit of deferred work posted to a worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Execution context supplied by the hosting environment.
pub trait Worker: Send + Sync {
    /// Human readable worker name (used in logs).
    fn name(&self) -> &str;

    /// Schedules `task` for execution on this worker.
    fn post(&self, task: Task);
}

impl fmt::Debug for dyn Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker").field("name", &self.name()).finish()
    }
}

/// Runs every task immediately on the posting thread.
#[derive(Debug, Clone)]
pub struct InlineWorker {
    name: String,
}

impl InlineWorker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for InlineWorker {
    fn default() -> Self {
        Self::new("inline")
    }
}

impl Worker for InlineWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, task: Task) {
        task();
    }
}

/// Posts tasks onto a Tokio runtime's blocking pool.
///
/// # Rust Learning Note
///
/// A `tokio::runtime::Handle` is a cheap, cloneable reference to a running
/// runtime. Holding one lets synchronous code hand work to the runtime
/// without being inside an async context itself.
#[derive(Debug, Clone)]
pub struct TokioWorker {
    name: String,
    handle: Handle,
}

impl TokioWorker {
    pub fn new(name: impl Into<String>, handle: Handle) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    /// Creates a worker for the runtime the caller is currently running on.
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn current(name: impl Into<String>) -> Self {
        Self::new(name, Handle::current())
    }
}

impl Worker for TokioWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, task: Task) {
        trace!("[Worker] {} posting task", self.name);
        // Detached: the join handle is intentionally dropped.
        drop(self.handle.spawn_blocking(task));
    }
}
