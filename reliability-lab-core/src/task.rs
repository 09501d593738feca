//! Task spawning abstraction for single-threaded environments.

use std::future::Future;

/// Provider for spawning local tasks on the current thread.
///
/// Everything in the lab runs on one thread with cooperative suspension, so
/// spawned futures need not be `Send`. Callers must be inside a
/// [`tokio::task::LocalSet`].
pub trait TaskProvider: Clone {
    /// Spawn a named task that runs on the current thread.
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static;
}

/// Tokio-based task provider using `spawn_local`.
#[derive(Clone, Debug, Default)]
pub struct TokioTaskProvider;

impl TaskProvider for TokioTaskProvider {
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static,
    {
        let task_name = name.to_string();
        tokio::task::spawn_local(async move {
            tracing::trace!(task = %task_name, "task starting");
            future.await;
            tracing::trace!(task = %task_name, "task completed");
        })
    }
}
