// SPDX-License-Identifier: LGPL-3.0-only
//! An executor for running tasks in the background.
use crate::config::TasksConfig;
use arc_swap::ArcSwap;
use runner::TaskRunner;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use tokio::runtime::Handle;

/// An abstraction over a task runner.
pub mod runner;

/// Periodic timers bound to a [Lifetime](timer::Lifetime).
pub mod timer;

static RUNNER: LazyLock<ArcSwap<TaskRunner>> =
    LazyLock::new(|| ArcSwap::new(Arc::new(TaskRunner::None)));

/// Initializes the task runner.
pub fn init(config: TasksConfig) {
    let runner = TaskRunner::Tokio(runner::tokio_runner::TokioRunner::new(config));
    RUNNER.store(Arc::new(runner));
}

/// Spawns the given future (fire-and-forget).
pub fn spawn<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let runner = RUNNER.load().clone();
    runner.spawn_detached(fut);
}

/// Blocks on the given future.
pub fn block_on<F>(fut: F) -> F::Output
where
    F: Future,
{
    RUNNER.load().block_on(fut)
}

/// Returns a handle to drive timers on.
///
/// Prefers the runtime the caller is already inside of, then the initialized task runner.
pub fn handle() -> Option<Handle> {
    Handle::try_current()
        .ok()
        .or_else(|| RUNNER.load().handle())
}

/// Shuts down the task runner gracefully.
/// This should be called during application shutdown to prevent hanging.
pub fn shutdown() {
    log::debug!("Shutting down task runner...");

    let current_runner = RUNNER.swap(Arc::new(TaskRunner::None));

    match Arc::try_unwrap(current_runner) {
        Ok(runner) => runner.shutdown(),
        Err(_) => {
            log::warn!("Could not shutdown task runner - still has active references");
        },
    }
}
