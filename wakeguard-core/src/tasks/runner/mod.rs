// SPDX-License-Identifier: LGPL-3.0-only
//! Task runner implementations.
use self::tokio_runner::TokioRunner;
use std::future::Future;
use tokio::runtime::Handle;

/// The tokio backed task runner.
pub mod tokio_runner;

/// An abstraction over a task runner.
#[derive(Debug)]
pub enum TaskRunner {
    /// The tokio task runner.
    Tokio(TokioRunner),
    /// No task runner selected.
    None,
}

impl TaskRunner {
    /// Blocks on the given future.
    pub fn block_on<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        match self {
            TaskRunner::Tokio(runner) => runner.block_on(fut),
            TaskRunner::None => {
                // Since there is no runtime, we can just block on the future using pollster.
                pollster::block_on(fut)
            },
        }
    }

    /// Spawns the given future without waiting for it.
    ///
    /// Works without an initialized runner, as detached tasks run on smol's global executor.
    pub fn spawn_detached<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self {
            TaskRunner::Tokio(runner) => runner.spawn_detached(fut),
            TaskRunner::None => smol::spawn(fut).detach(),
        }
    }

    /// Returns the runtime handle, if a runtime backs this runner.
    pub fn handle(&self) -> Option<Handle> {
        match self {
            TaskRunner::Tokio(runner) => Some(runner.handle()),
            TaskRunner::None => None,
        }
    }

    /// Stops the runner without waiting for running tasks.
    pub fn shutdown(self) {
        match self {
            TaskRunner::Tokio(runner) => runner.shutdown(),
            TaskRunner::None => {},
        }
    }
}
