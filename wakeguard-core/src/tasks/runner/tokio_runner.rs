// SPDX-License-Identifier: LGPL-3.0-only
use crate::config::TasksConfig;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

/// A task runner using [tokio] as runtime.
#[derive(Debug)]
pub struct TokioRunner {
    rt: Runtime,
}

impl TokioRunner {
    /// Initializes the tokio task runner with the given config.
    ///
    /// Panics if the runtime cannot be built, which only happens when the OS refuses to spawn threads.
    pub(crate) fn new(config: TasksConfig) -> Self {
        let mut builder = if config.workers.get() == 1 {
            Builder::new_current_thread()
        } else {
            let mut builder = Builder::new_multi_thread();
            builder.worker_threads(config.workers.get());
            builder
        };

        let rt = builder
            .enable_all()
            .thread_name("wakeguard-worker")
            .thread_stack_size(config.stack_size)
            .build()
            .expect("Failed to create tokio runtime");

        Self { rt }
    }

    /// Blocks on the given future.
    pub(crate) fn block_on<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        self.rt.block_on(fut)
    }

    /// Spawns the given future (fire-and-forget).
    /// Uses smol to avoid keeping the tokio runtime alive indefinitely.
    pub(crate) fn spawn_detached<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        smol::spawn(fut).detach();
    }

    /// Returns a handle to the runtime.
    pub(crate) fn handle(&self) -> Handle {
        self.rt.handle().clone()
    }

    /// Shuts the runtime down without blocking on running tasks.
    pub(crate) fn shutdown(self) {
        self.rt.shutdown_background();
    }
}
