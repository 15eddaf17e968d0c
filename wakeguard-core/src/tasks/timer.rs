// SPDX-License-Identifier: LGPL-3.0-only
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::PowerSaveError;

/// Keeps a periodic timer alive.
///
/// The timer stops when the lifetime is destroyed or dropped.
#[derive(Debug)]
pub struct Lifetime {
    task: JoinHandle<()>,
}

impl Lifetime {
    /// Stops the timer.
    pub fn destroy(self) {
        drop(self);
    }

    /// Returns true while the timer task has not been stopped.
    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Calls `callback` every `period`, starting one `period` from now.
///
/// The timer runs on the current tokio runtime, or on the initialized task runner.
/// Ticks delayed by a busy runtime are not replayed in a burst.
/// Fails if `period` is zero or the first tick would lie beyond what [Instant] can hold.
pub fn timer_each<F>(period: Duration, mut callback: F) -> Result<Lifetime, PowerSaveError>
where
    F: FnMut() + Send + 'static,
{
    let handle = super::handle().ok_or(PowerSaveError::NoRuntime)?;
    if period.is_zero() {
        return Err(PowerSaveError::InvalidPeriod(period));
    }
    let start = Instant::now()
        .checked_add(period)
        .ok_or(PowerSaveError::InvalidPeriod(period))?;

    let task = handle.spawn(async move {
        let mut interval = interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            callback();
        }
    });

    Ok(Lifetime { task })
}
