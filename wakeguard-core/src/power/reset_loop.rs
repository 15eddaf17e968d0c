// SPDX-License-Identifier: LGPL-3.0-only
use std::sync::Arc;
use std::time::Duration;

use super::{Outcome, SkipReason};
use crate::error::PowerSaveError;
use crate::tasks::timer::{timer_each, Lifetime};

/// A display server whose idle timer can be reset.
pub trait ScreenSaver: Send + Sync {
    /// Reset the idle timer once. Fails if no display is reachable right now.
    fn reset(&self) -> Result<(), PowerSaveError>;
}

/// Keeps the screen saver from kicking in by resetting it on a fixed interval.
pub struct ResetLoop {
    screen_saver: Arc<dyn ScreenSaver>,
    interval: Duration,
    lifetime: Option<Lifetime>,
}

impl ResetLoop {
    /// Create a stopped loop resetting `screen_saver` every `interval`.
    pub fn new(screen_saver: Arc<dyn ScreenSaver>, interval: Duration) -> Self {
        Self {
            screen_saver,
            interval,
            lifetime: None,
        }
    }

    /// Returns true while the loop is running.
    pub fn is_running(&self) -> bool {
        self.lifetime.is_some()
    }

    /// Start the loop. The first reset happens one interval from now.
    pub fn prevent(&mut self) -> Outcome {
        if self.lifetime.is_some() {
            log::debug!("Screen saver reset loop already running");
            return Outcome::Skipped(SkipReason::AlreadyActive);
        }

        let screen_saver = self.screen_saver.clone();
        let tick = move || {
            // No display this tick, try again on the next one
            if let Err(err) = screen_saver.reset() {
                log::trace!("Skipping screen saver reset: {}", err);
            } else {
                log::trace!("Screen saver reset");
            }
        };

        match timer_each(self.interval, tick) {
            Ok(lifetime) => {
                log::info!("Started screen saver reset loop every {:?}", self.interval);
                self.lifetime = Some(lifetime);
                Outcome::Applied
            },
            Err(err) => {
                log::warn!("Failed to start screen saver reset loop: {}", err);
                Outcome::Skipped(SkipReason::Failed(err))
            },
        }
    }

    /// Stop the loop.
    pub fn release(&mut self) -> Outcome {
        match self.lifetime.take() {
            Some(lifetime) => {
                lifetime.destroy();
                log::info!("Stopped screen saver reset loop");
                Outcome::Applied
            },
            None => Outcome::Skipped(SkipReason::NotActive),
        }
    }
}
