// SPDX-License-Identifier: LGPL-3.0-only
use std::num::NonZeroUsize;
use std::time::Duration;

use wakeguard_services::settings::Config;

/// Default interval between two X11 screen saver resets.
///
/// Must stay below any realistic idle timeout of the X server.
pub const DEFAULT_RESET_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted interval between two X11 screen saver resets.
pub const MAX_RESET_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default prefix of the portal request handle token.
pub const DEFAULT_HANDLE_TOKEN_PREFIX: &str = "desktop_app";

/// Power save blocker configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PowerSaveConfig {
    /// If the desktop portal may be used to inhibit app suspension.
    pub portal: bool,
    /// If the Wayland idle inhibit protocol may be used to block display sleep.
    pub idle_inhibit: bool,
    /// If the X11 screen saver reset loop may be used to block display sleep.
    pub x11_reset: bool,
    /// The interval of the X11 screen saver reset loop.
    ///
    /// Can be configured via the `WAKEGUARD_RESET_INTERVAL` environment variable (in seconds).
    pub reset_interval: Duration,
    /// The prefix of the `handle_token` sent with portal requests.
    pub handle_token_prefix: String,
}

impl Default for PowerSaveConfig {
    fn default() -> Self {
        let reset_interval = match std::env::var("WAKEGUARD_RESET_INTERVAL") {
            Ok(val) => match val.trim().parse::<u64>() {
                Ok(secs) => reset_interval_from_secs(secs),
                Err(_) => {
                    log::warn!(
                        "Invalid WAKEGUARD_RESET_INTERVAL value '{}'; using {:?}",
                        val,
                        DEFAULT_RESET_INTERVAL
                    );
                    DEFAULT_RESET_INTERVAL
                },
            },
            Err(_) => DEFAULT_RESET_INTERVAL,
        };

        Self {
            portal: true,
            idle_inhibit: true,
            x11_reset: true,
            reset_interval,
            handle_token_prefix: DEFAULT_HANDLE_TOKEN_PREFIX.to_string(),
        }
    }
}

impl PowerSaveConfig {
    /// Build the configuration from loaded settings, falling back to defaults for unset keys.
    pub fn from_settings(settings: &Config) -> Self {
        let power_save = &settings.power_save;
        let mut config = Self::default();

        if let Some(portal) = power_save.portal {
            config.portal = portal;
        }
        if let Some(idle_inhibit) = power_save.idle_inhibit {
            config.idle_inhibit = idle_inhibit;
        }
        if let Some(x11_reset) = power_save.x11_reset {
            config.x11_reset = x11_reset;
        }
        if let Some(secs) = power_save.reset_interval_secs {
            config.reset_interval = reset_interval_from_secs(secs);
        }
        if let Some(prefix) = &power_save.handle_token_prefix {
            config.handle_token_prefix = sanitize_token_prefix(prefix);
        }

        config
    }
}

fn reset_interval_from_secs(secs: u64) -> Duration {
    if secs == 0 {
        log::warn!("Reset interval of 0 seconds is not allowed; using {:?}", DEFAULT_RESET_INTERVAL);
        return DEFAULT_RESET_INTERVAL;
    }
    let interval = Duration::from_secs(secs);
    if interval > MAX_RESET_INTERVAL {
        log::warn!("Reset interval of {} seconds is too long; using {:?}", secs, MAX_RESET_INTERVAL);
        return MAX_RESET_INTERVAL;
    }
    interval
}

/// Handle tokens end up in an object path, so only `[A-Za-z0-9_]` is kept.
fn sanitize_token_prefix(prefix: &str) -> String {
    let sanitized: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if sanitized.is_empty() {
        log::warn!("Handle token prefix '{}' has no usable characters; using default", prefix);
        return DEFAULT_HANDLE_TOKEN_PREFIX.to_string();
    }
    sanitized
}

/// Configuration structure for the integrated [TaskRunner](crate::tasks::runner::TaskRunner).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TasksConfig {
    /// The stack size of each thread of the task runner thread pool. Defaults to 1 MB.
    pub stack_size: usize,
    /// The amount of worker threads of the task runner thread pool. Defaults to half of the available threads.
    pub workers: NonZeroUsize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        Self {
            stack_size: 1024 * 1024, // 1 MB
            workers: NonZeroUsize::new(available / 2).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
