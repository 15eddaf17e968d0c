// SPDX-License-Identifier: LGPL-3.0-only
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the inhibition backends.
///
/// These never leave the [PowerSaveBlocker](crate::power::PowerSaveBlocker):
/// they are logged and folded into [SkipReason::Failed](crate::power::SkipReason::Failed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowerSaveError {
    /// The session bus could not be reached.
    #[error("D-Bus transport error: {0}")]
    Bus(String),

    /// A call could not be built or was rejected when issued.
    #[error("D-Bus call failed: {0}")]
    Call(String),

    /// No tokio runtime is available to drive the periodic timer.
    #[error("No async runtime available for the reset timer")]
    NoRuntime,

    /// A timer period that is zero or too long to schedule.
    #[error("Timer period {0:?} is out of range")]
    InvalidPeriod(Duration),

    /// The X11 library or display could not be used.
    #[error("X11 error: {0}")]
    X11(String),

    /// The Wayland connection or protocol could not be used.
    #[error("Wayland error: {0}")]
    Wayland(String),
}

#[cfg(all(target_os = "linux", feature = "xdg-portal"))]
impl From<zbus::Error> for PowerSaveError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::Address(_) | zbus::Error::InputOutput(_) | zbus::Error::Handshake(_) => {
                PowerSaveError::Bus(err.to_string())
            },
            _ => PowerSaveError::Call(err.to_string()),
        }
    }
}
