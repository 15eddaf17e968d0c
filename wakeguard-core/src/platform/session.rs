// SPDX-License-Identifier: LGPL-3.0-only
use std::sync::{Arc, PoisonError, RwLock};

use super::{Platform, WindowHandle};
use crate::error::PowerSaveError;

/// A windowing-protocol capability that keeps the display awake for a window.
pub trait IdleInhibit: Send + Sync {
    /// Start (`prevent = true`) or stop blocking display sleep for `window`.
    ///
    /// Returns `Ok(false)` when nothing changed: the window was already
    /// inhibited, or was not inhibited when asked to stop.
    fn prevent_display_sleep(&self, prevent: bool, window: &WindowHandle) -> Result<bool, PowerSaveError>;

    /// Returns true if at least one window is currently inhibited.
    fn has_inhibitors(&self) -> bool;
}

/// What the running display session offers for blocking display sleep.
///
/// Both methods are queried on every call, never cached: the answer may change
/// over the lifetime of the process.
pub trait DisplaySession: Send + Sync {
    /// The idle inhibit integration, if the session has one.
    fn idle_inhibit(&self) -> Option<Arc<dyn IdleInhibit>>;

    /// Returns true if the session runs on X11.
    fn is_x11(&self) -> bool;
}

/// The default [DisplaySession]: environment based protocol detection plus a
/// slot for the idle inhibit integration.
#[derive(Default)]
pub struct SystemSession {
    idle_inhibit: RwLock<Option<Arc<dyn IdleInhibit>>>,
}

impl SystemSession {
    /// Create a session without an idle inhibit integration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or remove the idle inhibit integration.
    pub fn set_idle_inhibit(&self, integration: Option<Arc<dyn IdleInhibit>>) {
        let mut slot = self.idle_inhibit.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!(
            "Idle inhibit integration {}",
            if integration.is_some() { "installed" } else { "removed" }
        );
        *slot = integration;
    }
}

impl DisplaySession for SystemSession {
    fn idle_inhibit(&self) -> Option<Arc<dyn IdleInhibit>> {
        self.idle_inhibit
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_x11(&self) -> bool {
        Platform::detect() == Platform::X11
    }
}
