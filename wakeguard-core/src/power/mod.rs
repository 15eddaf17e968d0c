// SPDX-License-Identifier: LGPL-3.0-only
//! Power save blocking.
//!
//! [PowerSaveBlocker] is the single entry point. It routes each
//! [PowerSaveBlockType] to exactly one backend:
//!
//! * [PowerSaveBlockType::PreventAppSuspension] always goes to the desktop portal.
//! * [PowerSaveBlockType::PreventDisplaySleep] goes to the session's idle
//!   inhibit integration if there is one, else to the X11 screen saver reset
//!   loop on X11 sessions, else nowhere.
//!
//! Failing to block never disturbs the caller: every operation returns an
//! [Outcome] instead of an error.

use std::sync::Arc;

use crate::config::PowerSaveConfig;
use crate::error::PowerSaveError;
use crate::platform::session::{DisplaySession, SystemSession};
use crate::platform::xdg_desktop_portal::PortalBus;
use crate::platform::WindowHandle;

/// App suspension through the desktop portal.
pub mod portal;
/// Display sleep through periodic X11 screen saver resets.
pub mod reset_loop;
/// Portal request handle tokens.
pub mod token;

pub use portal::PortalInhibitor;
pub use reset_loop::{ResetLoop, ScreenSaver};

/// What to keep the system from doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerSaveBlockType {
    /// Keep the session from suspending.
    PreventAppSuspension,
    /// Keep the display from blanking or locking.
    PreventDisplaySleep,
}

/// Result of a block or unblock request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The backend was asked to change state.
    Applied,
    /// Nothing was changed.
    Skipped(SkipReason),
}

impl Outcome {
    /// Returns true if the request reached a backend.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// Why a request did not change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A block of this type is already in place.
    AlreadyActive,
    /// No block of this type is in place.
    NotActive,
    /// The session offers no way to do it.
    Unsupported,
    /// The backend that would do it is switched off in the configuration.
    Disabled,
    /// The backend failed. Already logged.
    Failed(PowerSaveError),
}

/// The system facilities a [PowerSaveBlocker] talks to.
pub struct Backends {
    /// Session bus access for the portal, if available.
    pub portal: Option<Box<dyn PortalBus>>,
    /// The X11 screen saver, if available.
    pub screen_saver: Option<Arc<dyn ScreenSaver>>,
    /// The display session.
    pub session: Arc<dyn DisplaySession>,
}

impl Backends {
    /// The real system backends enabled by cargo features.
    pub fn system() -> Self {
        #[cfg(all(target_os = "linux", feature = "xdg-portal"))]
        let portal: Option<Box<dyn PortalBus>> =
            Some(Box::new(crate::platform::xdg_desktop_portal::SessionPortal::new()));
        #[cfg(not(all(target_os = "linux", feature = "xdg-portal")))]
        let portal: Option<Box<dyn PortalBus>> = None;

        #[cfg(all(target_os = "linux", feature = "x11"))]
        let screen_saver: Option<Arc<dyn ScreenSaver>> = Some(Arc::new(crate::platform::x11::XlibScreenSaver::new()));
        #[cfg(not(all(target_os = "linux", feature = "x11")))]
        let screen_saver: Option<Arc<dyn ScreenSaver>> = None;

        Self {
            portal,
            screen_saver,
            session: Arc::new(SystemSession::new()),
        }
    }

    /// Replace the display session, e.g. with a [SystemSession] the caller keeps
    /// to install the Wayland idle inhibit integration.
    pub fn with_session(mut self, session: Arc<dyn DisplaySession>) -> Self {
        self.session = session;
        self
    }
}

/// Blocks and unblocks power saving, one independent state machine per
/// [PowerSaveBlockType].
///
/// Dropping the blocker releases the portal request and stops the reset loop.
pub struct PowerSaveBlocker {
    config: PowerSaveConfig,
    portal: Option<PortalInhibitor>,
    reset_loop: Option<ResetLoop>,
    session: Arc<dyn DisplaySession>,
}

impl PowerSaveBlocker {
    /// Create a blocker on the system backends.
    pub fn new(config: PowerSaveConfig) -> Self {
        Self::with_backends(config, Backends::system())
    }

    /// Create a blocker on the given backends.
    pub fn with_backends(config: PowerSaveConfig, backends: Backends) -> Self {
        let portal = backends
            .portal
            .map(|bus| PortalInhibitor::new(bus, config.handle_token_prefix.clone()));
        let reset_loop = backends
            .screen_saver
            .map(|screen_saver| ResetLoop::new(screen_saver, config.reset_interval));

        Self {
            config,
            portal,
            reset_loop,
            session: backends.session,
        }
    }

    /// The configuration this blocker was created with.
    pub fn config(&self) -> &PowerSaveConfig {
        &self.config
    }

    /// Start blocking `block_type`.
    ///
    /// `description` is shown by the desktop where it lists inhibitions.
    /// `window` is the window the block is requested for.
    pub fn block_power_save(
        &mut self,
        block_type: PowerSaveBlockType,
        description: &str,
        window: &WindowHandle,
    ) -> Outcome {
        log::debug!("Blocking {:?}", block_type);
        match block_type {
            PowerSaveBlockType::PreventAppSuspension => self.prevent_app_suspension(Some((description, window))),
            PowerSaveBlockType::PreventDisplaySleep => self.prevent_display_sleep(true, window),
        }
    }

    /// Stop blocking `block_type`.
    pub fn unblock_power_save(&mut self, block_type: PowerSaveBlockType, window: &WindowHandle) -> Outcome {
        log::debug!("Unblocking {:?}", block_type);
        match block_type {
            PowerSaveBlockType::PreventAppSuspension => self.prevent_app_suspension(None),
            PowerSaveBlockType::PreventDisplaySleep => self.prevent_display_sleep(false, window),
        }
    }

    /// Returns true if `block_type` is currently blocked.
    pub fn is_blocked(&self, block_type: PowerSaveBlockType) -> bool {
        match block_type {
            PowerSaveBlockType::PreventAppSuspension => {
                self.portal.as_ref().is_some_and(PortalInhibitor::is_active)
            },
            PowerSaveBlockType::PreventDisplaySleep => {
                self.reset_loop.as_ref().is_some_and(ResetLoop::is_running)
                    || self
                        .session
                        .idle_inhibit()
                        .is_some_and(|integration| integration.has_inhibitors())
            },
        }
    }

    /// `request` is the reason and window when preventing, `None` when releasing.
    fn prevent_app_suspension(&mut self, request: Option<(&str, &WindowHandle)>) -> Outcome {
        if !self.config.portal {
            return Outcome::Skipped(SkipReason::Disabled);
        }
        let Some(portal) = self.portal.as_mut() else {
            log::debug!("No desktop portal backend, app suspension is not blocked");
            return Outcome::Skipped(SkipReason::Unsupported);
        };

        match request {
            Some((description, window)) => portal.prevent(description, window),
            None => portal.release(),
        }
    }

    fn prevent_display_sleep(&mut self, prevent: bool, window: &WindowHandle) -> Outcome {
        let integration = self
            .session
            .idle_inhibit()
            .filter(|_| self.config.idle_inhibit);
        if let Some(integration) = integration {
            return match integration.prevent_display_sleep(prevent, window) {
                Ok(true) => Outcome::Applied,
                Ok(false) if prevent => Outcome::Skipped(SkipReason::AlreadyActive),
                Ok(false) => Outcome::Skipped(SkipReason::NotActive),
                Err(err) => {
                    log::warn!("Idle inhibit failed: {}", err);
                    Outcome::Skipped(SkipReason::Failed(err))
                },
            };
        }

        if !self.session.is_x11() {
            log::debug!("No display sleep backend for this session");
            return Outcome::Skipped(SkipReason::Unsupported);
        }
        if !self.config.x11_reset {
            return Outcome::Skipped(SkipReason::Disabled);
        }
        match self.reset_loop.as_mut() {
            Some(reset_loop) if prevent => reset_loop.prevent(),
            Some(reset_loop) => reset_loop.release(),
            None => Outcome::Skipped(SkipReason::Unsupported),
        }
    }
}

impl Drop for PowerSaveBlocker {
    fn drop(&mut self) {
        if let Some(portal) = self.portal.as_mut() {
            if portal.is_active() {
                portal.release();
            }
        }
        if let Some(reset_loop) = self.reset_loop.as_mut() {
            reset_loop.release();
        }
    }
}
