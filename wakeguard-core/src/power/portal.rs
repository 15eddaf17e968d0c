// SPDX-License-Identifier: LGPL-3.0-only
use super::token::handle_token;
use super::{Outcome, SkipReason};
use crate::error::PowerSaveError;
use crate::platform::xdg_desktop_portal::{request_path, InhibitFlags, PortalBus};
use crate::platform::WindowHandle;

/// Inhibits app suspension through the desktop portal.
///
/// Holds at most one request. The request path is recorded as soon as the
/// `Inhibit` call is issued, before the portal answers, so a release right
/// after a prevent always has something to close. A denied request is not
/// noticed and its path stays recorded until released.
pub struct PortalInhibitor {
    bus: Box<dyn PortalBus>,
    token_prefix: String,
    request_path: Option<String>,
}

impl PortalInhibitor {
    /// Create an inactive inhibitor sending its calls over `bus`.
    pub fn new(bus: Box<dyn PortalBus>, token_prefix: impl Into<String>) -> Self {
        Self {
            bus,
            token_prefix: token_prefix.into(),
            request_path: None,
        }
    }

    /// Returns true while a request is outstanding.
    pub fn is_active(&self) -> bool {
        self.request_path.is_some()
    }

    /// The path of the outstanding request, if any.
    pub fn request_path(&self) -> Option<&str> {
        self.request_path.as_deref()
    }

    /// Ask the portal to inhibit suspension on behalf of `window`.
    pub fn prevent(&mut self, reason: &str, window: &WindowHandle) -> Outcome {
        if let Some(path) = &self.request_path {
            log::debug!("App suspension already inhibited by {}", path);
            return Outcome::Skipped(SkipReason::AlreadyActive);
        }

        match self.issue_inhibit(reason, window) {
            Ok(path) => {
                log::info!("Requested app suspension inhibition {}", path);
                self.request_path = Some(path);
                Outcome::Applied
            },
            Err(err) => {
                log::warn!("Failed to inhibit app suspension: {}", err);
                Outcome::Skipped(SkipReason::Failed(err))
            },
        }
    }

    /// Close the outstanding request.
    ///
    /// The request is forgotten even if `Close` cannot be sent.
    pub fn release(&mut self) -> Outcome {
        let Some(path) = self.request_path.take() else {
            log::debug!("App suspension not inhibited, nothing to release");
            return Outcome::Skipped(SkipReason::NotActive);
        };

        match self.bus.close(&path) {
            Ok(()) => {
                log::info!("Released app suspension inhibition {}", path);
                Outcome::Applied
            },
            Err(err) => {
                log::warn!("Failed to release app suspension inhibition {}: {}", path, err);
                Outcome::Skipped(SkipReason::Failed(err))
            },
        }
    }

    fn issue_inhibit(&mut self, reason: &str, window: &WindowHandle) -> Result<String, PowerSaveError> {
        let token = handle_token(&self.token_prefix);
        let unique_name = self.bus.unique_name()?;
        let path = request_path(&unique_name, &token);

        self.bus
            .inhibit(&window.parent_window_id(), InhibitFlags::SUSPEND, &token, reason)?;
        Ok(path)
    }
}
