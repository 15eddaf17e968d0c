// SPDX-License-Identifier: LGPL-3.0-only
//! Platform abstraction for the native inhibition facilities.
//!
//! This module provides session detection and the backends talking to the
//! desktop portal, the Wayland compositor and the X server.

/// Display session capabilities consulted on every block/unblock.
pub mod session;

/// Window identification for portal parents and idle inhibitors.
pub mod window;

#[cfg(all(target_os = "linux", feature = "wayland"))]
pub mod wayland;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub mod x11;

pub mod xdg_desktop_portal;

/// Display protocol of the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// An X11 session.
    X11,
    /// A Wayland session.
    Wayland,
    /// Neither could be detected (headless, tty, other OS).
    Unknown,
}

impl Platform {
    /// Detect the platform based on environment variables.
    ///
    /// # Returns
    /// * the value of `WAKEGUARD_PLATFORM` if it is set to "x11" or "wayland"
    /// * the value of `XDG_SESSION_TYPE` if it is "x11" or "wayland"
    /// * `Platform::Wayland` if `WAYLAND_DISPLAY` is set
    /// * `Platform::X11` if `DISPLAY` is set
    /// * `Platform::Unknown` otherwise
    pub fn detect() -> Self {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    /// Detect the platform using `lookup` in place of the process environment.
    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("WAKEGUARD_PLATFORM") {
            match val.to_lowercase().as_str() {
                "x11" => return Platform::X11,
                "wayland" => return Platform::Wayland,
                _ => {
                    log::warn!("Unknown WAKEGUARD_PLATFORM value '{}'; auto-detecting", val);
                },
            }
        }

        match lookup("XDG_SESSION_TYPE").map(|s| s.to_lowercase()).as_deref() {
            Some("x11") => return Platform::X11,
            Some("wayland") => return Platform::Wayland,
            _ => {},
        }

        if lookup("WAYLAND_DISPLAY").is_some() {
            Platform::Wayland
        } else if lookup("DISPLAY").is_some() {
            Platform::X11
        } else {
            Platform::Unknown
        }
    }
}

pub use session::{DisplaySession, IdleInhibit, SystemSession};
pub use window::WindowHandle;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detect(vars: &[(&str, &str)]) -> Platform {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Platform::detect_with(|key| env.get(key).cloned())
    }

    #[test]
    fn test_override_wins() {
        assert_eq!(
            detect(&[("WAKEGUARD_PLATFORM", "X11"), ("XDG_SESSION_TYPE", "wayland")]),
            Platform::X11
        );
    }

    #[test]
    fn test_session_type_beats_display_variables() {
        assert_eq!(
            detect(&[("XDG_SESSION_TYPE", "wayland"), ("DISPLAY", ":0")]),
            Platform::Wayland
        );
    }

    #[test]
    fn test_display_variables_fallback() {
        assert_eq!(detect(&[("DISPLAY", ":0")]), Platform::X11);
        assert_eq!(
            detect(&[("WAYLAND_DISPLAY", "wayland-0"), ("DISPLAY", ":0")]),
            Platform::Wayland
        );
        assert_eq!(detect(&[("XDG_SESSION_TYPE", "tty")]), Platform::Unknown);
    }

    #[test]
    fn test_unknown_override_falls_back() {
        assert_eq!(
            detect(&[("WAKEGUARD_PLATFORM", "winit"), ("DISPLAY", ":1")]),
            Platform::X11
        );
    }
}
