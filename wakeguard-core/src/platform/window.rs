// SPDX-License-Identifier: LGPL-3.0-only
#[cfg(all(target_os = "linux", feature = "wayland"))]
use wayland_client::protocol::wl_surface::WlSurface;

/// Identifies the window a power save block is requested for.
///
/// All parts are optional: a default handle means "no particular window".
#[derive(Debug, Clone, Default)]
pub struct WindowHandle {
    x11_window: Option<u32>,
    exported_handle: Option<String>,
    #[cfg(all(target_os = "linux", feature = "wayland"))]
    surface: Option<WlSurface>,
}

impl WindowHandle {
    /// A handle for an X11 window id.
    pub fn x11(window: u32) -> Self {
        Self {
            x11_window: Some(window),
            ..Self::default()
        }
    }

    /// A handle for a Wayland surface of the application's own connection.
    #[cfg(all(target_os = "linux", feature = "wayland"))]
    pub fn wayland(surface: WlSurface) -> Self {
        Self {
            surface: Some(surface),
            ..Self::default()
        }
    }

    /// Attach an `xdg_foreign` exported handle, used as the portal parent on Wayland.
    pub fn with_exported_handle(mut self, handle: impl Into<String>) -> Self {
        self.exported_handle = Some(handle.into());
        self
    }

    /// The X11 window id, if any.
    pub fn x11_window(&self) -> Option<u32> {
        self.x11_window
    }

    /// The Wayland surface, if any.
    #[cfg(all(target_os = "linux", feature = "wayland"))]
    pub fn surface(&self) -> Option<&WlSurface> {
        self.surface.as_ref()
    }

    /// The parent window identifier understood by the desktop portal.
    ///
    /// `wayland:<handle>` for exported Wayland surfaces, `x11:<hex id>` for X11
    /// windows, and an empty string when the window is unknown.
    pub fn parent_window_id(&self) -> String {
        if let Some(handle) = &self.exported_handle {
            format!("wayland:{handle}")
        } else if let Some(window) = self.x11_window {
            format!("x11:{window:x}")
        } else {
            String::new()
        }
    }
}
