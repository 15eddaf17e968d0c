// SPDX-License-Identifier: LGPL-3.0-only
//! X11 screen saver reset.

use std::ptr;

use x11_dl::xlib::{ScreenSaverReset, Xlib};

use crate::error::PowerSaveError;
use crate::power::reset_loop::ScreenSaver;

/// Resets the X server's screen saver timer through Xlib.
///
/// The library and display are opened for every reset, so a display that goes
/// away (or comes back) between two ticks is handled without extra state.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlibScreenSaver;

impl XlibScreenSaver {
    /// Create the Xlib backed screen saver.
    pub fn new() -> Self {
        Self
    }
}

impl ScreenSaver for XlibScreenSaver {
    fn reset(&self) -> Result<(), PowerSaveError> {
        let xlib = Xlib::open().map_err(|e| PowerSaveError::X11(format!("Failed to load X11 library: {e}")))?;
        unsafe {
            let display = (xlib.XOpenDisplay)(ptr::null());
            if display.is_null() {
                return Err(PowerSaveError::X11("Failed to open X11 display".to_string()));
            }

            // The plain reset request, not XScreenSaverSuspend:
            // https://gitlab.freedesktop.org/xorg/xserver/-/issues/363
            (xlib.XForceScreenSaver)(display, ScreenSaverReset);
            (xlib.XFlush)(display);
            (xlib.XCloseDisplay)(display);
        }
        Ok(())
    }
}
