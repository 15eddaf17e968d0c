// SPDX-License-Identifier: LGPL-3.0-only
#![warn(missing_docs)]

//! Keep Linux desktops from suspending or blanking the display while your application needs them.
//!
//! ```no_run
//! use wakeguard::prelude::*;
//!
//! let mut blocker = PowerSaveBlocker::new(PowerSaveConfig::default());
//! let window = WindowHandle::x11(0x3a0000b);
//! blocker.block_power_save(PowerSaveBlockType::PreventDisplaySleep, "Playing video", &window);
//! // ...
//! blocker.unblock_power_save(PowerSaveBlockType::PreventDisplaySleep, &window);
//! ```

pub use wakeguard_core as core;
pub use wakeguard_services as services;

/// A "prelude" for users of wakeguard.
///
/// Importing this module brings into scope the types needed to block power saving.
pub mod prelude {
    pub use crate::core::config::{PowerSaveConfig, TasksConfig};
    pub use crate::core::error::PowerSaveError;
    pub use crate::core::platform::{DisplaySession, IdleInhibit, Platform, SystemSession, WindowHandle};
    pub use crate::core::power::{Backends, Outcome, PowerSaveBlockType, PowerSaveBlocker, SkipReason};
    pub use crate::services::SettingsRegistry;

    #[cfg(all(target_os = "linux", feature = "wayland"))]
    pub use crate::core::platform::wayland::WaylandIdleInhibitor;
}
