// SPDX-License-Identifier: LGPL-3.0-only
#![cfg(target_os = "linux")]

//! Wayland integration.
//!
//! Binds protocol extensions on the application's own Wayland connection.

pub mod idle;

pub use idle::WaylandIdleInhibitor;
