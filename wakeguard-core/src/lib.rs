// SPDX-License-Identifier: LGPL-3.0-only
#![warn(missing_docs)]

//! Core library for wakeguard => See `wakeguard` crate.
//!
//! Contains the power save blocker and the platform backends it drives.

/// Contains the [PowerSaveConfig](config::PowerSaveConfig) and [TasksConfig](config::TasksConfig) structs.
pub mod config;

/// Contains the error type shared by all backends.
pub mod error;

/// Contains platform detection and the native inhibition backends.
pub mod platform;

/// Contains the power save blocker and its per block type state machines.
pub mod power;

/// Contains the task runner, fire-and-forget spawning and the periodic timer.
pub mod tasks;
