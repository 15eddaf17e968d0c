// SPDX-License-Identifier: LGPL-3.0-only
//! Settings services for wakeguard.

pub mod settings;

pub use settings::{Config, PowerSaveSettings, SettingsRegistry};
