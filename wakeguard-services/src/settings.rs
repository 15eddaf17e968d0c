// SPDX-License-Identifier: LGPL-3.0-only
use anyhow::Result;
use serde::Deserialize;
use smol::fs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

const XDG_PREFIX: &str = "wakeguard-0";
const CONFIG_FILE: &str = "config.toml";

/// The main configuration structure for wakeguard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,
    /// Power save blocking settings
    #[serde(default)]
    pub power_save: PowerSaveSettings,
    /// Any other sections are captured here
    #[serde(flatten)]
    pub other: HashMap<String, toml::Value>,
}

/// The `[general]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralSettings {
    /// Log at debug level unless `log_level` says otherwise.
    pub debug: Option<bool>,
    /// Log filter, e.g. `info` or `wakeguard_core=trace`.
    pub log_level: Option<String>,
}

impl GeneralSettings {
    /// The log filter these settings ask for, if any.
    pub fn log_filter(&self) -> Option<&str> {
        match (&self.log_level, self.debug) {
            (Some(level), _) => Some(level.as_str()),
            (None, Some(true)) => Some("debug"),
            _ => None,
        }
    }
}

/// The `[power_save]` section.
///
/// Every field is optional so that a later file only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PowerSaveSettings {
    /// Use the desktop portal to inhibit app suspension.
    pub portal: Option<bool>,
    /// Use the Wayland idle inhibit protocol to block display sleep.
    pub idle_inhibit: Option<bool>,
    /// Periodically reset the X11 screen saver to block display sleep.
    pub x11_reset: Option<bool>,
    /// Seconds between two X11 screen saver resets.
    pub reset_interval_secs: Option<u64>,
    /// Prefix of the portal request handle token.
    pub handle_token_prefix: Option<String>,
}

/// Existing config files, lowest precedence first.
///
/// `find_*_files` yield the home directory first, so each list is reversed.
/// The user config comes last, from `find_config_files`.
fn config_paths(xdg_dirs: &BaseDirectories) -> Vec<PathBuf> {
    xdg_dirs
        .find_data_files(CONFIG_FILE)
        .rev()
        .chain(xdg_dirs.find_config_files(CONFIG_FILE).rev())
        .collect()
}

/// Registry for managing wakeguard settings.
pub struct SettingsRegistry {
    config: Config,
}

impl SettingsRegistry {
    /// Create a new SettingsRegistry and load configuration from standard locations.
    pub async fn new() -> Result<Self> {
        let mut registry = Self::with_defaults();
        registry.load().await?;
        Ok(registry)
    }

    /// Create a registry holding only the built-in defaults, without touching the disk.
    pub fn with_defaults() -> Self {
        Self {
            config: Config {
                general: GeneralSettings {
                    debug: Some(false),
                    log_level: None,
                },
                power_save: PowerSaveSettings::default(),
                other: HashMap::new(),
            },
        }
    }

    /// Load configuration from standard locations in precedence order.
    ///
    /// Order (later overrides earlier):
    /// 1. System Data: /usr/share/wakeguard-0/config.toml (and XDG_DATA_DIRS)
    /// 2. System Config: /etc/xdg/wakeguard-0/config.toml (and XDG_CONFIG_DIRS)
    /// 3. User Config: ~/.config/wakeguard-0/config.toml (XDG_CONFIG_HOME)
    pub async fn load(&mut self) -> Result<()> {
        let xdg_dirs = BaseDirectories::with_prefix(XDG_PREFIX)?;

        for path in config_paths(&xdg_dirs) {
            self.load_file(&path).await;
        }

        Ok(())
    }

    async fn load_file(&mut self, path: &Path) {
        log::info!("Loading config from: {:?}", path);
        match fs::read_to_string(path).await {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(loaded_config) => {
                    self.merge(loaded_config);
                },
                Err(e) => {
                    log::error!("Failed to parse config file {:?}: {}", path, e);
                },
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
            },
        }
    }

    /// Merge a loaded config into the current config.
    fn merge(&mut self, other: Config) {
        // General
        if let Some(debug) = other.general.debug {
            self.config.general.debug = Some(debug);
        }
        if other.general.log_level.is_some() {
            self.config.general.log_level = other.general.log_level;
        }

        // Power save
        let power_save = &mut self.config.power_save;
        if let Some(portal) = other.power_save.portal {
            power_save.portal = Some(portal);
        }
        if let Some(idle_inhibit) = other.power_save.idle_inhibit {
            power_save.idle_inhibit = Some(idle_inhibit);
        }
        if let Some(x11_reset) = other.power_save.x11_reset {
            power_save.x11_reset = Some(x11_reset);
        }
        if let Some(secs) = other.power_save.reset_interval_secs {
            power_save.reset_interval_secs = Some(secs);
        }
        if other.power_save.handle_token_prefix.is_some() {
            power_save.handle_token_prefix = other.power_save.handle_token_prefix;
        }

        // Other
        self.config.other.extend(other.other);
    }

    /// Get the current configuration.
    pub fn get(&self) -> &Config {
        &self.config
    }

    /// Load configuration from multiple custom paths asynchronously.
    pub async fn load_from_paths_async(&mut self, paths: Vec<PathBuf>) -> Vec<Result<()>> {
        let mut results = Vec::new();

        for path in paths {
            let result = async {
                let content = fs::read_to_string(&path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;

                let loaded_config: Config = toml::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;

                self.merge(loaded_config);
                Ok(())
            }
            .await;

            results.push(result);
        }

        results
    }

    /// Reload configuration asynchronously (re-runs the full load process).
    pub async fn reload_async(&mut self) -> Result<()> {
        *self = Self::with_defaults();
        self.load().await
    }
}
