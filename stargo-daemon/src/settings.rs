//! Daemon settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stargo_filter::FilterSpec;
use stargo_mount::{AutoAdjustConfig, EngineConfig, DEFAULT_BAUD_RATE};
use stargo_protocol::GuidingSpeeds;
use tracing::{debug, warn};

/// Port name that selects the built-in virtual mount
pub const VIRTUAL_PORT: &str = "virtual";

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial port path, or `virtual`
    pub port: String,
    pub baud_rate: u32,
    pub engine: EngineConfig,
    pub auto_adjust: AutoAdjustConfig,
    /// Drift filter used by auto-adjust
    pub filter: FilterSpec,
    /// Start auto-adjust on connect
    pub auto_adjust_enabled: bool,
    /// Guiding speeds to write on connect
    pub guiding_speeds: Option<GuidingSpeeds>,
    /// Manual RA tracking adjustment (percent), used when auto-adjust is off
    pub tracking_adjustment: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: VIRTUAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            engine: EngineConfig::default(),
            auto_adjust: AutoAdjustConfig::default(),
            filter: FilterSpec::default(),
            auto_adjust_enabled: false,
            guiding_speeds: None,
            tracking_adjustment: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for stargo
    /// Uses $XDG_CONFIG_HOME/stargo, falls back to ~/.config/stargo
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("stargo"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("stargo"))
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from `path`, or from the default location
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No settings at {}: {}", path.display(), e);
                return Self::default();
            }
        };

        Self::from_json(&text).unwrap_or_else(|e| {
            warn!("Ignoring invalid settings in {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn is_virtual(&self) -> bool {
        self.port == VIRTUAL_PORT
    }
}
