//! Link and controller configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MountError;

/// Protocol engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum time between two transmits (ms)
    pub command_spacing_ms: u64,
    /// Wait used by typed queries that expect a reply (ms)
    pub reply_timeout_ms: u64,
    /// Longest run of bytes without a terminator treated as one frame
    pub max_frame_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_spacing_ms: 50,
            reply_timeout_ms: 2000,
            max_frame_len: stargo_protocol::MAX_FRAME_LEN,
        }
    }
}

impl EngineConfig {
    pub fn command_spacing(&self) -> Duration {
        Duration::from_millis(self.command_spacing_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

/// RA auto-adjust configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoAdjustConfig {
    /// Period of the adjustment loop (s)
    pub interval_secs: u64,
    /// Smallest trim change worth writing (percent)
    pub threshold_percent: f64,
    /// Trim limit accepted by the controller (percent)
    pub max_trim_percent: f64,
}

impl Default for AutoAdjustConfig {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            threshold_percent: 0.005,
            max_trim_percent: stargo_protocol::MAX_TRACKING_ADJUSTMENT,
        }
    }
}

impl AutoAdjustConfig {
    /// Reject settings the adjustment loop cannot run with
    pub fn validate(&self) -> Result<(), MountError> {
        let max = stargo_protocol::MAX_TRACKING_ADJUSTMENT;
        if self.interval_secs == 0 {
            return Err(MountError::InvalidConfig(
                "interval must be at least 1s".into(),
            ));
        }
        if !(self.threshold_percent >= 0.0 && self.threshold_percent.is_finite()) {
            return Err(MountError::InvalidConfig(format!(
                "threshold {}% must be zero or more",
                self.threshold_percent
            )));
        }
        if !(self.max_trim_percent > 0.0 && self.max_trim_percent <= max) {
            return Err(MountError::InvalidConfig(format!(
                "trim limit {}% must be in (0, {}]",
                self.max_trim_percent, max
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Interval in milliseconds, the unit of the accumulated samples
    pub fn interval_ms(&self) -> f64 {
        self.interval_secs as f64 * 1000.0
    }
}
