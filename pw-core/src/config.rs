//! Monitor configuration
//!
//! A single typed configuration, loaded from an optional TOML file and
//! validated once at startup. Every section carries defaults so a partial
//! file (or no file at all) yields a working monitor.

use crate::axis::{self, AxisChannel, PedalThresholds};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "PEDALWATCH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub device: DeviceConfig,
    pub sampling: SamplingConfig,
    pub gas: GasConfig,
    pub clutch: ClutchConfig,
    pub brake: PedalConfig,
    pub server: ServerConfig,
    pub alerts: AlertConfig,
}

/// Which device to read and how to interpret its axes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Initial device index (0-15)
    pub joystick_id: u32,

    /// Vendor id used to re-find the device after a disconnect
    pub vendor_id: Option<u16>,

    /// Product id used to re-find the device after a disconnect
    pub product_id: Option<u16>,

    /// Raw-data mode: axes report 0..1023 instead of 0..65535
    pub raw_data: bool,

    /// Invert axes so that 0 = idle and axisMax = fully pressed
    pub axis_normalization: bool,

    pub gas_axis: AxisChannel,
    pub clutch_axis: AxisChannel,
    pub brake_axis: AxisChannel,

    /// Log raw values next to normalized ones
    pub debug_raw: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            joystick_id: 0,
            vendor_id: None,
            product_id: None,
            raw_data: false,
            axis_normalization: true,
            gas_axis: AxisChannel::Y,
            clutch_axis: AxisChannel::R,
            brake_axis: AxisChannel::Z,
            debug_raw: false,
        }
    }
}

impl DeviceConfig {
    /// Vendor/product pair, only when both are configured and non-zero
    pub fn reconnect_target(&self) -> Option<(u16, u16)> {
        match (self.vendor_id, self.product_id) {
            (Some(vid), Some(pid)) if vid != 0 && pid != 0 => Some((vid, pid)),
            _ => None,
        }
    }

    pub fn axis_max(&self) -> u32 {
        axis::axis_max(self.raw_data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Sleep between iterations
    pub sleep_ms: u64,

    /// Number of iterations to run, 0 = forever
    pub iterations: u64,

    /// Wait between device rescans while disconnected
    pub reconnect_backoff_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sleep_ms: 1000,
            iterations: 0,
            reconnect_backoff_ms: 60_000,
        }
    }
}

impl SamplingConfig {
    pub fn sleep(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}

/// Gas drift detection and deadzone estimation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    pub enabled: bool,

    /// Percent of travel treated as idle
    pub deadzone_in: u32,

    /// Percent of travel treated as full throttle
    pub deadzone_out: u32,

    /// Seconds of racing without full throttle before drift is evaluated
    pub window_s: u32,

    /// Minimum seconds between drift alerts, also the estimation window
    pub cooldown_s: u32,

    /// Seconds of idle gas before racing is considered paused
    pub timeout_s: u32,

    /// Minimum travel percent used in a window for it to count
    pub min_usage_percent: u32,

    /// Estimate a lower deadzone-out from observed peak travel
    pub estimate_deadzone: bool,

    /// Auto-adjust deadzone-out down to the estimate, never below this
    pub auto_adjust_minimum: Option<u32>,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deadzone_in: 5,
            deadzone_out: 93,
            window_s: 30,
            cooldown_s: 60,
            timeout_s: 10,
            min_usage_percent: 20,
            estimate_deadzone: false,
            auto_adjust_minimum: None,
        }
    }
}

impl GasConfig {
    pub fn window_ms(&self) -> u64 {
        u64::from(self.window_s) * 1000
    }

    pub fn cooldown_ms(&self) -> u64 {
        u64::from(self.cooldown_s) * 1000
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::from(self.timeout_s) * 1000
    }
}

/// Clutch noise detection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClutchConfig {
    pub enabled: bool,

    /// Stickiness tolerance as percent of travel
    pub margin_percent: u32,

    /// Consecutive near-static samples needed before alerting
    pub repeat_required: u32,

    pub deadzone_in: u32,
    pub deadzone_out: u32,
}

impl Default for ClutchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            margin_percent: 5,
            repeat_required: 4,
            deadzone_in: 5,
            deadzone_out: 93,
        }
    }
}

impl ClutchConfig {
    /// Margin converted to axis units
    pub fn margin_units(&self, axis_max: u32) -> u32 {
        axis::threshold(axis_max, self.margin_percent)
    }
}

/// Idle/full deadzones for a pedal that only feeds the logical percentage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PedalConfig {
    pub deadzone_in: u32,
    pub deadzone_out: u32,
}

impl Default for PedalConfig {
    fn default() -> Self {
        Self {
            deadzone_in: 5,
            deadzone_out: 93,
        }
    }
}

impl PedalConfig {
    pub fn thresholds(&self, axis_max: u32) -> PedalThresholds {
        PedalThresholds::from_percent(axis_max, self.deadzone_in, self.deadzone_out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,

    /// Frames kept in the backlog before the oldest is dropped
    pub queue_capacity: usize,

    /// Idle time before a keep-alive comment is sent
    pub heartbeat_ms: u64,

    /// How long a stream waits for new frames before re-checking
    pub batch_wait_ms: u64,

    /// How long a takeover waits for the current consumer to let go
    pub takeover_wait_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9100)),
            queue_capacity: 1024,
            heartbeat_ms: 15_000,
            batch_wait_ms: 250,
            takeover_wait_ms: 2_000,
        }
    }
}

impl ServerConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn batch_wait(&self) -> Duration {
        Duration::from_millis(self.batch_wait_ms)
    }

    pub fn takeover_wait(&self) -> Duration {
        Duration::from_millis(self.takeover_wait_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Program and leading arguments; the alert text is appended last.
    /// Empty means alerts are only logged.
    pub command: Vec<String>,
}

impl MonitorConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config location: env var first, then the user config dir
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("pedalwatch").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Load from the default location, or fall back to defaults
    pub fn discover() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => {
                tracing::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        match (self.device.vendor_id, self.device.product_id) {
            (Some(_), None) | (None, Some(_)) => {
                return invalid("vendor_id and product_id must be set together".into());
            }
            _ => {}
        }
        if self.device.joystick_id > 15 && self.device.reconnect_target().is_none() {
            return invalid("joystick_id must be 0-15".into());
        }

        if self.sampling.sleep_ms == 0 {
            return invalid("sleep_ms must be > 0".into());
        }
        if self.sampling.reconnect_backoff_ms == 0 {
            return invalid("sampling.reconnect_backoff_ms must be > 0".into());
        }

        let percents = [
            ("gas.deadzone_in", self.gas.deadzone_in),
            ("gas.deadzone_out", self.gas.deadzone_out),
            ("gas.min_usage_percent", self.gas.min_usage_percent),
            ("clutch.margin_percent", self.clutch.margin_percent),
            ("clutch.deadzone_in", self.clutch.deadzone_in),
            ("clutch.deadzone_out", self.clutch.deadzone_out),
            ("brake.deadzone_in", self.brake.deadzone_in),
            ("brake.deadzone_out", self.brake.deadzone_out),
        ];
        for (name, value) in percents {
            if value > 100 {
                return invalid(format!("{} must be 0-100", name));
            }
        }

        if self.gas.window_s == 0 {
            return invalid("gas.window_s must be > 0".into());
        }
        if self.gas.timeout_s == 0 {
            return invalid("gas.timeout_s must be > 0".into());
        }
        if self.gas.cooldown_s == 0 {
            return invalid("gas.cooldown_s must be > 0".into());
        }
        if self.clutch.repeat_required == 0 {
            return invalid("clutch.repeat_required must be > 0".into());
        }

        if self.gas.estimate_deadzone && !self.gas.enabled {
            return invalid("gas.estimate_deadzone requires gas monitoring".into());
        }
        if let Some(minimum) = self.gas.auto_adjust_minimum {
            if minimum > 100 {
                return invalid("gas.auto_adjust_minimum must be 0-100".into());
            }
            if !self.gas.enabled {
                return invalid("gas.auto_adjust_minimum requires gas monitoring".into());
            }
            // Auto-adjust is driven by the estimator
            if !self.gas.estimate_deadzone {
                return invalid("gas.auto_adjust_minimum requires gas.estimate_deadzone".into());
            }
            if minimum > self.gas.deadzone_out {
                return invalid(format!(
                    "gas.auto_adjust_minimum ({}) must be <= gas.deadzone_out ({})",
                    minimum, self.gas.deadzone_out
                ));
            }
        }

        if self.server.queue_capacity == 0 {
            return invalid("server.queue_capacity must be > 0".into());
        }
        if self.server.heartbeat_ms == 0 {
            return invalid("server.heartbeat_ms must be > 0".into());
        }
        if self.server.batch_wait_ms == 0 {
            return invalid("server.batch_wait_ms must be > 0".into());
        }
        if self.server.takeover_wait_ms == 0 {
            return invalid("server.takeover_wait_ms must be > 0".into());
        }

        Ok(())
    }
}
