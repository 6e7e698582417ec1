use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::device::esp_cam_client::parse_device_url;
use crate::device::{check_quality, check_resolution};
use crate::error::AppError;
use crate::pipeline::services::ShapeFilter;
use crate::pipeline::types::ColorRange;

pub const CONFIG_PATH_VAR: &str = "SORTBOT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "sortbot.toml";
pub const ENV_PREFIX: &str = "SORTBOT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub base_url: String,
    pub stream_port: u16,
    pub request_timeout_ms: u64,
    /// Longest silence tolerated on the video stream before it is reopened.
    pub stream_read_timeout_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.4.1".to_string(),
            stream_port: 81,
            request_timeout_ms: 2000,
            stream_read_timeout_ms: 5000,
        }
    }
}

impl DeviceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn stream_read_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_read_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub resolution: u8,
    pub quality: u8,
    pub auto_white_balance: bool,
    pub illumination: u8,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: 9,
            quality: 10,
            auto_white_balance: true,
            illumination: 150,
        }
    }
}

/// Which digital output a voted color drives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActuatorBinding {
    pub color: String,
    pub pin: u8,
}

impl ActuatorBinding {
    pub fn new(color: impl Into<String>, pin: u8) -> Self {
        Self {
            color: color.into(),
            pin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub capture_window_ms: u64,
    pub post_action_delay_ms: u64,
    pub idle_poll_ms: u64,
    pub no_shape_poll_ms: u64,
    pub frame_retry_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            capture_window_ms: 2000,
            post_action_delay_ms: 2000,
            idle_poll_ms: 50,
            no_shape_poll_ms: 50,
            frame_retry_ms: 10,
        }
    }
}

impl TimingSettings {
    pub fn capture_window(&self) -> Duration {
        Duration::from_millis(self.capture_window_ms)
    }

    pub fn post_action_delay(&self) -> Duration {
        Duration::from_millis(self.post_action_delay_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn no_shape_poll(&self) -> Duration {
        Duration::from_millis(self.no_shape_poll_ms)
    }

    pub fn frame_retry(&self) -> Duration {
        Duration::from_millis(self.frame_retry_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub device: DeviceSettings,
    pub camera: CameraSettings,
    pub colors: Vec<ColorRange>,
    pub actuators: Vec<ActuatorBinding>,
    pub timing: TimingSettings,
    pub shape_filter: ShapeFilter,
    pub log_level: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            camera: CameraSettings::default(),
            colors: vec![ColorRange::green(), ColorRange::blue()],
            actuators: vec![
                ActuatorBinding::new("Green", 14),
                ActuatorBinding::new("Blue", 13),
            ],
            timing: TimingSettings::default(),
            shape_filter: ShapeFilter::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Configuration {
    /// Loads from the file named by `SORTBOT_CONFIG` (or `sortbot.toml`), then
    /// `SORTBOT_*` environment overrides.
    pub fn load() -> Result<Self, AppError> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AppError> {
        Self::load_with_prefix(path.as_ref(), ENV_PREFIX)
    }

    fn load_with_prefix(path: &Path, prefix: &str) -> Result<Self, AppError> {
        let configuration: Configuration = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        parse_device_url(&self.device.base_url)?;
        if self.device.stream_port == 0 {
            return Err(AppError::Config("stream port must not be 0".to_string()));
        }
        if self.device.stream_read_timeout_ms == 0 {
            return Err(AppError::Config(
                "stream read timeout must be greater than 0".to_string(),
            ));
        }

        if self.colors.is_empty() {
            return Err(AppError::Config("at least one color must be tracked".to_string()));
        }
        let mut names = HashSet::new();
        for range in &self.colors {
            range.validate()?;
            if !names.insert(range.name.as_str()) {
                return Err(AppError::Config(format!(
                    "color '{}' is configured twice",
                    range.name
                )));
            }
        }

        if self.actuators.len() != 2 {
            return Err(AppError::Config(format!(
                "exactly two actuator bindings are required, found {}",
                self.actuators.len()
            )));
        }
        let [first, second] = [&self.actuators[0], &self.actuators[1]];
        if first.pin == second.pin {
            return Err(AppError::Config(format!(
                "actuators share output pin {}",
                first.pin
            )));
        }
        if first.color == second.color {
            return Err(AppError::Config(format!(
                "color '{}' is bound to both actuators",
                first.color
            )));
        }
        for binding in &self.actuators {
            if !names.contains(binding.color.as_str()) {
                return Err(AppError::Config(format!(
                    "actuator on pin {} is bound to untracked color '{}'",
                    binding.pin, binding.color
                )));
            }
        }

        check_resolution(self.camera.resolution).map_err(|e| AppError::Config(e.to_string()))?;
        check_quality(self.camera.quality).map_err(|e| AppError::Config(e.to_string()))?;

        if self.timing.capture_window_ms == 0 {
            return Err(AppError::Config("capture window must not be zero".to_string()));
        }
        self.shape_filter.validate()?;
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, AppError> {
        Level::from_str(&self.log_level)
            .map_err(|_| AppError::Config(format!("unknown log level '{}'", self.log_level)))
    }
}
