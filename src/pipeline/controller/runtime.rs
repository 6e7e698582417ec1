use std::str::FromStr;

use crate::config::CameraSettings;
use crate::device::{check_quality, check_resolution};
use crate::error::AppError;

/// Camera reconfiguration requested while the station runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCommand {
    Resolution(u8),
    Quality(u8),
    ToggleAutoWhiteBalance,
    Illumination(u8),
}

impl FromStr for RuntimeCommand {
    type Err = AppError;

    /// Accepts `resolution 9`, `quality 12`, `awb` and `led 150`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let keyword = words
            .next()
            .ok_or_else(|| AppError::InvalidCommand("empty command".to_string()))?
            .to_ascii_lowercase();
        let value = words.next();
        if words.next().is_some() {
            return Err(AppError::InvalidCommand(format!("trailing input in '{}'", line.trim())));
        }

        let number = |name: &str| -> Result<u8, AppError> {
            let raw = value.ok_or_else(|| {
                AppError::InvalidCommand(format!("'{}' needs a value", name))
            })?;
            raw.parse::<u8>().map_err(|_| {
                AppError::InvalidCommand(format!("'{}' is not a valid {} value", raw, name))
            })
        };

        match keyword.as_str() {
            "resolution" | "r" => Ok(RuntimeCommand::Resolution(number("resolution")?)),
            "quality" | "q" => Ok(RuntimeCommand::Quality(number("quality")?)),
            "led" | "l" => Ok(RuntimeCommand::Illumination(number("led")?)),
            "awb" | "a" if value.is_none() => Ok(RuntimeCommand::ToggleAutoWhiteBalance),
            "awb" | "a" => Err(AppError::InvalidCommand("'awb' takes no value".to_string())),
            other => Err(AppError::InvalidCommand(format!("unknown command '{}'", other))),
        }
    }
}

/// Camera settings the controller reads at tick boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub resolution: u8,
    pub quality: u8,
    pub auto_white_balance: bool,
    pub illumination: u8,
}

impl From<CameraSettings> for RuntimeSettings {
    fn from(camera: CameraSettings) -> Self {
        Self {
            resolution: camera.resolution,
            quality: camera.quality,
            auto_white_balance: camera.auto_white_balance,
            illumination: camera.illumination,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        CameraSettings::default().into()
    }
}

impl RuntimeSettings {
    /// Validates and stores the command. Rejected commands leave the settings untouched.
    pub fn apply(&mut self, command: RuntimeCommand) -> Result<(), AppError> {
        match command {
            RuntimeCommand::Resolution(index) => {
                check_resolution(index)?;
                self.resolution = index;
            }
            RuntimeCommand::Quality(quality) => {
                check_quality(quality)?;
                self.quality = quality;
            }
            RuntimeCommand::ToggleAutoWhiteBalance => {
                self.auto_white_balance = !self.auto_white_balance;
            }
            RuntimeCommand::Illumination(intensity) => self.illumination = intensity,
        }
        Ok(())
    }
}
