use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest hue value in the 8-bit HSV convention (degrees / 2).
pub const HUE_MAX: u8 = 179;

const CHANNELS: [&str; 3] = ["hue", "saturation", "value"];

/// A named, inclusive HSV window for one tracked color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub fn new(name: impl Into<String>, lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    pub fn green() -> Self {
        Self::new("Green", [40, 100, 50], [80, 255, 255])
    }

    pub fn blue() -> Self {
        Self::new("Blue", [90, 150, 50], [120, 255, 255])
    }

    /// Inclusive test on every channel.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("color name must not be empty".to_string()));
        }
        for (c, channel) in CHANNELS.iter().enumerate() {
            if self.lower[c] > self.upper[c] {
                return Err(self.invalid(format!(
                    "lower bound {} above upper bound {} on {}",
                    self.lower[c], self.upper[c], channel
                )));
            }
        }
        if self.upper[0] > HUE_MAX {
            return Err(self.invalid(format!(
                "hue bound {} exceeds {}",
                self.upper[0], HUE_MAX
            )));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> AppError {
        AppError::InvalidColorRange {
            name: self.name.clone(),
            reason,
        }
    }
}
