pub mod esp_cam_client;

use async_trait::async_trait;

use crate::error::AppError;

pub use esp_cam_client::EspCamClient;

/// Frame sizes accepted by the camera module, by control index.
pub const RESOLUTIONS: [(u8, &str); 9] = [
    (10, "UXGA(1600x1200)"),
    (9, "SXGA(1280x1024)"),
    (8, "XGA(1024x768)"),
    (7, "SVGA(800x600)"),
    (6, "VGA(640x480)"),
    (5, "CIF(400x296)"),
    (4, "QVGA(320x240)"),
    (3, "HQVGA(240x176)"),
    (0, "QQVGA(160x120)"),
];

pub const MIN_QUALITY: u8 = 10;
pub const MAX_QUALITY: u8 = 63;

pub fn resolution_name(index: u8) -> Option<&'static str> {
    RESOLUTIONS
        .iter()
        .find(|(i, _)| *i == index)
        .map(|(_, name)| *name)
}

pub fn check_resolution(index: u8) -> Result<(), AppError> {
    match resolution_name(index) {
        Some(_) => Ok(()),
        None => Err(AppError::InvalidCommand(format!(
            "unknown resolution index {}",
            index
        ))),
    }
}

pub fn check_quality(quality: u8) -> Result<(), AppError> {
    if (MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        Ok(())
    } else {
        Err(AppError::InvalidCommand(format!(
            "quality {} must be between {} and {}",
            quality, MIN_QUALITY, MAX_QUALITY
        )))
    }
}

/// Camera-module control surface. Callers treat every failure as transient.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn set_resolution(&self, index: u8) -> Result<(), AppError>;
    async fn set_quality(&self, quality: u8) -> Result<(), AppError>;
    async fn set_auto_white_balance(&self, enabled: bool) -> Result<(), AppError>;
    async fn set_illumination(&self, intensity: u8) -> Result<(), AppError>;
    async fn set_digital_output(&self, pin: u8, high: bool) -> Result<(), AppError>;
    async fn read_presence(&self) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_resolutions_are_accepted() {
        assert!(check_resolution(9).is_ok());
        assert!(check_resolution(0).is_ok());
        assert_eq!(resolution_name(6), Some("VGA(640x480)"));
    }

    #[test]
    fn gaps_in_resolution_table_are_rejected() {
        for index in [1, 2, 11] {
            assert!(matches!(
                check_resolution(index),
                Err(AppError::InvalidCommand(_))
            ));
        }
    }

    #[test]
    fn quality_limits_are_inclusive() {
        assert!(check_quality(10).is_ok());
        assert!(check_quality(63).is_ok());
        assert!(check_quality(9).is_err());
        assert!(check_quality(64).is_err());
    }
}
