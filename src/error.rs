use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid color range '{name}': {reason}")]
    InvalidColorRange { name: String, reason: String },
    #[error("Device request failed: {0}")]
    Device(#[from] reqwest::Error),
    #[error("Unexpected device response: {0}")]
    DeviceResponse(String),
    #[error("Invalid runtime command: {0}")]
    InvalidCommand(String),
    #[error("Video source error: {0}")]
    VideoSource(String),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
