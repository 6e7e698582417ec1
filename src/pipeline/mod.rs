pub mod controller;
pub mod services;
pub mod types;

pub use controller::{DetectionController, RuntimeCommand};
pub use services::{DominantColorVoter, ImageVisionBackend, VisionBackend};
pub use types::{ClassifiedShape, ColorRange, ControllerState, ShapeKind};
