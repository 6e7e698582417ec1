pub mod backend;
pub mod color_mask_service;
pub mod geometry;
pub mod hsv;
pub mod shape_classifier;

pub use backend::{ImageVisionBackend, VisionBackend};
pub use color_mask_service::{ColorMask, ColorMaskPipeline};
pub use shape_classifier::{CandidateContour, ShapeClassifier, ShapeFilter};
