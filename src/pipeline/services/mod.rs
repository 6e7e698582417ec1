pub mod dominant_color_voter;
pub mod image;

pub use dominant_color_voter::{DominantColorVoter, VoteTally};
pub use self::image::{
    ColorMask, ColorMaskPipeline, ImageVisionBackend, ShapeClassifier, ShapeFilter, VisionBackend,
};
