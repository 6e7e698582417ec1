use super::color_mask_service::{ColorMask, ColorMaskPipeline};
use super::shape_classifier::{ShapeClassifier, ShapeFilter};
use crate::common::Frame;
use crate::pipeline::types::{ClassifiedShape, ColorRange};

/// Image-processing capability used by the voter and the controller.
pub trait VisionBackend: Send + Sync {
    fn mask(&self, frame: &Frame, range: &ColorRange) -> ColorMask;
    fn classify(&self, mask: &ColorMask) -> Vec<ClassifiedShape>;
    fn name(&self) -> &'static str;

    fn detect(&self, frame: &Frame, range: &ColorRange) -> Vec<ClassifiedShape> {
        self.classify(&self.mask(frame, range))
    }
}

/// Pure-Rust backend built on `image` and `imageproc`.
#[derive(Debug, Clone, Default)]
pub struct ImageVisionBackend {
    pipeline: ColorMaskPipeline,
    classifier: ShapeClassifier,
}

impl ImageVisionBackend {
    pub fn new(filter: ShapeFilter) -> Self {
        Self {
            pipeline: ColorMaskPipeline::new(),
            classifier: ShapeClassifier::new(filter),
        }
    }
}

impl VisionBackend for ImageVisionBackend {
    fn mask(&self, frame: &Frame, range: &ColorRange) -> ColorMask {
        self.pipeline.mask(frame, range)
    }

    fn classify(&self, mask: &ColorMask) -> Vec<ClassifiedShape> {
        self.classifier.classify(mask)
    }

    fn name(&self) -> &'static str {
        "imageproc"
    }
}
