use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::{edges, filter, morphology};
use tracing::debug;

use super::hsv::rgb_to_hsv;
use crate::common::Frame;
use crate::pipeline::types::ColorRange;

/// Chebyshev radius of the 5x5 square structuring element.
pub const MORPH_RADIUS: u8 = 2;
/// Sigma of a 5-tap Gaussian kernel.
pub const BLUR_SIGMA: f32 = 1.1;
pub const CANNY_LOW: f32 = 50.0;
pub const CANNY_HIGH: f32 = 150.0;

const ON: Luma<u8> = Luma([255]);
const OFF: Luma<u8> = Luma([0]);

/// Edge mask of one frame for one tracked color.
#[derive(Debug, Clone)]
pub struct ColorMask {
    pub color: String,
    pub edges: GrayImage,
    /// Share of the cleaned mask that matched the range, in percent.
    pub confidence: f32,
}

/// HSV threshold, open/close, blur, Canny. Pure function of frame and range.
#[derive(Debug, Clone)]
pub struct ColorMaskPipeline {
    morph_radius: u8,
    blur_sigma: f32,
    canny_low: f32,
    canny_high: f32,
}

impl Default for ColorMaskPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorMaskPipeline {
    pub fn new() -> Self {
        Self {
            morph_radius: MORPH_RADIUS,
            blur_sigma: BLUR_SIGMA,
            canny_low: CANNY_LOW,
            canny_high: CANNY_HIGH,
        }
    }

    pub fn mask(&self, frame: &Frame, range: &ColorRange) -> ColorMask {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return ColorMask {
                color: range.name.clone(),
                edges: GrayImage::new(width, height),
                confidence: 0.0,
            };
        }

        let raw = self.threshold(frame.image(), range);
        let cleaned = self.clean(&raw);
        let confidence = coverage_percent(&cleaned);

        let blurred = filter::gaussian_blur_f32(&cleaned, self.blur_sigma);
        let edges = edges::canny(&blurred, self.canny_low, self.canny_high);

        debug!(
            "Masked frame {} for {}: confidence {:.2}%",
            frame.id(),
            range.name,
            confidence
        );

        ColorMask {
            color: range.name.clone(),
            edges,
            confidence,
        }
    }

    pub fn threshold(&self, image: &RgbImage, range: &ColorRange) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if range.contains(rgb_to_hsv(image.get_pixel(x, y))) {
                ON
            } else {
                OFF
            }
        })
    }

    /// Opening removes speckle, closing fills pinholes.
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        let opened = morphology::open(mask, Norm::LInf, self.morph_radius);
        morphology::close(&opened, Norm::LInf, self.morph_radius)
    }
}

/// Percentage of non-zero pixels, capped at 100.
pub fn coverage_percent(mask: &GrayImage) -> f32 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let on = mask.pixels().filter(|p| p[0] > 0).count();
    ((on as f32 / total as f32) * 100.0).min(100.0)
}
