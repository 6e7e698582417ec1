use image::RgbImage;
use std::sync::Arc;
use uuid::Uuid;

/// A single captured RGB image. Cloning shares the pixel buffer.
#[derive(Clone, Debug)]
pub struct Frame {
    frame_id: Uuid,
    image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(image: RgbImage, frame_id: Uuid) -> Self {
        Self {
            frame_id,
            image: Arc::new(image),
        }
    }

    /// Stamps a freshly captured image with a new id.
    pub fn captured(image: RgbImage) -> Self {
        Self::new(image, Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.frame_id
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel_count(&self) -> usize {
        let (w, h) = self.dimensions();
        w as usize * h as usize
    }
}
