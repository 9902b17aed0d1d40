use image::{Rgba, RgbaImage};
use parking_lot::RwLock;
use std::sync::Arc;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Transparent drawing surface kept at the source video's native size.
///
/// Written only by the overlay renderer; the compositor reads snapshots.
#[derive(Debug, Clone)]
pub struct OverlaySurface {
    image: RgbaImage,
}

pub type SharedOverlay = Arc<RwLock<OverlaySurface>>;

impl OverlaySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn shared(width: u32, height: u32) -> SharedOverlay {
        Arc::new(RwLock::new(Self::new(width, height)))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Match the surface to the frame size; returns true if it was resized
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.image.dimensions() == (width, height) {
            return false;
        }
        self.image = RgbaImage::from_pixel(width, height, TRANSPARENT);
        true
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|pixel| pixel[3] == 0)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }
}

impl Default for OverlaySurface {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
