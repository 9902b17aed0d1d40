use crate::error::{ClubcamError, Result};
use crate::geometry::Point;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::path::Path;
use tracing::{info, warn};

/// One glyph placement request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphStroke<'a> {
    pub glyph: &'a str,
    pub center: Point,
    /// Nominal glyph height in pixels
    pub size: f32,
    pub opacity: f32,
    pub accent: [u8; 3],
}

impl GlyphStroke<'_> {
    fn color(&self) -> Rgba<u8> {
        let alpha = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([self.accent[0], self.accent[1], self.accent[2], alpha])
    }
}

/// Draws glyphs onto the overlay surface
pub trait GlyphPainter: Send + Sync {
    fn name(&self) -> &str;

    fn paint(&self, canvas: &mut RgbaImage, stroke: &GlyphStroke<'_>);
}

/// Filled accent-colored disc per glyph. Deterministic and font-free.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwatchPainter;

impl GlyphPainter for SwatchPainter {
    fn name(&self) -> &str {
        "swatch"
    }

    fn paint(&self, canvas: &mut RgbaImage, stroke: &GlyphStroke<'_>) {
        let radius = ((stroke.size / 2.0).round() as i32).max(1);
        draw_filled_circle_mut(
            canvas,
            (stroke.center.x.round() as i32, stroke.center.y.round() as i32),
            radius,
            stroke.color(),
        );
    }
}

/// Rasterizes glyph outlines from a TrueType font
pub struct FontGlyphPainter {
    font: Font<'static>,
}

impl FontGlyphPainter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let font_data = std::fs::read(path).map_err(|e| {
            ClubcamError::component(
                "overlay",
                &format!("Failed to read font file '{}': {}", path.display(), e),
            )
        })?;

        let font = Font::try_from_vec(font_data).ok_or_else(|| {
            ClubcamError::component(
                "overlay",
                &format!("Failed to parse font file '{}'", path.display()),
            )
        })?;

        Ok(Self { font })
    }
}

impl GlyphPainter for FontGlyphPainter {
    fn name(&self) -> &str {
        "font"
    }

    fn paint(&self, canvas: &mut RgbaImage, stroke: &GlyphStroke<'_>) {
        let scale = Scale::uniform(stroke.size.max(1.0));
        let (text_width, text_height) = text_size(scale, &self.font, stroke.glyph);
        let x = stroke.center.x.round() as i32 - text_width / 2;
        let y = stroke.center.y.round() as i32 - text_height / 2;
        draw_text_mut(canvas, stroke.color(), x, y, scale, &self.font, stroke.glyph);
    }
}

/// Font painter when a usable font is configured, swatches otherwise
pub fn painter_from_config(font_path: Option<&str>) -> Box<dyn GlyphPainter> {
    match font_path {
        Some(path) => match FontGlyphPainter::from_file(path) {
            Ok(painter) => {
                info!("Rasterizing overlay glyphs with font {}", path);
                Box::new(painter)
            }
            Err(e) => {
                warn!("Glyph font unavailable, drawing swatches instead: {}", e);
                Box::new(SwatchPainter)
            }
        },
        None => Box::new(SwatchPainter),
    }
}
