use super::anchors::{filter_placements, frame_centered_face, GlyphPlacement};
use super::catalog::{Anchor, ArFilterDefinition};
use super::glyph::{GlyphPainter, GlyphStroke};
use super::particles::{ParticleSystem, RandomSource};
use super::surface::OverlaySurface;
use crate::config::OverlayConfig;
use crate::detector::DetectedFace;
use tracing::{debug, trace};

/// Which geometry a tick used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPath {
    /// No AR filter selected; nothing drawn
    #[default]
    Idle,
    /// Detector unavailable; one synthetic face centered in the frame
    FrameCentered,
    /// Anchored to each detected face
    PerFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub path: RenderPath,
    /// Anchor glyphs plus particles drawn this tick
    pub glyphs_drawn: usize,
    /// Particles alive after culling
    pub particles: usize,
}

/// Draws the active AR filter onto the overlay surface, one tick at a time.
///
/// All geometry is in native unmirrored frame coordinates.
pub struct ArRenderer {
    config: OverlayConfig,
    painter: Box<dyn GlyphPainter>,
    particles: ParticleSystem,
    active: Option<&'static ArFilterDefinition>,
}

impl ArRenderer {
    pub fn new(
        config: OverlayConfig,
        painter: Box<dyn GlyphPainter>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let particles = ParticleSystem::new(config.gravity, rng);
        Self {
            config,
            painter,
            particles,
            active: None,
        }
    }

    /// Switch filters; any change empties the particle pool
    pub fn set_filter(&mut self, filter: Option<&'static ArFilterDefinition>) {
        let changed = self.active.map(|f| f.id) != filter.map(|f| f.id);
        if changed {
            debug!(
                "AR filter changed: {} -> {}",
                self.active.map(|f| f.id).unwrap_or("none"),
                filter.map(|f| f.id).unwrap_or("none")
            );
            self.particles.clear();
            self.active = filter;
        }
    }

    pub fn active_filter(&self) -> Option<&'static ArFilterDefinition> {
        self.active
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn painter_name(&self) -> &str {
        self.painter.name()
    }

    /// Render one tick.
    ///
    /// `detector_ready` selects the per-face path; otherwise the filter is drawn
    /// on a frame-centered face region.
    pub fn tick(
        &mut self,
        surface: &mut OverlaySurface,
        frame_size: (u32, u32),
        detector_ready: bool,
        faces: &[DetectedFace],
    ) -> TickReport {
        let (width, height) = frame_size;
        surface.ensure_size(width, height);
        surface.clear();

        let filter = match self.active {
            Some(filter) => filter,
            None => {
                self.particles.clear();
                return TickReport::default();
            }
        };

        let floating_glyph = filter.glyph_for(Anchor::Floating);
        let (path, placements) = if detector_ready {
            if filter.is_floating() {
                self.particles
                    .spawn_from_faces(faces, floating_glyph, self.config.particle_cap);
            }
            let placements: Vec<GlyphPlacement> = faces
                .iter()
                .flat_map(|face| filter_placements(filter, face))
                .collect();
            (RenderPath::PerFace, placements)
        } else {
            if filter.is_floating() {
                self.particles.spawn_in_frame(
                    width,
                    height,
                    floating_glyph,
                    self.config.fallback_particle_cap,
                );
            }
            let face = frame_centered_face(
                width,
                height,
                self.config.fallback_face_width_fraction,
                self.config.fallback_face_height_fraction,
            );
            (RenderPath::FrameCentered, filter_placements(filter, &face))
        };

        let canvas = surface.image_mut();
        for placement in &placements {
            self.painter.paint(
                canvas,
                &GlyphStroke {
                    glyph: placement.glyph,
                    center: placement.center,
                    size: placement.size,
                    opacity: placement.opacity,
                    accent: filter.accent,
                },
            );
        }

        let mut glyphs_drawn = placements.len();
        if filter.is_floating() {
            glyphs_drawn += self.particles.step(canvas, self.painter.as_ref(), filter.accent);
        }

        trace!(
            "Overlay tick ({:?}): {} glyph(s), {} particle(s)",
            path,
            glyphs_drawn,
            self.particles.len()
        );

        TickReport {
            path,
            glyphs_drawn,
            particles: self.particles.len(),
        }
    }
}
