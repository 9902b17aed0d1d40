//! Anchor geometry: where each glyph of a filter lands for a given face.
//!
//! Glyph sizes scale with face width so overlays follow subject distance.

use super::catalog::{Anchor, ArFilterDefinition};
use crate::detector::DetectedFace;
use crate::geometry::{BoundingBox, Point};

/// A glyph to draw, resolved to native frame coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphPlacement {
    pub anchor: Anchor,
    pub glyph: &'static str,
    pub center: Point,
    pub size: f32,
    pub opacity: f32,
}

impl GlyphPlacement {
    fn new(anchor: Anchor, glyph: &'static str, center: Point, size: f32) -> Self {
        Self {
            anchor,
            glyph,
            center,
            size,
            opacity: 1.0,
        }
    }
}

/// Approximate face region centered in the frame, used when landmarks are unavailable
pub fn frame_centered_face(
    frame_width: u32,
    frame_height: u32,
    width_fraction: f32,
    height_fraction: f32,
) -> DetectedFace {
    let center = Point::new(frame_width as f32 / 2.0, frame_height as f32 / 2.0);
    let bbox = BoundingBox::centered(
        center,
        frame_width as f32 * width_fraction,
        frame_height as f32 * height_fraction,
    );
    DetectedFace::from_box(bbox, 0.0)
}

/// Placements for one anchor. Floating is handled by the particle system.
pub fn placements_for_anchor(
    anchor: Anchor,
    glyph: &'static str,
    face: &DetectedFace,
) -> Vec<GlyphPlacement> {
    let bbox = &face.bbox;
    let w = bbox.width;
    let h = bbox.height;

    match anchor {
        Anchor::Nose => vec![GlyphPlacement::new(anchor, glyph, face.nose_tip, 0.35 * w)],
        Anchor::Ears => {
            let y = bbox.y - 0.05 * h;
            vec![
                GlyphPlacement::new(anchor, glyph, Point::new(bbox.x + 0.1 * w, y), 0.4 * w),
                GlyphPlacement::new(anchor, glyph, Point::new(bbox.x + 0.9 * w, y), 0.4 * w),
            ]
        }
        Anchor::Eyes => vec![
            GlyphPlacement::new(anchor, glyph, face.left_eye, 0.3 * w),
            GlyphPlacement::new(anchor, glyph, face.right_eye, 0.3 * w),
        ],
        Anchor::Top => vec![GlyphPlacement::new(
            anchor,
            glyph,
            Point::new(bbox.x + w / 2.0, bbox.y - 0.3 * h),
            0.5 * w,
        )],
        Anchor::Sides => {
            let y = face.eye_line_y();
            vec![
                GlyphPlacement::new(anchor, glyph, Point::new(bbox.x - 0.2 * w, y), 0.35 * w),
                GlyphPlacement::new(anchor, glyph, Point::new(bbox.x + 1.2 * w, y), 0.35 * w),
            ]
        }
        Anchor::Face => {
            let mut placement = GlyphPlacement::new(anchor, glyph, bbox.center(), 1.1 * w);
            placement.opacity = 0.5;
            vec![placement]
        }
        Anchor::Floating => Vec::new(),
    }
}

/// All static placements of a filter on one face, in anchor-set order
pub fn filter_placements(filter: &ArFilterDefinition, face: &DetectedFace) -> Vec<GlyphPlacement> {
    filter
        .anchors
        .iter()
        .flat_map(|anchor| placements_for_anchor(*anchor, filter.glyph_for(*anchor), face))
        .collect()
}
