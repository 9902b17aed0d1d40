use crate::error::DetectorError;
use crate::frame::FrameData;
use crate::geometry::{BoundingBox, Point};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;

/// Number of points sampled along the synthesized jaw outline
const JAW_POINTS: usize = 9;

/// One face found in a frame, in native unmirrored pixels.
///
/// `left_eye` is the eye with the smaller x coordinate in the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub nose_tip: Point,
    pub left_eye: Point,
    pub right_eye: Point,
    pub jaw: Vec<Point>,
    pub confidence: f32,
}

impl DetectedFace {
    /// Face with landmarks placed at typical proportions of its box
    pub fn from_box(bbox: BoundingBox, confidence: f32) -> Self {
        let center = bbox.center();
        let jaw = (0..JAW_POINTS)
            .map(|i| {
                let theta = PI * i as f32 / (JAW_POINTS - 1) as f32;
                Point::new(
                    center.x + bbox.width / 2.0 * theta.cos(),
                    center.y + bbox.height / 2.0 * theta.sin(),
                )
            })
            .collect();

        Self {
            bbox,
            nose_tip: bbox.at(0.5, 0.6),
            left_eye: bbox.at(0.3, 0.4),
            right_eye: bbox.at(0.7, 0.4),
            jaw,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.bbox.width
    }

    /// Vertical position of the line through both eyes
    pub fn eye_line_y(&self) -> f32 {
        (self.left_eye.y + self.right_eye.y) / 2.0
    }

    /// Lowest jaw point, or the box bottom when no outline is known
    pub fn chin(&self) -> Point {
        self.jaw
            .iter()
            .copied()
            .max_by(|a, b| a.y.total_cmp(&b.y))
            .unwrap_or_else(|| self.bbox.at(0.5, 1.0))
    }
}

/// A loaded face-landmark model
pub trait LandmarkModel: Send + Sync {
    fn name(&self) -> &str;

    /// Find faces in a frame. Errors are per-call and never change detector state.
    fn detect(&self, frame: &FrameData) -> Result<Vec<DetectedFace>, DetectorError>;
}

/// Asynchronous source of a landmark model (network fetch, file read, ...)
#[async_trait]
pub trait LandmarkModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn LandmarkModel>, DetectorError>;
}
