use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Which physical camera a stream comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// User-facing (selfie) camera
    Front,
    /// Environment-facing camera
    Back,
}

impl Facing {
    /// Front camera output is presented mirrored, selfie style
    pub fn is_mirrored(&self) -> bool {
        matches!(self, Facing::Front)
    }

    pub fn toggled(&self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }

    /// Platform facing-mode name used in stream constraints
    pub fn facing_mode(&self) -> &'static str {
        match self {
            Facing::Front => "user",
            Facing::Back => "environment",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(Facing::Front),
            "back" | "environment" => Ok(Facing::Back),
            other => Err(format!("unknown camera facing '{}'", other)),
        }
    }
}

/// A decoded video frame in native, unmirrored pixel space
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier within a stream
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// RGBA pixels (shared ownership, frames are never mutated after capture)
    pub pixels: Arc<RgbaImage>,
}

impl FrameData {
    pub fn new(id: u64, timestamp: SystemTime, pixels: RgbaImage) -> Self {
        Self {
            id,
            timestamp,
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
