use crate::capture::{ArtifactKind, CaptureArtifact};
use crate::frame::Facing;
use crate::session::SessionState;
use serde::Serialize;
use std::time::Duration;

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ShutdownReason {
    /// The script ran to the end
    Completed,
    Signal(String),
    Error(String),
    UserRequest,
}

/// Steps of a scripted capture run against the session controller
#[derive(Debug, Clone, Default)]
pub struct CaptureScript {
    pub facing: Option<Facing>,
    pub filter: Option<String>,
    pub ar_filter: Option<String>,
    pub mask: Option<String>,
    /// Hold the shutter this long instead of tapping it
    pub record_seconds: Option<u32>,
    pub caption: Option<String>,
    pub stickers: Vec<String>,
    pub publish: bool,
    /// Time the live view runs before the shutter is used
    pub warmup: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub id: String,
    pub kind: ArtifactKind,
    pub mime_type: String,
    pub filename: String,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
    pub duration_ms: Option<u64>,
}

impl From<&CaptureArtifact> for ArtifactSummary {
    fn from(artifact: &CaptureArtifact) -> Self {
        Self {
            id: artifact.id.clone(),
            kind: artifact.kind,
            mime_type: artifact.mime_type.clone(),
            filename: artifact.suggested_filename.clone(),
            bytes: artifact.len(),
            width: artifact.width,
            height: artifact.height,
            duration_ms: artifact.duration.map(|d| d.as_millis() as u64),
        }
    }
}

/// What a run produced, taken before the session is torn down
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub reason: ShutdownReason,
    pub artifact: Option<ArtifactSummary>,
    pub state: SessionState,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        match self.reason {
            ShutdownReason::Completed | ShutdownReason::UserRequest => 0,
            ShutdownReason::Signal(_) => 130,
            ShutdownReason::Error(_) => 1,
        }
    }
}
