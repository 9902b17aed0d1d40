use crate::frame::Facing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Top-level phase of the capture flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Capture,
    Edit,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Capture => write!(f, "capture"),
            SessionPhase::Edit => write!(f, "edit"),
        }
    }
}

/// What the finished artifact is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Caption and stickers, published to the feed
    #[default]
    Post,
    /// Profile picture, used directly or sent to avatar generation
    Avatar,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Post => write!(f, "post"),
            SessionMode::Avatar => write!(f, "avatar"),
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "post" => Ok(SessionMode::Post),
            "avatar" => Ok(SessionMode::Avatar),
            other => Err(format!("unknown session mode '{}'", other)),
        }
    }
}

/// Everything the UI renders for a session.
///
/// Error fields hold user-facing messages. `camera_error` is the only one
/// shown in place of the live view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub mode: SessionMode,
    pub facing: Facing,
    pub camera_live: bool,
    pub torch: bool,
    pub color_filter: String,
    pub mask: String,
    pub ar_filter: Option<String>,
    pub detector: String,
    pub recording: bool,
    pub recording_elapsed: Duration,
    pub has_artifact: bool,
    pub caption: String,
    pub stickers: Vec<String>,
    pub camera_error: Option<String>,
    pub recording_error: Option<String>,
    pub upload_error: Option<String>,
    pub avatar_error: Option<String>,
    pub published_url: Option<String>,
    pub avatar_preview: Option<String>,
}

impl SessionState {
    /// State of a capture phase that has just been entered
    pub fn fresh(mode: SessionMode, facing: Facing) -> Self {
        Self {
            phase: SessionPhase::Capture,
            mode,
            facing,
            camera_live: false,
            torch: false,
            color_filter: "normal".to_string(),
            mask: "none".to_string(),
            ar_filter: None,
            detector: "unloaded".to_string(),
            recording: false,
            recording_elapsed: Duration::ZERO,
            has_artifact: false,
            caption: String::new(),
            stickers: Vec::new(),
            camera_error: None,
            recording_error: None,
            upload_error: None,
            avatar_error: None,
            published_url: None,
            avatar_preview: None,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.phase == SessionPhase::Capture
    }

    pub fn is_edit(&self) -> bool {
        self.phase == SessionPhase::Edit
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::fresh(SessionMode::default(), Facing::Front)
    }
}

/// Decorative glyph attachable to a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sticker {
    pub id: &'static str,
    pub glyph: &'static str,
}

pub static STICKERS: [Sticker; 8] = [
    Sticker { id: "fire", glyph: "🔥" },
    Sticker { id: "heart", glyph: "❤️" },
    Sticker { id: "star", glyph: "⭐" },
    Sticker { id: "party", glyph: "🎉" },
    Sticker { id: "laugh", glyph: "😂" },
    Sticker { id: "cool", glyph: "😎" },
    Sticker { id: "hundred", glyph: "💯" },
    Sticker { id: "rocket", glyph: "🚀" },
];

pub fn stickers() -> &'static [Sticker] {
    &STICKERS
}

pub fn sticker(id: &str) -> Option<&'static Sticker> {
    STICKERS.iter().find(|sticker| sticker.id == id)
}
