use bytes::Bytes;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
}

/// Filter, mask and AR selections burned into an artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEffects {
    pub color_filter: String,
    pub mask: Option<String>,
    pub ar_filter: Option<String>,
    pub mirrored: bool,
}

/// Output of one capture action. Never modified after creation.
#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    pub id: String,
    pub kind: ArtifactKind,
    pub bytes: Bytes,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub suggested_filename: String,
    pub width: u32,
    pub height: u32,
    /// Clip length, video only
    pub duration: Option<Duration>,
    /// `data:` URL for immediate display, images only
    pub preview: Option<String>,
    pub effects: AppliedEffects,
}

impl CaptureArtifact {
    pub fn is_image(&self) -> bool {
        self.kind == ArtifactKind::Image
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

/// File extension for a mime type; codec parameters are ignored
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/x-motion-jpeg" => "mjpeg",
        _ => "bin",
    }
}

/// Resolve configured timezone, falling back to UTC on parse errors
pub(crate) fn resolve_timezone(tz_name: &str) -> Tz {
    match tz_name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("Invalid filename timezone '{}', falling back to UTC", tz_name);
            chrono_tz::UTC
        }
    }
}

/// `clubcam_<YYYYmmdd_HHMMSS_mmm>.<ext>` in the given zone
pub fn suggested_filename(created_at: DateTime<Utc>, timezone: &Tz, extension: &str) -> String {
    format!(
        "clubcam_{}.{}",
        created_at.with_timezone(timezone).format("%Y%m%d_%H%M%S_%3f"),
        extension
    )
}
