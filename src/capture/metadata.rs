use super::artifact::{AppliedEffects, ArtifactKind, CaptureArtifact};
use crate::error::{ClubcamError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// JSON sidecar describing a stored artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: String,
    pub kind: ArtifactKind,
    pub mime_type: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub duration_ms: Option<u64>,
    pub category: String,
    pub effects: AppliedEffects,
}

impl ArtifactMetadata {
    pub fn from_artifact(artifact: &CaptureArtifact, category: &str) -> Self {
        Self {
            id: artifact.id.clone(),
            kind: artifact.kind,
            mime_type: artifact.mime_type.clone(),
            filename: artifact.suggested_filename.clone(),
            created_at: artifact.created_at,
            width: artifact.width,
            height: artifact.height,
            size_bytes: artifact.len(),
            duration_ms: artifact.duration.map(|d| d.as_millis() as u64),
            category: category.to_string(),
            effects: artifact.effects.clone(),
        }
    }
}

/// Write `<dir>/metadata/<id>.json`
pub(crate) async fn save_metadata(metadata: &ArtifactMetadata, dir: &Path) -> Result<PathBuf> {
    let metadata_json = serde_json::to_string_pretty(metadata).map_err(|e| {
        ClubcamError::component("upload", &format!("Failed to serialize metadata: {}", e))
    })?;

    let metadata_dir = dir.join("metadata");
    fs::create_dir_all(&metadata_dir).await.map_err(|e| {
        ClubcamError::component(
            "upload",
            &format!("Failed to create metadata directory: {}", e),
        )
    })?;

    let metadata_path = metadata_dir.join(format!("{}.json", metadata.id));
    fs::write(&metadata_path, metadata_json).await.map_err(|e| {
        ClubcamError::component("upload", &format!("Failed to write metadata file: {}", e))
    })?;

    debug!("Saved metadata to {}", metadata_path.display());
    Ok(metadata_path)
}
