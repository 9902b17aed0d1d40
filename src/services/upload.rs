use crate::capture::{save_metadata, ArtifactMetadata, CaptureArtifact};
use crate::config::UploadConfig;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Where an uploaded artifact is filed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadCategory {
    Posts,
    Chat,
    Avatars,
}

impl UploadCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Posts => "posts",
            UploadCategory::Chat => "chat",
            UploadCategory::Avatars => "avatars",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media host that stores artifacts and hands back a URL.
///
/// `None` means the upload failed; details are the implementation's to log.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload(&self, artifact: &CaptureArtifact, category: UploadCategory) -> Option<String>;
}

/// Stores artifacts under a local directory, one folder per category
pub struct LocalUploadService {
    root: PathBuf,
    save_metadata: bool,
}

impl LocalUploadService {
    pub fn new<P: Into<PathBuf>>(root: P, save_metadata: bool) -> Self {
        Self {
            root: root.into(),
            save_metadata,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.storage_path, config.save_metadata)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn store(
        &self,
        artifact: &CaptureArtifact,
        category: UploadCategory,
    ) -> std::io::Result<PathBuf> {
        let dir = self.root.join(category.as_str());
        fs::create_dir_all(&dir).await?;

        let path = dir.join(&artifact.suggested_filename);
        fs::write(&path, &artifact.bytes).await?;
        debug!("Wrote {} bytes to {}", artifact.len(), path.display());

        if self.save_metadata {
            let metadata = ArtifactMetadata::from_artifact(artifact, category.as_str());
            if let Err(e) = save_metadata(&metadata, &dir).await {
                warn!("Stored {} without metadata: {}", artifact.id, e);
            }
        }

        fs::canonicalize(&path).await
    }
}

#[async_trait]
impl UploadService for LocalUploadService {
    async fn upload(&self, artifact: &CaptureArtifact, category: UploadCategory) -> Option<String> {
        if artifact.is_empty() {
            warn!("Refusing to upload empty artifact {}", artifact.id);
            return None;
        }

        match self.store(artifact, category).await {
            Ok(path) => {
                let url = format!("file://{}", path.display());
                info!("Uploaded {} to {}", artifact.id, url);
                Some(url)
            }
            Err(e) => {
                error!(
                    "Failed to store {} under {}: {}",
                    artifact.id,
                    self.root.display(),
                    e
                );
                None
            }
        }
    }
}
