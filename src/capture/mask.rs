use crate::config::CaptureConfig;
use crate::error::CaptureError;
use async_trait::async_trait;
use image::RgbaImage;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Full-frame decorative image, unrelated to face tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub glyph: &'static str,
    /// Asset reference under the mask root; `None` for the empty mask
    pub asset: Option<&'static str>,
}

pub static MASKS: [MaskDefinition; 5] = [
    MaskDefinition {
        id: "none",
        name: "None",
        glyph: "🚫",
        asset: None,
    },
    MaskDefinition {
        id: "hearts",
        name: "Hearts",
        glyph: "💕",
        asset: Some("hearts.png"),
    },
    MaskDefinition {
        id: "frame",
        name: "Frame",
        glyph: "🖼️",
        asset: Some("frame.png"),
    },
    MaskDefinition {
        id: "sparkle",
        name: "Sparkle",
        glyph: "✨",
        asset: Some("sparkle.png"),
    },
    MaskDefinition {
        id: "cat",
        name: "Cat",
        glyph: "🐱",
        asset: Some("cat.png"),
    },
];

pub fn masks() -> &'static [MaskDefinition] {
    &MASKS
}

pub fn mask(id: &str) -> Option<&'static MaskDefinition> {
    MASKS.iter().find(|mask| mask.id == id)
}

/// Loads mask images for the compositor
#[async_trait]
pub trait MaskLoader: Send + Sync {
    async fn load(&self, asset: &str) -> Result<RgbaImage, CaptureError>;
}

/// Reads PNG/JPEG masks from a directory.
///
/// Only `file` references that stay inside the root are served; anything
/// else is refused. Each load is bounded by a timeout.
pub struct AssetMaskLoader {
    root: PathBuf,
    timeout: Duration,
}

impl AssetMaskLoader {
    pub fn new<P: Into<PathBuf>>(root: P, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(
            &config.mask_root,
            Duration::from_millis(config.mask_load_timeout_ms),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn refused(asset: &str, reason: &str) -> CaptureError {
        CaptureError::MaskRefused {
            asset: asset.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Lexical checks that need no filesystem access
    fn relative_path(asset: &str) -> Result<PathBuf, CaptureError> {
        let reference = match asset.split_once("://") {
            Some(("file", rest)) => rest,
            Some((scheme, _)) => {
                return Err(Self::refused(
                    asset,
                    &format!("scheme '{}' is not served", scheme),
                ))
            }
            None => asset,
        };

        let path = Path::new(reference);
        if path.is_absolute() {
            return Err(Self::refused(asset, "absolute paths are not served"));
        }
        if path
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
        {
            return Err(Self::refused(asset, "path escapes the mask root"));
        }
        Ok(path.to_path_buf())
    }

    async fn resolve(&self, asset: &str) -> Result<PathBuf, CaptureError> {
        let relative = Self::relative_path(asset)?;

        let load_error = |details: String| CaptureError::MaskLoad {
            asset: asset.to_string(),
            details,
        };

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| load_error(format!("mask root {}: {}", self.root.display(), e)))?;
        let candidate = tokio::fs::canonicalize(root.join(&relative))
            .await
            .map_err(|e| load_error(e.to_string()))?;

        // symlinks may still point outside the root
        if !candidate.starts_with(&root) {
            return Err(Self::refused(asset, "path escapes the mask root"));
        }
        Ok(candidate)
    }

    async fn read_and_decode(&self, asset: &str) -> Result<RgbaImage, CaptureError> {
        let path = self.resolve(asset).await?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| CaptureError::MaskLoad {
                asset: asset.to_string(),
                details: e.to_string(),
            })?;

        let image = image::load_from_memory(&data).map_err(|e| CaptureError::MaskLoad {
            asset: asset.to_string(),
            details: format!("decode failed: {}", e),
        })?
        .to_rgba8();

        debug!("Loaded mask {} ({}x{})", path.display(), image.width(), image.height());
        Ok(image)
    }
}

#[async_trait]
impl MaskLoader for AssetMaskLoader {
    async fn load(&self, asset: &str) -> Result<RgbaImage, CaptureError> {
        tokio::time::timeout(self.timeout, self.read_and_decode(asset))
            .await
            .map_err(|_| CaptureError::MaskTimeout {
                asset: asset.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
    }
}
