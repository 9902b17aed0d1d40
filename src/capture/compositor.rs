use super::artifact::{
    extension_for_mime, resolve_timezone, suggested_filename, AppliedEffects, ArtifactKind,
    CaptureArtifact,
};
use super::color::FilterDefinition;
use super::encode::{data_url, encode_jpeg, JPEG_MIME};
use super::mask::{MaskDefinition, MaskLoader};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::{Facing, FrameData};
use crate::overlay::SharedOverlay;

use bytes::Bytes;
use chrono::Utc;
use chrono_tz::Tz;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a still capture flattens together
pub struct PhotoRequest<'a> {
    pub frame: &'a FrameData,
    pub facing: Facing,
    pub filter: &'a FilterDefinition,
    /// Live AR surface; read once, never written
    pub overlay: Option<&'a SharedOverlay>,
    pub ar_filter: Option<&'a str>,
    pub mask: Option<&'a MaskDefinition>,
}

/// Fit a layer to the output buffer
fn fit_to(layer: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if layer.dimensions() == (width, height) {
        layer.clone()
    } else {
        imageops::resize(layer, width, height, FilterType::Triangle)
    }
}

/// Flatten the capture layers at the frame's native size.
///
/// The color filter touches the base frame only. The AR layer is drawn in
/// unmirrored coordinates, then base and AR are mirrored together when
/// `mirrored`. The mask goes on last, never mirrored.
pub fn compose(
    frame: &RgbaImage,
    filter: &FilterDefinition,
    overlay: Option<&RgbaImage>,
    mirrored: bool,
    mask: Option<&RgbaImage>,
) -> RgbaImage {
    let (width, height) = frame.dimensions();
    let mut output = filter.apply(frame);

    if let Some(overlay) = overlay {
        imageops::overlay(&mut output, &fit_to(overlay, width, height), 0, 0);
    }

    if mirrored {
        imageops::flip_horizontal_in_place(&mut output);
    }

    if let Some(mask) = mask {
        imageops::overlay(&mut output, &fit_to(mask, width, height), 0, 0);
    }

    output
}

/// Produces still artifacts from the live frame or an imported file
pub struct CaptureCompositor {
    config: CaptureConfig,
    mask_loader: Arc<dyn MaskLoader>,
    timezone: Tz,
}

impl CaptureCompositor {
    pub fn new(config: CaptureConfig, mask_loader: Arc<dyn MaskLoader>) -> Self {
        let timezone = resolve_timezone(&config.filename_timezone);
        Self {
            config,
            mask_loader,
            timezone,
        }
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    /// Best-effort mask load; failures are logged and the layer skipped
    async fn load_mask(&self, mask: Option<&MaskDefinition>) -> Option<RgbaImage> {
        let asset = mask.and_then(|mask| mask.asset)?;
        match self.mask_loader.load(asset).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Capturing without mask layer: {}", e);
                None
            }
        }
    }

    pub async fn capture_photo(
        &self,
        request: PhotoRequest<'_>,
    ) -> Result<CaptureArtifact, CaptureError> {
        let (width, height) = request.frame.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::NoFrame);
        }

        let overlay = match (request.ar_filter, request.overlay) {
            (Some(_), Some(surface)) => Some(surface.read().snapshot()),
            _ => None,
        };
        let mask_image = self.load_mask(request.mask).await;
        let mirrored = request.facing.is_mirrored();

        let composed = compose(
            &request.frame.pixels,
            request.filter,
            overlay.as_ref(),
            mirrored,
            mask_image.as_ref(),
        );

        let encoded = encode_jpeg(&composed, self.config.jpeg_quality)?;
        let preview = data_url(JPEG_MIME, &encoded);
        let created_at = Utc::now();

        let artifact = CaptureArtifact {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ArtifactKind::Image,
            mime_type: JPEG_MIME.to_string(),
            suggested_filename: suggested_filename(created_at, &self.timezone, "jpg"),
            created_at,
            width,
            height,
            duration: None,
            preview: Some(preview),
            effects: AppliedEffects {
                color_filter: request.filter.id.to_string(),
                mask: mask_image
                    .as_ref()
                    .and(request.mask)
                    .map(|mask| mask.id.to_string()),
                ar_filter: overlay
                    .as_ref()
                    .and(request.ar_filter)
                    .map(ToString::to_string),
                mirrored,
            },
            bytes: Bytes::from(encoded),
        };

        info!(
            "Captured photo {} ({}x{}, filter {}, {} bytes)",
            artifact.id,
            width,
            height,
            request.filter.id,
            artifact.len()
        );
        Ok(artifact)
    }

    /// Artifact from a file picked outside the live camera
    pub fn import_file(
        &self,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<CaptureArtifact, CaptureError> {
        if data.is_empty() {
            return Err(CaptureError::Import {
                details: "file is empty".to_string(),
            });
        }

        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        let kind = if essence.starts_with("image/") {
            ArtifactKind::Image
        } else if essence.starts_with("video/") {
            ArtifactKind::Video
        } else {
            return Err(CaptureError::Import {
                details: format!("unsupported media type '{}'", mime_type),
            });
        };

        let (width, height, preview) = match kind {
            ArtifactKind::Image => {
                let decoded = image::load_from_memory(&data).map_err(|e| CaptureError::Import {
                    details: format!("image could not be decoded: {}", e),
                })?;
                let rgba = decoded.to_rgba8();
                (rgba.width(), rgba.height(), Some(data_url(essence, &data)))
            }
            ArtifactKind::Video => (0, 0, None),
        };

        let created_at = Utc::now();
        let artifact = CaptureArtifact {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            mime_type: essence.to_string(),
            suggested_filename: suggested_filename(
                created_at,
                &self.timezone,
                extension_for_mime(essence),
            ),
            created_at,
            width,
            height,
            duration: None,
            preview,
            effects: AppliedEffects {
                color_filter: "normal".to_string(),
                ..AppliedEffects::default()
            },
            bytes: Bytes::from(data),
        };

        debug!(
            "Imported {} as {:?} artifact {}",
            artifact.mime_type, artifact.kind, artifact.id
        );
        Ok(artifact)
    }
}
