use super::stream::{MediaDevices, MediaStream, PlatformMediaError, StreamConstraints};
use crate::config::CameraConfig;
use crate::error::AcquisitionError;
use crate::frame::Facing;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns the session's single live stream.
///
/// Opening a stream always releases the previous one first, so at most one
/// stream's tracks are live at any point.
pub struct MediaAcquisitionManager {
    devices: Arc<dyn MediaDevices>,
    config: CameraConfig,
    active: Option<MediaStream>,
}

impl MediaAcquisitionManager {
    pub fn new(devices: Arc<dyn MediaDevices>, config: CameraConfig) -> Self {
        Self {
            devices,
            config,
            active: None,
        }
    }

    /// Constraints requested for a facing: capped resolution, audio per config
    pub fn constraints_for(&self, facing: Facing) -> StreamConstraints {
        StreamConstraints {
            facing,
            max_width: self.config.max_resolution.0,
            max_height: self.config.max_resolution.1,
            fps: self.config.fps,
            audio: self.config.audio,
        }
    }

    /// Acquire a stream for `facing`
    pub async fn open(&mut self, facing: Facing) -> Result<MediaStream, AcquisitionError> {
        self.open_cancellable(facing, &CancellationToken::new())
            .await
    }

    /// Acquire a stream, giving up if `cancel` fires during the permission wait
    pub async fn open_cancellable(
        &mut self,
        facing: Facing,
        cancel: &CancellationToken,
    ) -> Result<MediaStream, AcquisitionError> {
        self.close();

        let constraints = self.constraints_for(facing);
        info!(
            "Requesting {} camera stream (max {}x{} @ {}fps, audio: {})",
            facing, constraints.max_width, constraints.max_height, constraints.fps, constraints.audio
        );

        let devices = Arc::clone(&self.devices);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Camera acquisition cancelled while waiting for the platform");
                return Err(AcquisitionError::Cancelled);
            }
            result = devices.get_user_media(&constraints) => result,
        };

        match result {
            Ok(stream) => {
                if cancel.is_cancelled() {
                    Self::close_stream(Some(&stream));
                    return Err(AcquisitionError::Cancelled);
                }

                let settings = stream.settings();
                info!(
                    "Camera stream {} acquired: {}x{} @ {}fps",
                    stream.id(),
                    settings.width,
                    settings.height,
                    settings.fps
                );
                self.active = Some(stream.clone());
                Ok(stream)
            }
            Err(e) => {
                let error = classify_platform_error(&e);
                warn!("Camera acquisition failed ({}): {}", e, error);
                Err(error)
            }
        }
    }

    /// Release the active stream, if any. Idempotent.
    pub fn close(&mut self) {
        match self.active.take() {
            Some(stream) => {
                info!("Releasing camera stream {}", stream.id());
                Self::close_stream(Some(&stream));
            }
            None => debug!("No active camera stream to release"),
        }
    }

    /// Stop every track of `stream`; safe on an absent or already closed stream
    pub fn close_stream(stream: Option<&MediaStream>) {
        if let Some(stream) = stream {
            stream.stop_all_tracks();
        }
    }

    /// Best-effort torch control; returns whether the torch state was applied
    pub fn set_torch(&self, on: bool) -> bool {
        let applied = self
            .active
            .as_ref()
            .and_then(|stream| stream.video_track())
            .map(|track| track.apply_torch(on))
            .unwrap_or(false);

        if !applied {
            debug!("Torch not available on the active video track; ignoring");
        }
        applied
    }

    pub fn active_stream(&self) -> Option<&MediaStream> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active
            .as_ref()
            .map(MediaStream::is_active)
            .unwrap_or(false)
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl Drop for MediaAcquisitionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a platform error name onto an actionable acquisition error
pub fn classify_platform_error(error: &PlatformMediaError) -> AcquisitionError {
    match error.name.as_str() {
        "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
            AcquisitionError::PermissionDenied
        }
        "NotFoundError" | "DevicesNotFoundError" => AcquisitionError::DeviceNotFound,
        "NotReadableError" | "TrackStartError" | "AbortError" => AcquisitionError::DeviceBusy,
        "NotSupportedError" | "TypeError" => AcquisitionError::Unsupported,
        _ => AcquisitionError::Configuration {
            details: error.to_string(),
        },
    }
}
