use super::encode::encode_jpeg;
use super::recorder::{EncoderSession, RecorderBackend};
use crate::camera::StreamSettings;
use crate::config::EncodingProfile;
use crate::error::RecordingError;
use crate::frame::FrameData;

use bytes::{Bytes, BytesMut};
use tracing::trace;

pub const MOTION_JPEG_MIME: &str = "video/x-motion-jpeg";

/// Always-available encoder: back-to-back JPEG frames.
///
/// It has no rate control, so any profile carrying bitrates is rejected and
/// only the no-options default opens.
pub struct MjpegRecorderBackend {
    quality: u8,
}

impl MjpegRecorderBackend {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }
}

impl RecorderBackend for MjpegRecorderBackend {
    fn name(&self) -> &str {
        "mjpeg"
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_type
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(MOTION_JPEG_MIME))
    }

    fn open(
        &self,
        profile: &EncodingProfile,
        _settings: &StreamSettings,
        _has_audio: bool,
    ) -> Result<Box<dyn EncoderSession>, RecordingError> {
        if let Some(mime_type) = &profile.mime_type {
            if !self.is_type_supported(mime_type) {
                return Err(RecordingError::ProfileRejected {
                    details: format!("{} is not supported", mime_type),
                });
            }
        }
        if profile.has_bitrates() {
            return Err(RecordingError::ProfileRejected {
                details: "motion JPEG has no bitrate control".to_string(),
            });
        }

        Ok(Box::new(MjpegSession {
            quality: self.quality,
            pending: BytesMut::new(),
            frames: 0,
        }))
    }
}

struct MjpegSession {
    quality: u8,
    pending: BytesMut,
    frames: u64,
}

impl EncoderSession for MjpegSession {
    fn mime_type(&self) -> &str {
        MOTION_JPEG_MIME
    }

    fn push_frame(&mut self, frame: &FrameData) -> Result<(), RecordingError> {
        let jpeg = encode_jpeg(&frame.pixels, self.quality).map_err(|e| RecordingError::Encoder {
            details: e.to_string(),
        })?;
        self.pending.extend_from_slice(&jpeg);
        self.frames += 1;
        trace!("Encoded frame {} ({} bytes)", frame.id, jpeg.len());
        Ok(())
    }

    fn flush(&mut self) -> Result<Option<Bytes>, RecordingError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.pending.split().freeze()))
    }

    fn finish(mut self: Box<Self>) -> Result<Option<Bytes>, RecordingError> {
        trace!("Motion JPEG session finished after {} frames", self.frames);
        self.flush()
    }
}
