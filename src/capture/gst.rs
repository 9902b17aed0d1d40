use super::recorder::{EncoderSession, RecorderBackend};
use crate::camera::StreamSettings;
use crate::config::EncodingProfile;
use crate::error::{ClubcamError, RecordingError, Result};
use crate::frame::FrameData;

use bytes::{Bytes, BytesMut};
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::{AppSink, AppSrc};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Video-only container/codec pairs this backend can build, with the
/// elements they need
struct Codec {
    mime_type: &'static str,
    encoder: &'static str,
    muxer: &'static str,
}

const CODECS: [Codec; 4] = [
    Codec {
        mime_type: "video/webm;codecs=vp9",
        encoder: "vp9enc",
        muxer: "webmmux",
    },
    Codec {
        mime_type: "video/webm;codecs=vp8",
        encoder: "vp8enc",
        muxer: "webmmux",
    },
    Codec {
        mime_type: "video/webm",
        encoder: "vp8enc",
        muxer: "webmmux",
    },
    Codec {
        mime_type: "video/mp4",
        encoder: "x264enc",
        muxer: "mp4mux",
    },
];

fn normalize(mime_type: &str) -> String {
    mime_type
        .split(';')
        .map(|part| part.trim().to_ascii_lowercase().replace(' ', ""))
        .collect::<Vec<_>>()
        .join(";")
}

fn element_available(name: &str) -> bool {
    gstreamer::ElementFactory::find(name).is_some()
}

/// Encodes the raw RGBA feed through GStreamer appsrc/appsink pipelines
pub struct GstRecorderBackend;

impl GstRecorderBackend {
    pub fn new() -> Result<Self> {
        gstreamer::init().map_err(|e| {
            ClubcamError::component("recorder", &format!("Failed to initialize GStreamer: {}", e))
        })?;
        Ok(Self)
    }

    fn codec_for(&self, mime_type: &str) -> Option<&'static Codec> {
        let wanted = normalize(mime_type);
        CODECS.iter().find(|codec| {
            normalize(codec.mime_type) == wanted
                && element_available(codec.encoder)
                && element_available(codec.muxer)
        })
    }

    fn pipeline_description(
        codec: &Codec,
        profile: &EncodingProfile,
        settings: &StreamSettings,
    ) -> String {
        let encoder = match (codec.encoder, profile.video_bits_per_second) {
            ("x264enc", Some(bps)) => format!(
                "x264enc speed-preset=ultrafast tune=zerolatency bitrate={}",
                (bps / 1000).max(1)
            ),
            ("x264enc", None) => "x264enc speed-preset=ultrafast tune=zerolatency".to_string(),
            (name, Some(bps)) => format!("{} deadline=1 target-bitrate={}", name, bps),
            (name, None) => format!("{} deadline=1", name),
        };
        let muxer = if codec.muxer == "webmmux" {
            "webmmux streamable=true"
        } else {
            "mp4mux fragment-duration=1000"
        };

        format!(
            "appsrc name=src format=time is-live=true do-timestamp=false \
             caps=video/x-raw,format=RGBA,width={},height={},framerate={}/1 ! \
             videoconvert ! video/x-raw,format=I420 ! \
             {} ! \
             {} ! \
             appsink name=sink sync=false",
            settings.width,
            settings.height,
            settings.fps.max(1),
            encoder,
            muxer
        )
    }
}

impl RecorderBackend for GstRecorderBackend {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.codec_for(mime_type).is_some()
    }

    fn open(
        &self,
        profile: &EncodingProfile,
        settings: &StreamSettings,
        has_audio: bool,
    ) -> std::result::Result<Box<dyn EncoderSession>, RecordingError> {
        let codec = match &profile.mime_type {
            Some(mime_type) => self.codec_for(mime_type),
            None => CODECS
                .iter()
                .find(|codec| element_available(codec.encoder) && element_available(codec.muxer)),
        }
        .ok_or_else(|| RecordingError::ProfileRejected {
            details: format!("no GStreamer elements for {:?}", profile.mime_type),
        })?;

        if has_audio {
            debug!("Audio track present; {} clips carry video only", codec.mime_type);
        }

        let description = Self::pipeline_description(codec, profile, settings);
        debug!("Recording pipeline: {}", description);

        let rejected = |details: String| RecordingError::ProfileRejected { details };

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| rejected(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| rejected("Failed to downcast to Pipeline".to_string()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| rejected("Failed to get appsrc element".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| rejected("Failed to downcast to AppSrc".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| rejected("Failed to get appsink element".to_string()))?
            .downcast::<AppSink>()
            .map_err(|_| rejected("Failed to downcast to AppSink".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| rejected(format!("Failed to start pipeline: {}", e)))?;

        info!("Started GStreamer recording pipeline ({})", codec.mime_type);

        Ok(Box::new(GstSession {
            mime_type: codec.mime_type,
            pipeline,
            appsrc,
            appsink,
            base_time: None,
            frame_duration: Duration::from_secs(1) / settings.fps.max(1),
            frames: 0,
        }))
    }
}

struct GstSession {
    mime_type: &'static str,
    pipeline: Pipeline,
    appsrc: AppSrc,
    appsink: AppSink,
    base_time: Option<SystemTime>,
    frame_duration: Duration,
    frames: u64,
}

fn encoder_error(details: String) -> RecordingError {
    RecordingError::Encoder { details }
}

impl GstSession {
    /// Drain every sample the muxer has produced so far
    fn drain(&self) -> std::result::Result<Option<Bytes>, RecordingError> {
        let mut chunk = BytesMut::new();
        while let Some(sample) = self.appsink.try_pull_sample(gstreamer::ClockTime::ZERO) {
            let Some(buffer) = sample.buffer() else {
                continue;
            };
            let map = buffer
                .map_readable()
                .map_err(|e| encoder_error(format!("Failed to map sample: {}", e)))?;
            chunk.extend_from_slice(map.as_slice());
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk.freeze()))
        }
    }
}

impl EncoderSession for GstSession {
    fn mime_type(&self) -> &str {
        self.mime_type
    }

    fn push_frame(&mut self, frame: &FrameData) -> std::result::Result<(), RecordingError> {
        let base_time = *self.base_time.get_or_insert(frame.timestamp);
        let relative = frame
            .timestamp
            .duration_since(base_time)
            .unwrap_or(Duration::ZERO);

        let mut buffer = gstreamer::Buffer::from_slice(frame.pixels.as_raw().clone());
        {
            let buffer_ref = buffer
                .get_mut()
                .ok_or_else(|| encoder_error("Buffer is not writable".to_string()))?;
            buffer_ref.set_pts(gstreamer::ClockTime::from_nseconds(relative.as_nanos() as u64));
            buffer_ref.set_duration(gstreamer::ClockTime::from_nseconds(
                self.frame_duration.as_nanos() as u64,
            ));
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| encoder_error(format!("Failed to push buffer: {:?}", e)))?;

        self.frames += 1;
        if self.frames % 30 == 0 {
            debug!("Pushed {} frames to {}", self.frames, self.mime_type);
        }
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<Option<Bytes>, RecordingError> {
        self.drain()
    }

    fn finish(self: Box<Self>) -> std::result::Result<Option<Bytes>, RecordingError> {
        self.appsrc
            .end_of_stream()
            .map_err(|e| encoder_error(format!("Failed to signal EOS: {:?}", e)))?;

        let mut tail = BytesMut::new();
        if let Some(bus) = self.pipeline.bus() {
            for msg in bus.iter_timed(gstreamer::ClockTime::from_seconds(10)) {
                match msg.view() {
                    gstreamer::MessageView::Eos(..) => break,
                    gstreamer::MessageView::Error(err) => {
                        let details = format!(
                            "Recording pipeline error: {} ({})",
                            err.error(),
                            err.debug().unwrap_or_default()
                        );
                        let _ = self.pipeline.set_state(gstreamer::State::Null);
                        return Err(encoder_error(details));
                    }
                    _ => {}
                }
            }
        } else {
            warn!("Recording pipeline has no bus; clip may be truncated");
        }

        if let Some(chunk) = self.drain()? {
            tail.extend_from_slice(&chunk);
        }

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| encoder_error(format!("Failed to stop pipeline: {}", e)))?;

        info!(
            "GStreamer recording finished: {} frames ({})",
            self.frames, self.mime_type
        );

        if tail.is_empty() {
            Ok(None)
        } else {
            Ok(Some(tail.freeze()))
        }
    }
}

impl Drop for GstSession {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_labels_match_video_only_pipelines() {
        let profile = EncodingProfile::new("video/webm").with_bitrates(2_500_000, 128_000);
        let settings = StreamSettings {
            width: 64,
            height: 48,
            fps: 10,
        };

        for codec in &CODECS {
            assert!(!codec.mime_type.contains("opus"), "{}", codec.mime_type);
            let description = GstRecorderBackend::pipeline_description(codec, &profile, &settings);
            assert!(description.contains(codec.encoder));
            assert!(!description.contains("audio"), "{}", description);
        }
    }
}
