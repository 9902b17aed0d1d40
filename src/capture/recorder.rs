use super::artifact::{
    extension_for_mime, resolve_timezone, suggested_filename, AppliedEffects, ArtifactKind,
    CaptureArtifact,
};
use crate::camera::{MediaStream, StreamSettings};
use crate::config::{CaptureConfig, EncodingProfile};
use crate::error::RecordingError;
use crate::events::{EventBus, SessionEvent};
use crate::frame::FrameData;

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One open encoder, fed frames until finished
pub trait EncoderSession: Send {
    /// Negotiated container/codec
    fn mime_type(&self) -> &str;

    fn push_frame(&mut self, frame: &FrameData) -> Result<(), RecordingError>;

    /// Hand over whatever has been encoded since the last flush
    fn flush(&mut self) -> Result<Option<Bytes>, RecordingError>;

    /// Close the container and return the trailing data
    fn finish(self: Box<Self>) -> Result<Option<Bytes>, RecordingError>;
}

/// Platform encoder capability
pub trait RecorderBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Open an encoder for `profile`. Configured bitrates the backend cannot
    /// honor are reported as `ProfileRejected`.
    fn open(
        &self,
        profile: &EncodingProfile,
        settings: &StreamSettings,
        has_audio: bool,
    ) -> Result<Box<dyn EncoderSession>, RecordingError>;
}

/// Walk the preference list, then the no-options default
pub fn negotiate(
    backend: &dyn RecorderBackend,
    preferences: &[EncodingProfile],
    settings: &StreamSettings,
    has_audio: bool,
) -> Result<Box<dyn EncoderSession>, RecordingError> {
    for profile in preferences {
        if let Some(mime_type) = &profile.mime_type {
            if !backend.is_type_supported(mime_type) {
                debug!("{} does not support {}", backend.name(), mime_type);
                continue;
            }
        }

        match backend.open(profile, settings, has_audio) {
            Ok(session) => {
                info!(
                    "Negotiated {} on {} backend",
                    session.mime_type(),
                    backend.name()
                );
                return Ok(session);
            }
            Err(RecordingError::ProfileRejected { details }) => {
                debug!("Profile {:?} rejected: {}", profile.mime_type, details);
            }
            Err(e) => {
                warn!("Failed to open encoder for {:?}: {}", profile.mime_type, e);
            }
        }
    }

    match backend.open(&EncodingProfile::platform_default(), settings, has_audio) {
        Ok(session) => {
            info!(
                "Negotiated platform default {} on {} backend",
                session.mime_type(),
                backend.name()
            );
            Ok(session)
        }
        Err(e) => {
            error!("No encoding available on {} backend: {}", backend.name(), e);
            Err(RecordingError::NoSupportedEncoding)
        }
    }
}

/// Finished clip plus how it ended
#[derive(Debug)]
pub struct RecordingOutcome {
    pub artifact: CaptureArtifact,
    pub auto_stopped: bool,
    pub chunks: usize,
}

/// Starts bounded recordings of the raw stream
pub struct Recorder {
    config: CaptureConfig,
    backend: Arc<dyn RecorderBackend>,
    timezone: Tz,
    event_bus: Option<Arc<EventBus>>,
}

impl Recorder {
    pub fn new(config: CaptureConfig, backend: Arc<dyn RecorderBackend>) -> Self {
        let timezone = resolve_timezone(&config.filename_timezone);
        Self {
            config,
            backend,
            timezone,
            event_bus: None,
        }
    }

    /// Publish `RecordingStopped` from the recording task when a clip is done
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.config.max_recording_seconds as u64)
    }

    /// Negotiate an encoding and start the recording task.
    ///
    /// The task ends on `stop`, at the maximum duration, when the stream
    /// stops producing frames, or when `parent` is cancelled. Cancellation
    /// discards the clip.
    pub fn start(
        &self,
        stream: &MediaStream,
        parent: &CancellationToken,
    ) -> Result<RecordingHandle, RecordingError> {
        let settings = stream.settings();
        let session = negotiate(
            self.backend.as_ref(),
            &self.config.encoding_preferences,
            &settings,
            stream.has_audio(),
        )?;
        let mime_type = session.mime_type().to_string();

        let cancel = parent.child_token();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (elapsed_tx, elapsed_rx) = watch::channel(Duration::ZERO);
        let chunks_flushed = Arc::new(AtomicUsize::new(0));

        let task = RecordingTask {
            session,
            frames: stream.frames(),
            settings,
            max_duration: self.max_duration(),
            chunk_interval: Duration::from_millis(self.config.chunk_interval_ms.max(1)),
            heartbeat: Duration::from_millis(self.config.heartbeat_ms.max(1)),
            elapsed: elapsed_tx,
            chunks_flushed: Arc::clone(&chunks_flushed),
            timezone: self.timezone,
            event_bus: self.event_bus.clone(),
        };
        let join = tokio::spawn(task.run(cancel.clone(), stop_rx));

        info!(
            "Recording started ({}, max {}s)",
            mime_type, self.config.max_recording_seconds
        );

        Ok(RecordingHandle {
            mime_type,
            elapsed: elapsed_rx,
            chunks_flushed,
            stop_tx: Some(stop_tx),
            task: Some(join),
            cancel,
        })
    }
}

/// Live recording owned by the session controller.
///
/// Dropping the handle cancels the recording and its timers.
pub struct RecordingHandle {
    mime_type: String,
    elapsed: watch::Receiver<Duration>,
    chunks_flushed: Arc<AtomicUsize>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<RecordingOutcome, RecordingError>>>,
    cancel: CancellationToken,
}

impl RecordingHandle {
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Last heartbeat value
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.borrow()
    }

    pub fn subscribe_elapsed(&self) -> watch::Receiver<Duration> {
        self.elapsed.clone()
    }

    pub fn chunks_flushed(&self) -> usize {
        self.chunks_flushed.load(Ordering::SeqCst)
    }

    /// True once the task has ended on its own (auto-stop or stream end)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Request a stop and wait for the clip
    pub async fn stop(mut self) -> Result<RecordingOutcome, RecordingError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // already finished when the receiver is gone
            let _ = stop_tx.send(());
        }

        let task = self.task.take().ok_or(RecordingError::NotRecording)?;
        task.await.map_err(|e| RecordingError::Task {
            details: e.to_string(),
        })?
    }

    /// Tear down without producing a clip
    pub async fn abort(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!("Recording aborted");
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct RecordingTask {
    session: Box<dyn EncoderSession>,
    frames: watch::Receiver<Option<FrameData>>,
    settings: StreamSettings,
    max_duration: Duration,
    chunk_interval: Duration,
    heartbeat: Duration,
    elapsed: watch::Sender<Duration>,
    chunks_flushed: Arc<AtomicUsize>,
    timezone: Tz,
    event_bus: Option<Arc<EventBus>>,
}

impl RecordingTask {
    async fn run(
        mut self,
        cancel: CancellationToken,
        mut stop_rx: oneshot::Receiver<()>,
    ) -> Result<RecordingOutcome, RecordingError> {
        let started = Instant::now();
        let deadline = tokio::time::sleep_until(started + self.max_duration);
        tokio::pin!(deadline);

        let mut flush_timer = interval_at(started + self.chunk_interval, self.chunk_interval);
        flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heartbeat = interval_at(started + self.heartbeat, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut chunks: Vec<Bytes> = Vec::new();

        let current = self.frames.borrow_and_update().clone();
        if let Some(frame) = current {
            self.session.push_frame(&frame)?;
        }

        let auto_stopped = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Recording cancelled, discarding {} chunks", chunks.len());
                    return Err(RecordingError::Cancelled);
                }
                _ = &mut stop_rx => {
                    debug!("Recording stop requested");
                    break false;
                }
                _ = &mut deadline => {
                    info!(
                        "Recording reached the {}s limit, stopping",
                        self.max_duration.as_secs()
                    );
                    break true;
                }
                _ = flush_timer.tick() => {
                    if let Some(chunk) = self.session.flush()? {
                        if !chunk.is_empty() {
                            chunks.push(chunk);
                            self.chunks_flushed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    let _ = self.elapsed.send(started.elapsed().min(self.max_duration));
                }
                changed = self.frames.changed() => {
                    if changed.is_err() {
                        warn!("Stream ended during recording");
                        break false;
                    }
                    let frame = self.frames.borrow_and_update().clone();
                    if let Some(frame) = frame {
                        self.session.push_frame(&frame)?;
                    }
                }
            }
        };

        let duration = started.elapsed().min(self.max_duration);
        let _ = self.elapsed.send(duration);

        let mime_type = self.session.mime_type().to_string();
        let session = self.session;
        let trailing = tokio::task::spawn_blocking(move || session.finish())
            .await
            .map_err(|e| RecordingError::Task {
                details: e.to_string(),
            })??;
        if let Some(chunk) = trailing {
            if !chunk.is_empty() {
                chunks.push(chunk);
                self.chunks_flushed.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut clip = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            clip.extend_from_slice(chunk);
        }

        let created_at = Utc::now();
        let artifact = CaptureArtifact {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ArtifactKind::Video,
            bytes: clip.freeze(),
            suggested_filename: suggested_filename(
                created_at,
                &self.timezone,
                extension_for_mime(&mime_type),
            ),
            mime_type,
            created_at,
            width: self.settings.width,
            height: self.settings.height,
            duration: Some(duration),
            preview: None,
            effects: AppliedEffects {
                color_filter: "normal".to_string(),
                ..AppliedEffects::default()
            },
        };

        info!(
            "Recording finished: {:.1}s, {} chunks, {} bytes{}",
            duration.as_secs_f32(),
            chunks.len(),
            artifact.len(),
            if auto_stopped { " (auto-stopped)" } else { "" }
        );

        if let Some(event_bus) = &self.event_bus {
            event_bus.notify(SessionEvent::RecordingStopped {
                duration,
                auto_stopped,
            });
        }

        Ok(RecordingOutcome {
            artifact,
            auto_stopped,
            chunks: chunks.len(),
        })
    }
}
