use crate::frame::{Facing, FrameData};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Constraints sent to the platform when requesting a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: Facing,
    /// Resolution cap; the platform may deliver anything up to this
    pub max_width: u32,
    pub max_height: u32,
    pub fps: u32,
    pub audio: bool,
}

/// Negotiated stream properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Raw failure reported by the platform media layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformMediaError {
    /// Platform error name, e.g. `NotAllowedError`
    pub name: String,
    pub message: String,
}

impl PlatformMediaError {
    pub fn new<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PlatformMediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for PlatformMediaError {}

/// Platform capability that hands out camera/microphone streams
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a combined stream. May wait indefinitely on a permission prompt.
    async fn get_user_media(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream, PlatformMediaError>;
}

/// One audio or video track of a stream
pub struct MediaTrack {
    kind: TrackKind,
    label: String,
    live: AtomicBool,
    torch_capable: bool,
    torch: AtomicBool,
    live_counter: Option<Arc<AtomicUsize>>,
}

impl MediaTrack {
    pub fn new<S: Into<String>>(kind: TrackKind, label: S, torch_capable: bool) -> Self {
        Self {
            kind,
            label: label.into(),
            live: AtomicBool::new(true),
            torch_capable,
            torch: AtomicBool::new(false),
            live_counter: None,
        }
    }

    /// Track the number of live tracks in a shared counter owned by the device
    pub fn with_live_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        self.live_counter = Some(counter);
        self
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn supports_torch(&self) -> bool {
        self.torch_capable && self.kind == TrackKind::Video
    }

    pub fn torch_enabled(&self) -> bool {
        self.torch.load(Ordering::SeqCst)
    }

    /// Returns false when the track cannot drive a torch
    pub(crate) fn apply_torch(&self, on: bool) -> bool {
        if !self.supports_torch() || !self.is_live() {
            return false;
        }
        self.torch.store(on, Ordering::SeqCst);
        true
    }

    /// Stop the track; repeated calls are no-ops
    pub(crate) fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.torch.store(false, Ordering::SeqCst);
            if let Some(counter) = &self.live_counter {
                counter.fetch_sub(1, Ordering::SeqCst);
            }
            debug!("Stopped {:?} track '{}'", self.kind, self.label);
        }
    }
}

struct StreamInner {
    id: String,
    facing: Facing,
    settings: StreamSettings,
    tracks: Vec<MediaTrack>,
    frames: watch::Receiver<Option<FrameData>>,
    producer: CancellationToken,
}

/// Read-only handle to a live camera/microphone stream.
///
/// Clones share the same tracks. Only the acquisition manager stops them.
#[derive(Clone)]
pub struct MediaStream {
    inner: Arc<StreamInner>,
}

impl MediaStream {
    /// Assemble a stream from its tracks and the frame channel feeding it.
    /// `producer` is cancelled when the tracks stop.
    pub fn new(
        facing: Facing,
        settings: StreamSettings,
        tracks: Vec<MediaTrack>,
        frames: watch::Receiver<Option<FrameData>>,
        producer: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id: uuid::Uuid::new_v4().to_string(),
                facing,
                settings,
                tracks,
                frames,
                producer,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn facing(&self) -> Facing {
        self.inner.facing
    }

    pub fn settings(&self) -> StreamSettings {
        self.inner.settings
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.inner.tracks
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.inner
            .tracks
            .iter()
            .find(|track| track.kind() == TrackKind::Video)
    }

    pub fn has_audio(&self) -> bool {
        self.inner
            .tracks
            .iter()
            .any(|track| track.kind() == TrackKind::Audio)
    }

    /// True while any track is live
    pub fn is_active(&self) -> bool {
        self.inner.tracks.iter().any(MediaTrack::is_live)
    }

    /// Subscribe to the frame feed (latest-value semantics)
    pub fn frames(&self) -> watch::Receiver<Option<FrameData>> {
        self.inner.frames.clone()
    }

    pub fn latest_frame(&self) -> Option<FrameData> {
        self.inner.frames.borrow().clone()
    }

    pub(crate) fn stop_all_tracks(&self) {
        for track in &self.inner.tracks {
            track.stop();
        }
        self.inner.producer.cancel();
    }

    pub fn same_stream(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.inner.id)
            .field("facing", &self.inner.facing)
            .field("settings", &self.inner.settings)
            .field("active", &self.is_active())
            .finish()
    }
}
