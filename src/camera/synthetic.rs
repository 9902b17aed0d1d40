use super::stream::{
    MediaDevices, MediaStream, MediaTrack, PlatformMediaError, StreamConstraints, StreamSettings,
    TrackKind,
};
use crate::frame::{Facing, FrameData};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Skin tone used for the synthetic face; sits inside the YCbCr skin range
pub const SYNTHETIC_SKIN: Rgba<u8> = Rgba([224, 172, 140, 255]);

/// Settings for the built-in synthetic camera
#[derive(Debug, Clone)]
pub struct SyntheticDeviceConfig {
    /// Largest resolution the fake sensor can deliver
    pub native_resolution: (u32, u32),
    /// Facings that have a device attached
    pub facings: Vec<Facing>,
    /// Whether the back camera exposes a torch
    pub torch_on_back: bool,
    /// Draw a face blob into every frame
    pub with_face: bool,
    /// Simulated wait on the permission prompt
    pub permission_delay: Option<Duration>,
}

impl Default for SyntheticDeviceConfig {
    fn default() -> Self {
        Self {
            native_resolution: (1280, 720),
            facings: vec![Facing::Front, Facing::Back],
            torch_on_back: true,
            with_face: true,
            permission_delay: None,
        }
    }
}

/// Frame-generating stand-in for real camera hardware.
///
/// Counts live tracks across every stream it has handed out and can be told
/// to fail the next acquisitions with a platform error name.
pub struct SyntheticMediaDevices {
    config: SyntheticDeviceConfig,
    live_tracks: Arc<AtomicUsize>,
    streams_opened: AtomicU64,
    failure: Mutex<Option<PlatformMediaError>>,
}

impl SyntheticMediaDevices {
    pub fn new(config: SyntheticDeviceConfig) -> Self {
        Self {
            config,
            live_tracks: Arc::new(AtomicUsize::new(0)),
            streams_opened: AtomicU64::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Make every following acquisition fail with the given platform error name
    pub fn fail_with(&self, name: &str) {
        *self.failure.lock() = Some(PlatformMediaError::new(name, "injected failure"));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Tracks not yet stopped, across all streams
    pub fn live_track_count(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    pub fn streams_opened(&self) -> u64 {
        self.streams_opened.load(Ordering::SeqCst)
    }

    fn negotiate(&self, constraints: &StreamConstraints) -> StreamSettings {
        let (native_w, native_h) = self.config.native_resolution;
        StreamSettings {
            width: native_w.min(constraints.max_width).max(1),
            height: native_h.min(constraints.max_height).max(1),
            fps: constraints.fps.max(1),
        }
    }
}

impl Default for SyntheticMediaDevices {
    fn default() -> Self {
        Self::new(SyntheticDeviceConfig::default())
    }
}

#[async_trait]
impl MediaDevices for SyntheticMediaDevices {
    async fn get_user_media(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream, PlatformMediaError> {
        if let Some(delay) = self.config.permission_delay {
            debug!("Synthetic permission prompt pending for {:?}", delay);
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.failure.lock().clone() {
            return Err(failure);
        }

        if !self.config.facings.contains(&constraints.facing) {
            return Err(PlatformMediaError::new(
                "NotFoundError",
                format!("no {} camera attached", constraints.facing),
            ));
        }

        let settings = self.negotiate(constraints);
        let torch_capable = constraints.facing == Facing::Back && self.config.torch_on_back;

        let mut tracks = vec![MediaTrack::new(
            TrackKind::Video,
            format!("Synthetic {} camera", constraints.facing),
            torch_capable,
        )
        .with_live_counter(Arc::clone(&self.live_tracks))];

        if constraints.audio {
            tracks.push(
                MediaTrack::new(TrackKind::Audio, "Synthetic microphone", false)
                    .with_live_counter(Arc::clone(&self.live_tracks)),
            );
        }

        let (tx, rx) = watch::channel(None);
        let producer = CancellationToken::new();
        spawn_frame_generator(settings, self.config.with_face, tx, producer.clone());

        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MediaStream::new(
            constraints.facing,
            settings,
            tracks,
            rx,
            producer,
        ))
    }
}

fn spawn_frame_generator(
    settings: StreamSettings,
    with_face: bool,
    tx: watch::Sender<Option<FrameData>>,
    producer: CancellationToken,
) {
    tokio::spawn(async move {
        let frame_interval = Duration::from_millis((1000 / settings.fps as u64).max(1));
        let mut interval_timer = tokio::time::interval(frame_interval);
        interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let frame_counter = AtomicU64::new(0);

        info!(
            "Synthetic capture loop started ({}x{} every {}ms)",
            settings.width,
            settings.height,
            frame_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = producer.cancelled() => break,
                _ = interval_timer.tick() => {
                    let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
                    let pixels = render_synthetic_frame(settings.width, settings.height, frame_id, with_face);
                    trace!("Generated synthetic frame {} ({}x{})", frame_id, settings.width, settings.height);
                    if tx.send(Some(FrameData::new(frame_id, SystemTime::now(), pixels))).is_err() {
                        break;
                    }
                }
            }
        }

        info!("Synthetic capture loop stopped");
    });
}

/// Blue gradient background with an optional drifting skin-toned face
pub fn render_synthetic_frame(width: u32, height: u32, frame_id: u64, with_face: bool) -> RgbaImage {
    let mut image = RgbaImage::from_fn(width, height, |x, y| {
        let fx = x as f32 / width.max(1) as f32;
        let fy = y as f32 / height.max(1) as f32;
        Rgba([
            (30.0 + 40.0 * fx) as u8,
            (60.0 + 40.0 * fy) as u8,
            (150.0 + 50.0 * (1.0 - fy)) as u8,
            255,
        ])
    });

    if with_face {
        let drift = ((frame_id as f32) * 0.05).sin() * width as f32 * 0.03;
        let cx = (width as f32 / 2.0 + drift) as i32;
        let cy = (height as f32 * 0.5) as i32;
        let rx = ((width as f32 * 0.12) as i32).max(2);
        let ry = ((height as f32 * 0.22) as i32).max(2);
        draw_filled_ellipse_mut(&mut image, (cx, cy), rx, ry, SYNTHETIC_SKIN);

        let eye_r = (rx / 6).max(1);
        let eye_y = cy - ry / 5;
        let eye_dx = rx * 2 / 5;
        let eye = Rgba([40, 30, 30, 255]);
        draw_filled_ellipse_mut(&mut image, (cx - eye_dx, eye_y), eye_r, eye_r, eye);
        draw_filled_ellipse_mut(&mut image, (cx + eye_dx, eye_y), eye_r, eye_r, eye);
    }

    image
}
