use super::*;
use crate::camera::{SyntheticDeviceConfig, SyntheticMediaDevices};
use crate::capture::{compose, color_filter, ArtifactKind, AssetMaskLoader, MjpegRecorderBackend};
use crate::config::ClubcamConfig;
use crate::detector::test_support::{fixed_loader, PendingLoader};
use crate::detector::{DetectedFace, DetectorState, FallbackReason, LandmarkModelLoader};
use crate::error::{AcquisitionError, ClubcamError, RecordingError, UploadError};
use crate::events::{EventBus, SessionEvent};
use crate::frame::Facing;
use crate::geometry::BoundingBox;
use crate::overlay::RenderPath;
use crate::services::{
    AvatarGenerator, LocalUploadService, ServiceHub, UploadCategory, UploadService,
};

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Fails the first `failures` uploads, then stores locally
struct FlakyUpload {
    failures: AtomicUsize,
    inner: LocalUploadService,
}

#[async_trait]
impl UploadService for FlakyUpload {
    async fn upload(
        &self,
        artifact: &crate::capture::CaptureArtifact,
        category: UploadCategory,
    ) -> Option<String> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return None;
        }
        self.inner.upload(artifact, category).await
    }
}

struct FixedAvatar(Option<String>);

#[async_trait]
impl AvatarGenerator for FixedAvatar {
    async fn generate(&self, _selfie: &[u8]) -> Option<String> {
        self.0.clone()
    }
}

struct Harness {
    controller: CaptureSessionController,
    devices: Arc<SyntheticMediaDevices>,
    storage: tempfile::TempDir,
}

fn create_test_config(mode: SessionMode) -> ClubcamConfig {
    let mut config = ClubcamConfig::default();
    config.camera.max_resolution = (160, 120);
    config.camera.fps = 10;
    config.camera.default_facing = Facing::Front;
    config.overlay.refresh_hz = 20;
    config.detector.detection_interval_ms = 100;
    config.capture.mask_root = "./assets/masks".to_string();
    config.session.mode = mode;
    config
}

fn create_harness_with(
    config: ClubcamConfig,
    loader: Arc<dyn LandmarkModelLoader>,
    upload_failures: usize,
    avatar: Option<String>,
) -> Harness {
    let storage = tempfile::tempdir().unwrap();
    let devices = Arc::new(SyntheticMediaDevices::new(SyntheticDeviceConfig {
        native_resolution: (640, 480),
        ..SyntheticDeviceConfig::default()
    }));

    let services = ServiceHub::new(
        Arc::new(FlakyUpload {
            failures: AtomicUsize::new(upload_failures),
            inner: LocalUploadService::new(storage.path(), true),
        }),
        Arc::new(FixedAvatar(avatar)),
    );

    let deps = SessionDependencies {
        devices: devices.clone(),
        model_loader: loader,
        mask_loader: Arc::new(AssetMaskLoader::from_config(&config.capture)),
        recorder_backend: Arc::new(MjpegRecorderBackend::new(config.capture.jpeg_quality)),
        services,
        event_bus: Arc::new(EventBus::new(config.system.event_bus_capacity)),
    };

    Harness {
        controller: CaptureSessionController::new(config, deps),
        devices,
        storage,
    }
}

fn create_harness(loader: Arc<dyn LandmarkModelLoader>) -> Harness {
    create_harness_with(create_test_config(SessionMode::Post), loader, 0, None)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 120, 80, 255]));
    let mut data = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)
        .unwrap();
    data
}

fn mean_abs_diff(a: &RgbaImage, b: &RgbaImage) -> f64 {
    let total: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(p, q)| {
            (0..3)
                .map(|c| (p[c] as i64 - q[c] as i64).unsigned_abs())
                .sum::<u64>()
        })
        .sum();
    total as f64 / (a.width() * a.height() * 3) as f64
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn test_front_camera_warm_photo_lands_in_edit() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(Some(Facing::Front)).await.unwrap();
    controller.select_filter("warm").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let raw = controller
        .active_stream()
        .and_then(|stream| stream.latest_frame())
        .unwrap();
    controller.shutter_tap().await.unwrap();

    assert_eq!(controller.phase(), SessionPhase::Edit);
    let artifact = controller.artifact().unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Image);
    assert_eq!(artifact.effects.color_filter, "warm");
    assert_eq!(artifact.effects.ar_filter, None);
    assert_eq!(artifact.effects.mask, None);
    assert!(artifact.effects.mirrored);

    let warm = color_filter("warm").unwrap();
    let normal = color_filter("normal").unwrap();
    let expected = compose(&raw.pixels, warm, None, true, None);
    let unfiltered = compose(&raw.pixels, normal, None, true, None);
    let decoded = image::load_from_memory(&artifact.bytes).unwrap().to_rgba8();

    assert_eq!(decoded.dimensions(), expected.dimensions());
    let to_expected = mean_abs_diff(&decoded, &expected);
    let to_unfiltered = mean_abs_diff(&decoded, &unfiltered);
    assert!(to_expected < 8.0, "JPEG drifted {:.2} from the warm frame", to_expected);
    assert!(to_expected < to_unfiltered);

    // edit releases the live camera
    assert_eq!(harness.devices.live_track_count(), 0);
    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_holding_shutter_past_limit_auto_stops_at_thirty_seconds() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.shutter_press().await.unwrap();
    assert!(controller.state().await.recording);

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(controller.poll_recording().await.unwrap());

    // the later release finds nothing to stop
    controller.shutter_release().await.unwrap();

    assert_eq!(controller.phase(), SessionPhase::Edit);
    let artifact = controller.artifact().unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Video);
    assert!(artifact.duration.unwrap() <= Duration::from_secs(30));
    assert!(!artifact.is_empty());
    assert!(!controller.state().await.recording);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_stopped_recording_surfaces_without_release() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;
    let mut events = controller.event_bus().subscribe();

    controller.open(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.shutter_press().await.unwrap();
    tokio::time::sleep(Duration::from_secs(35)).await;

    // announced by the recording itself, before the controller is asked
    let stopped = drain(&mut events).into_iter().find_map(|event| match event {
        SessionEvent::RecordingStopped {
            duration,
            auto_stopped,
        } => Some((duration, auto_stopped)),
        _ => None,
    });
    assert_eq!(stopped, Some((Duration::from_secs(30), true)));

    let state = controller.state().await;
    assert_eq!(state.phase, SessionPhase::Edit);
    assert!(!state.recording);
    assert!(!state.camera_live);
    assert!(state.has_artifact);
    assert_eq!(harness.devices.live_track_count(), 0);
    assert_eq!(
        harness.controller.artifact().unwrap().duration,
        Some(Duration::from_secs(30))
    );

    // collected once; the stop is not reported twice
    harness.controller.shutter_release().await.unwrap();
    let repeated = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, SessionEvent::RecordingStopped { .. }))
        .count();
    assert_eq!(repeated, 0);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_release_stops_recording() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;
    let mut events = controller.event_bus().subscribe();

    controller.open(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.shutter_press().await.unwrap();
    assert!(matches!(
        controller.shutter_press().await,
        Err(ClubcamError::Recording(RecordingError::AlreadyRecording))
    ));

    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert!(!controller.poll_recording().await.unwrap());
    assert_eq!(controller.state().await.recording_elapsed, Duration::from_secs(4));

    controller.shutter_release().await.unwrap();
    assert_eq!(controller.phase(), SessionPhase::Edit);

    let stopped = drain(&mut events).into_iter().find_map(|event| match event {
        SessionEvent::RecordingStopped {
            duration,
            auto_stopped,
        } => Some((duration, auto_stopped)),
        _ => None,
    });
    let (duration, auto_stopped) = stopped.unwrap();
    assert!(!auto_stopped);
    assert!(duration >= Duration::from_millis(4500) && duration < Duration::from_secs(5));

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_detector_that_never_loads_falls_back_to_frame_centered_overlay() {
    let mut harness = create_harness(Arc::new(PendingLoader));
    let controller = &mut harness.controller;
    let mut events = controller.event_bus().subscribe();

    controller.open(None).await.unwrap();
    controller.select_ar_filter(Some("crown")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert_eq!(controller.detector().state(), DetectorState::Loading);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        controller.detector().state(),
        DetectorState::FallbackStatic(FallbackReason::TimedOut)
    );
    assert_eq!(controller.state().await.detector, "fallback_static");

    let report = controller.render_report().unwrap();
    assert_eq!(report.path, RenderPath::FrameCentered);
    assert!(report.glyphs_drawn >= 1);

    let detector_events: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::DetectorStateChanged { state } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(detector_events.last().map(String::as_str), Some("fallback_static"));

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_ready_detector_anchors_overlay_per_face() {
    let face = DetectedFace::from_box(BoundingBox::new(40.0, 30.0, 60.0, 80.0), 1.0);
    let mut harness = create_harness(fixed_loader(vec![face]));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller.select_ar_filter(Some("dog")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(controller.detector().is_ready());
    let report = controller.render_report().unwrap();
    assert_eq!(report.path, RenderPath::PerFace);
    assert_eq!(report.glyphs_drawn, 3);

    controller.shutter_tap().await.unwrap();
    let artifact = controller.artifact().unwrap();
    assert_eq!(artifact.effects.ar_filter.as_deref(), Some("dog"));

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_back_after_publish_restores_fresh_capture_state() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let fresh = controller.state().await;
    assert_eq!(fresh.phase, SessionPhase::Capture);
    assert!(fresh.camera_live);

    controller.select_filter("vintage").await.unwrap();
    controller.select_mask("frame").await.unwrap();
    controller.select_ar_filter(Some("stars")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.shutter_tap().await.unwrap();

    controller.set_caption("club night").await.unwrap();
    assert!(controller.toggle_sticker("fire").await.unwrap());
    let url = controller.publish().await.unwrap();
    assert!(url.contains("posts"));
    assert!(controller.state().await.published_url.is_some());

    controller.back().await.unwrap();

    assert_eq!(controller.state().await, fresh);
    assert!(controller.artifact().is_none());
    assert_eq!(harness.devices.live_track_count(), 2);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_failure_is_retryable() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    harness.devices.fail_with("NotAllowedError");
    let controller = &mut harness.controller;

    let result = controller.open(None).await;
    assert!(matches!(
        result,
        Err(ClubcamError::Acquisition(AcquisitionError::PermissionDenied))
    ));

    let state = controller.state().await;
    assert_eq!(state.phase, SessionPhase::Capture);
    assert!(!state.camera_live);
    assert!(state.camera_error.as_deref().unwrap().contains("denied"));
    assert!(controller.shutter_tap().await.is_err());

    harness.devices.clear_failure();
    controller.retry().await.unwrap();

    let state = controller.state().await;
    assert!(state.camera_live);
    assert_eq!(state.camera_error, None);
    assert_eq!(harness.devices.live_track_count(), 2);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_toggle_facing_reacquires_and_torch_is_best_effort() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(Some(Facing::Front)).await.unwrap();
    assert!(!controller.set_torch(true));
    assert!(!controller.state().await.torch);

    controller.toggle_facing().await.unwrap();
    assert_eq!(controller.state().await.facing, Facing::Back);
    assert_eq!(harness.devices.live_track_count(), 2);
    assert_eq!(harness.devices.streams_opened(), 2);

    assert!(controller.set_torch(true));
    assert!(controller.state().await.torch);

    controller.toggle_facing().await.unwrap();
    assert_eq!(controller.state().await.facing, Facing::Front);
    assert!(!controller.state().await.torch);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_release_without_recording_does_nothing() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller.shutter_release().await.unwrap();

    assert_eq!(controller.phase(), SessionPhase::Capture);
    assert!(controller.artifact().is_none());

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_unknown_catalog_entries_are_rejected() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    assert!(controller.select_filter("sepia-max").await.is_err());
    assert!(controller.select_mask("moustache").await.is_err());
    assert!(controller.select_ar_filter(Some("unicorn")).await.is_err());

    let state = controller.state().await;
    assert_eq!(state.color_filter, "normal");
    assert_eq!(state.mask, "none");
    assert_eq!(state.ar_filter, None);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_imported_file_bypasses_camera_and_stickers_are_bounded() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller
        .import_file(png_bytes(40, 30), "image/png")
        .await
        .unwrap();

    assert_eq!(controller.phase(), SessionPhase::Edit);
    assert_eq!(harness.devices.live_track_count(), 0);
    let controller = &mut harness.controller;

    assert!(controller.toggle_sticker("fire").await.unwrap());
    assert!(controller.toggle_sticker("star").await.unwrap());
    assert!(controller.toggle_sticker("rocket").await.unwrap());
    assert!(controller.toggle_sticker("party").await.is_err());
    assert_eq!(controller.state().await.stickers, vec!["fire", "star", "rocket"]);

    assert!(!controller.toggle_sticker("star").await.unwrap());
    assert!(controller.toggle_sticker("party").await.unwrap());
    assert_eq!(controller.state().await.stickers, vec!["fire", "rocket", "party"]);
    assert!(controller.toggle_sticker("glitter").await.is_err());

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_keeps_artifact_for_retry() {
    let mut harness = create_harness_with(
        create_test_config(SessionMode::Post),
        fixed_loader(Vec::new()),
        1,
        None,
    );
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller
        .import_file(png_bytes(40, 30), "image/png")
        .await
        .unwrap();
    let artifact_id = controller.artifact().unwrap().id.clone();

    assert!(matches!(
        controller.publish().await,
        Err(ClubcamError::Upload(UploadError::Failed))
    ));
    assert!(controller.state().await.upload_error.is_some());
    assert_eq!(controller.artifact().unwrap().id, artifact_id);
    assert_eq!(controller.phase(), SessionPhase::Edit);

    let url = controller.publish().await.unwrap();
    assert!(url.starts_with("file://"));
    assert_eq!(controller.state().await.upload_error, None);

    let stored = harness.storage.path().join("posts");
    assert!(stored.exists());
    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_avatar_mode_generation_failure_stays_in_edit() {
    let mut harness = create_harness_with(
        create_test_config(SessionMode::Avatar),
        fixed_loader(Vec::new()),
        0,
        None,
    );
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller
        .import_file(png_bytes(40, 30), "image/png")
        .await
        .unwrap();

    assert!(controller.set_caption("hello").await.is_err());
    assert!(controller.toggle_sticker("fire").await.is_err());

    assert!(matches!(
        controller.use_for_ai().await,
        Err(ClubcamError::Upload(UploadError::AvatarGenerationFailed))
    ));
    assert_eq!(controller.phase(), SessionPhase::Edit);
    assert!(controller.state().await.avatar_error.is_some());

    // using the photo directly still works
    let url = controller.publish().await.unwrap();
    assert!(url.contains("avatars"));

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_avatar_generation_success() {
    let mut harness = create_harness_with(
        create_test_config(SessionMode::Avatar),
        fixed_loader(Vec::new()),
        0,
        Some("data:image/png;base64,AAAA".to_string()),
    );
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.shutter_tap().await.unwrap();

    let preview = controller.use_for_ai().await.unwrap();
    assert_eq!(preview, "data:image/png;base64,AAAA");
    assert_eq!(controller.state().await.avatar_preview.as_deref(), Some(preview.as_str()));
    assert_eq!(controller.state().await.avatar_error, None);

    harness.controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_tracks_loops_and_recording_timers() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;
    let mut events = controller.event_bus().subscribe();

    controller.open(None).await.unwrap();
    controller.select_ar_filter(Some("hearts")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.shutter_press().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    controller.close().await;
    assert!(controller.is_closed());
    assert_eq!(harness.devices.live_track_count(), 0);
    assert!(harness.controller.render_report().is_none());
    assert!(!harness.controller.state().await.recording);
    drain(&mut events);

    // neither the heartbeat nor the auto-stop fires on the torn-down session
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(drain(&mut events).is_empty());
    assert!(harness.controller.artifact().is_none());

    // closing twice is harmless
    harness.controller.close().await;
    assert!(harness.controller.open(None).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_close_from_edit_discards_artifact() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller
        .import_file(png_bytes(40, 30), "image/png")
        .await
        .unwrap();
    assert!(controller.artifact().is_some());

    controller.close().await;
    assert!(controller.artifact().is_none());
    assert_eq!(controller.phase(), SessionPhase::Capture);
}

#[tokio::test(start_paused = true)]
async fn test_close_during_permission_wait_cancels_acquisition() {
    let storage = tempfile::tempdir().unwrap();
    let config = create_test_config(SessionMode::Post);
    let devices = Arc::new(SyntheticMediaDevices::new(SyntheticDeviceConfig {
        permission_delay: Some(Duration::from_secs(10)),
        ..SyntheticDeviceConfig::default()
    }));
    let deps = SessionDependencies {
        devices: devices.clone(),
        model_loader: fixed_loader(Vec::new()),
        mask_loader: Arc::new(AssetMaskLoader::from_config(&config.capture)),
        recorder_backend: Arc::new(MjpegRecorderBackend::new(80)),
        services: ServiceHub::from_config(&crate::config::UploadConfig {
            storage_path: storage.path().to_string_lossy().to_string(),
            save_metadata: false,
        }),
        event_bus: Arc::new(EventBus::new(16)),
    };
    let mut controller = CaptureSessionController::new(config, deps);

    let token = controller.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let result = controller.open(None).await;
    assert!(matches!(
        result,
        Err(ClubcamError::Acquisition(AcquisitionError::Cancelled))
    ));
    assert_eq!(controller.state().await.camera_error, None);
    assert_eq!(devices.live_track_count(), 0);

    controller.close().await;
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(devices.live_track_count(), 0);
}

#[test]
fn test_fresh_state_defaults() {
    let state = SessionState::fresh(SessionMode::Avatar, Facing::Back);
    assert!(state.is_capture());
    assert_eq!(state.mode, SessionMode::Avatar);
    assert_eq!(state.color_filter, "normal");
    assert_eq!(state.mask, "none");
    assert!(state.stickers.is_empty());
    assert_eq!("avatar".parse::<SessionMode>().unwrap(), SessionMode::Avatar);
    assert!("story".parse::<SessionMode>().is_err());
    assert_eq!(stickers().len(), STICKERS.len());
    assert_eq!(sticker("fire").unwrap().glyph, "🔥");
}

#[tokio::test(start_paused = true)]
async fn test_live_view_selections_need_an_open_capture_phase() {
    let mut harness = create_harness(fixed_loader(Vec::new()));
    let controller = &mut harness.controller;

    controller.open(None).await.unwrap();
    controller
        .import_file(png_bytes(40, 30), "image/png")
        .await
        .unwrap();
    assert_eq!(controller.phase(), SessionPhase::Edit);

    assert!(controller.select_filter("warm").await.is_err());
    assert!(controller.select_mask("hearts").await.is_err());
    assert!(controller.select_ar_filter(Some("dog")).await.is_err());
    let state = controller.state().await;
    assert_eq!(state.color_filter, "normal");
    assert_eq!(state.mask, "none");
    assert_eq!(state.ar_filter, None);

    controller.close().await;
    let closed = |result: crate::error::Result<()>| {
        matches!(result, Err(ClubcamError::Component { ref message, .. }) if message.contains("closed"))
    };
    assert!(closed(controller.select_filter("warm").await));
    assert!(closed(controller.select_ar_filter(None).await));
    assert!(closed(controller.publish().await.map(|_| ())));
    assert!(closed(controller.use_for_ai().await.map(|_| ())));
}
