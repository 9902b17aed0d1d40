use super::test_support::*;
use super::*;
use crate::camera::render_synthetic_frame;
use crate::config::DetectorConfig;
use crate::frame::FrameData;
use crate::geometry::BoundingBox;
use std::io::Write;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

fn create_test_detector_config() -> DetectorConfig {
    DetectorConfig {
        load_timeout_ms: 3000,
        detection_interval_ms: 50,
        analysis_scale: 4,
        min_face_area: 60,
        max_faces: 4,
        model_path: None,
    }
}

fn sample_face() -> DetectedFace {
    DetectedFace::from_box(BoundingBox::new(100.0, 80.0, 120.0, 160.0), 1.0)
}

fn synthetic_frame(id: u64, with_face: bool) -> FrameData {
    FrameData::new(
        id,
        SystemTime::now(),
        render_synthetic_frame(320, 240, 0, with_face),
    )
}

#[tokio::test(start_paused = true)]
async fn test_load_before_timeout_reaches_ready() {
    let detector = LandmarkDetector::new(create_test_detector_config());
    let loader = DelayedLoader {
        delay: Duration::from_millis(500),
        model: Arc::new(FixedModel {
            faces: vec![sample_face()],
        }),
    };

    let state = detector.load(&loader).await;
    assert_eq!(state, DetectorState::Ready);
    assert!(detector.is_ready());
    assert!(!detector.is_fallback());
    assert_eq!(detector.detect(&synthetic_frame(1, false)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_before_timeout_falls_back() {
    let detector = LandmarkDetector::new(create_test_detector_config());
    let started = tokio::time::Instant::now();

    let state = detector
        .load(&FailingLoader {
            delay: Duration::from_millis(200),
        })
        .await;

    assert!(matches!(
        state,
        DetectorState::FallbackStatic(FallbackReason::LoadFailed(_))
    ));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(detector.detect(&synthetic_frame(1, true)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_load_that_never_resolves_times_out_at_three_seconds() {
    let detector = Arc::new(LandmarkDetector::new(create_test_detector_config()));
    let task = detector.spawn_loading(Arc::new(PendingLoader));

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert_eq!(detector.state(), DetectorState::Loading);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        detector.state(),
        DetectorState::FallbackStatic(FallbackReason::TimedOut)
    );
    assert_eq!(
        task.await.unwrap(),
        DetectorState::FallbackStatic(FallbackReason::TimedOut)
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_model_never_overrides_fallback() {
    let detector = Arc::new(LandmarkDetector::new(create_test_detector_config()));
    let mut states = detector.subscribe();
    let task = detector.spawn_loading(Arc::new(DelayedLoader {
        delay: Duration::from_secs(5),
        model: Arc::new(FixedModel {
            faces: vec![sample_face()],
        }),
    }));

    let state = task.await.unwrap();
    assert_eq!(state, DetectorState::FallbackStatic(FallbackReason::TimedOut));

    // well past the point where the loader would have finished
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(detector.is_fallback());
    assert!(detector.detect(&synthetic_frame(1, true)).is_empty());
    assert!(states.has_changed().unwrap());
    assert!(states.borrow_and_update().is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_simultaneous_outcomes_resolve_exactly_once() {
    for _ in 0..8 {
        let detector = LandmarkDetector::new(create_test_detector_config());
        let loader = DelayedLoader {
            delay: Duration::from_millis(3000),
            model: Arc::new(FixedModel {
                faces: vec![sample_face()],
            }),
        };

        let state = detector.load(&loader).await;
        assert!(state.is_terminal());

        let faces = detector.detect(&synthetic_frame(1, false));
        match state {
            DetectorState::Ready => assert_eq!(faces.len(), 1),
            DetectorState::FallbackStatic(FallbackReason::TimedOut) => assert!(faces.is_empty()),
            other => panic!("Unexpected state: {:?}", other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_load_is_ignored() {
    let detector = LandmarkDetector::new(create_test_detector_config());
    let first = detector
        .load(&FailingLoader {
            delay: Duration::ZERO,
        })
        .await;
    let loader = fixed_loader(vec![sample_face()]);
    let second = detector.load(loader.as_ref()).await;

    assert_eq!(first, second);
    assert!(detector.is_fallback());
}

#[tokio::test]
async fn test_inference_errors_are_swallowed_without_fallback() {
    let detector = LandmarkDetector::new(create_test_detector_config());
    let loader = DelayedLoader {
        delay: Duration::ZERO,
        model: Arc::new(FlakyModel {
            calls: AtomicUsize::new(0),
            faces: vec![sample_face()],
        }),
    };
    detector.load(&loader).await;

    let frame = synthetic_frame(1, true);
    assert!(detector.detect(&frame).is_empty());
    assert_eq!(detector.detect(&frame).len(), 1);
    assert!(detector.detect(&frame).is_empty());
    assert_eq!(detector.state(), DetectorState::Ready);
}

#[test]
fn test_detect_before_load_is_empty() {
    let detector = LandmarkDetector::new(create_test_detector_config());
    assert_eq!(detector.state(), DetectorState::Unloaded);
    assert!(detector.detect(&synthetic_frame(1, true)).is_empty());
}

#[test]
fn test_skin_model_finds_synthetic_face() {
    let config = create_test_detector_config();
    let model = SkinRegionModel::new(SkinModelParams::default(), &config);

    let faces = model.detect(&synthetic_frame(0, true)).unwrap();
    assert_eq!(faces.len(), 1);

    let face = &faces[0];
    let center = face.bbox.center();
    assert!((center.x - 160.0).abs() < 16.0, "center x {}", center.x);
    assert!((center.y - 120.0).abs() < 16.0, "center y {}", center.y);
    assert!(face.left_eye.x < face.right_eye.x);
    assert!(face.nose_tip.y > face.eye_line_y());
    assert!(face.chin().y > face.nose_tip.y);

    let empty = model.detect(&synthetic_frame(0, false)).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_skin_model_rejects_empty_frame() {
    let config = create_test_detector_config();
    let model = SkinRegionModel::new(SkinModelParams::default(), &config);
    let frame = FrameData::new(7, SystemTime::now(), image::RgbaImage::new(0, 0));
    assert!(model.detect(&frame).is_err());
}

#[tokio::test]
async fn test_skin_loader_reads_parameter_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"cb_range\": [70, 130], \"morphology_radius\": 2}}").unwrap();

    let mut config = create_test_detector_config();
    config.model_path = Some(file.path().to_string_lossy().to_string());

    let detector = LandmarkDetector::new(config.clone());
    let state = detector.load(&SkinModelLoader::new(config)).await;
    assert_eq!(state, DetectorState::Ready);
    assert_eq!(detector.detect(&synthetic_frame(0, true)).len(), 1);
}

#[tokio::test]
async fn test_skin_loader_with_missing_file_falls_back() {
    let mut config = create_test_detector_config();
    config.model_path = Some("/nonexistent/clubcam-model.json".to_string());

    let detector = LandmarkDetector::new(config.clone());
    let state = detector.load(&SkinModelLoader::new(config)).await;
    assert!(matches!(
        state,
        DetectorState::FallbackStatic(FallbackReason::LoadFailed(_))
    ));
}

#[tokio::test]
async fn test_detection_loop_publishes_latest_faces() {
    let detector = Arc::new(LandmarkDetector::new(create_test_detector_config()));
    detector
        .load(fixed_loader(vec![sample_face()]).as_ref())
        .await;

    let (frame_tx, frame_rx) = watch::channel(None);
    let cancel = CancellationToken::new();
    let mut detection = DetectionLoop::spawn(
        Arc::clone(&detector),
        frame_rx,
        Duration::from_millis(10),
        &cancel,
    );
    let mut results = detection.results();

    frame_tx.send(Some(synthetic_frame(42, false))).unwrap();
    tokio::time::timeout(Duration::from_secs(2), results.changed())
        .await
        .unwrap()
        .unwrap();

    let snapshot = detection.latest();
    assert_eq!(snapshot.frame_id, Some(42));
    assert_eq!(snapshot.faces(), &[sample_face()]);

    cancel.cancel();
    detection.stop().await;
}
