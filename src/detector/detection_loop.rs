use super::landmark::DetectedFace;
use super::tracker::LandmarkDetector;
use crate::frame::FrameData;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Latest detection output; replaced wholesale on every pass
#[derive(Debug, Clone, Default)]
pub struct DetectionSnapshot {
    /// Frame the faces were found in
    pub frame_id: Option<u64>,
    pub faces: Arc<Vec<DetectedFace>>,
}

impl DetectionSnapshot {
    pub fn faces(&self) -> &[DetectedFace] {
        &self.faces
    }
}

/// Background task running the detector over the live frame feed at its own
/// cadence, independent of the overlay render loop.
pub struct DetectionLoop {
    results: watch::Receiver<DetectionSnapshot>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DetectionLoop {
    pub fn spawn(
        detector: Arc<LandmarkDetector>,
        frames: watch::Receiver<Option<FrameData>>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let (tx, results) = watch::channel(DetectionSnapshot::default());
        let cancel = parent.child_token();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_frame_id: Option<u64> = None;

            info!("Detection loop started (every {:?})", interval);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if !detector.is_ready() {
                    continue;
                }

                let frame = match frames.borrow().clone() {
                    Some(frame) => frame,
                    None => continue,
                };
                if last_frame_id == Some(frame.id) {
                    continue;
                }
                last_frame_id = Some(frame.id);

                let worker = Arc::clone(&detector);
                let frame_id = frame.id;
                let faces = tokio::task::spawn_blocking(move || worker.detect(&frame))
                    .await
                    .unwrap_or_else(|e| {
                        debug!("Detection task for frame {} failed: {}", frame_id, e);
                        Vec::new()
                    });

                trace!("Frame {}: {} face(s)", frame_id, faces.len());
                if tx
                    .send(DetectionSnapshot {
                        frame_id: Some(frame_id),
                        faces: Arc::new(faces),
                    })
                    .is_err()
                {
                    break;
                }
            }

            info!("Detection loop stopped");
        });

        Self {
            results,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn results(&self) -> watch::Receiver<DetectionSnapshot> {
        self.results.clone()
    }

    pub fn latest(&self) -> DetectionSnapshot {
        self.results.borrow().clone()
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
