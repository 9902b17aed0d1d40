use super::catalog::ArFilterDefinition;
use super::renderer::{ArRenderer, TickReport};
use super::surface::SharedOverlay;
use crate::detector::{DetectionSnapshot, LandmarkDetector};
use crate::frame::FrameData;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Inputs the render loop reads every tick
pub struct RenderInputs {
    pub frames: watch::Receiver<Option<FrameData>>,
    pub detector: Arc<LandmarkDetector>,
    pub detections: watch::Receiver<DetectionSnapshot>,
}

/// Continuously running overlay loop.
///
/// Keeps ticking while no filter is selected so a selection takes effect on
/// the next tick. A panic inside a tick is caught and the loop carries on.
pub struct OverlayRenderLoop {
    filter_tx: watch::Sender<Option<&'static ArFilterDefinition>>,
    reports: watch::Receiver<TickReport>,
    ticks: Arc<AtomicU64>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl OverlayRenderLoop {
    pub fn spawn(
        mut renderer: ArRenderer,
        surface: SharedOverlay,
        inputs: RenderInputs,
        refresh_hz: u32,
        parent: &CancellationToken,
    ) -> Self {
        let (filter_tx, mut filter_rx) = watch::channel(renderer.active_filter());
        let (report_tx, reports) = watch::channel(TickReport::default());
        let ticks = Arc::new(AtomicU64::new(0));
        let cancel = parent.child_token();

        let task_ticks = Arc::clone(&ticks);
        let task_cancel = cancel.clone();
        let period = Duration::from_micros(1_000_000 / refresh_hz.max(1) as u64);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let RenderInputs {
                frames,
                detector,
                detections,
            } = inputs;

            info!("Overlay render loop started ({}Hz, {})", refresh_hz, renderer.painter_name());

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let filter = *filter_rx.borrow_and_update();
                let frame_size = frames.borrow().as_ref().map(FrameData::dimensions);
                let snapshot = detections.borrow().clone();
                let ready = detector.is_ready();

                let result = catch_unwind(AssertUnwindSafe(|| {
                    renderer.set_filter(filter);
                    let mut surface = surface.write();
                    let size = frame_size.unwrap_or_else(|| surface.dimensions());
                    renderer.tick(&mut surface, size, ready, snapshot.faces())
                }));

                task_ticks.fetch_add(1, Ordering::Relaxed);
                match result {
                    Ok(report) => {
                        let _ = report_tx.send(report);
                    }
                    Err(_) => warn!("Overlay tick panicked; continuing with the next tick"),
                }
            }

            renderer.set_filter(None);
            surface.write().clear();
            info!("Overlay render loop stopped");
        });

        Self {
            filter_tx,
            reports,
            ticks,
            cancel,
            handle: Some(handle),
        }
    }

    /// Select or clear the AR filter; takes effect on the next tick
    pub fn set_filter(&self, filter: Option<&'static ArFilterDefinition>) {
        let _ = self.filter_tx.send(filter);
    }

    pub fn reports(&self) -> watch::Receiver<TickReport> {
        self.reports.clone()
    }

    pub fn last_report(&self) -> TickReport {
        *self.reports.borrow()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop rescheduling and wait for the loop to exit
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for OverlayRenderLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
