use super::landmark::{DetectedFace, LandmarkModel, LandmarkModelLoader};
use super::state::{DetectorState, FallbackReason};
use crate::config::DetectorConfig;
use crate::frame::FrameData;

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

enum LoadOutcome {
    Loaded(Arc<dyn LandmarkModel>),
    Failed(String),
    TimedOut,
}

/// Face landmark detector with a load-or-fallback lifecycle.
///
/// Loading races the model loader against `detector.load_timeout_ms`. The
/// first outcome wins and the other branch is dropped, so exactly one of
/// `Ready` or `FallbackStatic` is ever reached.
pub struct LandmarkDetector {
    config: DetectorConfig,
    state_tx: watch::Sender<DetectorState>,
    model: RwLock<Option<Arc<dyn LandmarkModel>>>,
}

impl LandmarkDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let (state_tx, _) = watch::channel(DetectorState::Unloaded);
        Self {
            config,
            state_tx,
            model: RwLock::new(None),
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state_tx.borrow().clone()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<DetectorState> {
        self.state_tx.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state_tx.borrow(), DetectorState::Ready)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(*self.state_tx.borrow(), DetectorState::FallbackStatic(_))
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.config.load_timeout_ms)
    }

    /// Move `from` -> `to` atomically; false if the detector was elsewhere
    fn transition(&self, from: &DetectorState, to: DetectorState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Load the model, falling back if it errors or exceeds the timeout.
    ///
    /// Only the first call does any work; later calls return the current state.
    pub async fn load(&self, loader: &dyn LandmarkModelLoader) -> DetectorState {
        if !self.transition(&DetectorState::Unloaded, DetectorState::Loading) {
            debug!("Landmark model load already started ({})", self.state());
            return self.state();
        }

        let timeout = self.load_timeout();
        info!("Loading landmark model (timeout {:?})", timeout);

        let outcome = tokio::select! {
            result = loader.load() => match result {
                Ok(model) => LoadOutcome::Loaded(model),
                Err(e) => LoadOutcome::Failed(e.to_string()),
            },
            _ = tokio::time::sleep(timeout) => LoadOutcome::TimedOut,
        };

        match outcome {
            LoadOutcome::Loaded(model) => {
                let name = model.name().to_string();
                *self.model.write() = Some(model);
                if self.transition(&DetectorState::Loading, DetectorState::Ready) {
                    info!("Landmark model '{}' ready", name);
                } else {
                    *self.model.write() = None;
                }
            }
            LoadOutcome::Failed(details) => {
                warn!(
                    "Landmark model failed to load, using frame-centered overlays: {}",
                    details
                );
                self.transition(
                    &DetectorState::Loading,
                    DetectorState::FallbackStatic(FallbackReason::LoadFailed(details)),
                );
            }
            LoadOutcome::TimedOut => {
                warn!(
                    "Landmark model not ready after {:?}, using frame-centered overlays",
                    timeout
                );
                self.transition(
                    &DetectorState::Loading,
                    DetectorState::FallbackStatic(FallbackReason::TimedOut),
                );
            }
        }

        self.state()
    }

    /// Run `load` on a background task
    pub fn spawn_loading(
        self: &Arc<Self>,
        loader: Arc<dyn LandmarkModelLoader>,
    ) -> JoinHandle<DetectorState> {
        let detector = Arc::clone(self);
        tokio::spawn(async move { detector.load(loader.as_ref()).await })
    }

    /// Faces in `frame`; empty when not ready or when inference fails
    pub fn detect(&self, frame: &FrameData) -> Vec<DetectedFace> {
        if !self.is_ready() {
            return Vec::new();
        }

        let model = match self.model.read().as_ref() {
            Some(model) => Arc::clone(model),
            None => return Vec::new(),
        };

        match model.detect(frame) {
            Ok(faces) => faces,
            Err(e) => {
                trace!("Detection failed on frame {}, treating as no faces: {}", frame.id, e);
                Vec::new()
            }
        }
    }
}
