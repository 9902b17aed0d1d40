use super::types::ShutdownReason;
use crate::config::ClubcamConfig;
use crate::events::SessionEvent;
use crate::session::{CaptureSessionController, SessionDependencies};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Clonable trigger for ending a run early
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
}

impl ShutdownHandle {
    /// Returns false when a shutdown was already requested
    pub async fn trigger(&self, reason: ShutdownReason) -> bool {
        match self.sender.lock().await.take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }
}

/// Owns one capture session for the lifetime of a binary run
pub struct ClubcamOrchestrator {
    pub(super) config: ClubcamConfig,
    pub(super) session: CaptureSessionController,

    // Lifecycle management
    pub(super) shutdown_handle: ShutdownHandle,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) event_logger: Option<JoinHandle<()>>,
}

impl ClubcamOrchestrator {
    /// Build the session from the configured platform seams
    pub fn new(config: ClubcamConfig) -> Self {
        let deps = SessionDependencies::from_config(&config);
        Self::with_dependencies(config, deps)
    }

    pub fn with_dependencies(config: ClubcamConfig, deps: SessionDependencies) -> Self {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let session = CaptureSessionController::new(config.clone(), deps);

        Self {
            config,
            session,
            shutdown_handle: ShutdownHandle {
                sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            },
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
            event_logger: None,
        }
    }

    pub fn config(&self) -> &ClubcamConfig {
        &self.config
    }

    pub fn session(&self) -> &CaptureSessionController {
        &self.session
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown_handle.clone()
    }

    /// Mirror session events into the log
    pub(super) fn spawn_event_logger(&mut self) {
        if self.event_logger.is_some() {
            return;
        }

        let mut events = self.session.event_bus().subscribe();
        let cancel = self.cancellation_token.child_token();
        self.event_logger = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => log_event(&event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Event logger lagged, {} event(s) skipped", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("Event logger stopped");
        }));
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::CameraFailed { .. }
        | SessionEvent::UploadFailed
        | SessionEvent::AvatarFailed => warn!("{}", event.description()),
        _ => info!("{}", event.description()),
    }
}
