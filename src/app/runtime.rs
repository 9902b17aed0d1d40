use super::types::{ArtifactSummary, CaptureScript, RunReport, ShutdownReason};
use super::{ClubcamOrchestrator, ShutdownHandle};
use crate::error::{ClubcamError, Result};
use crate::session::SessionMode;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const RECORDING_POLL: Duration = Duration::from_millis(250);

impl ClubcamOrchestrator {
    /// Run the script against the session, ending early on a signal or a
    /// shutdown request. The session is always torn down before returning.
    pub async fn run(&mut self, script: CaptureScript) -> Result<RunReport> {
        info!("Clubcam capture run starting");

        let mut shutdown_receiver =
            self.shutdown_receiver
                .take()
                .ok_or_else(|| ClubcamError::System {
                    message: "Shutdown receiver already taken".to_string(),
                })?;

        self.spawn_event_logger();
        let signal_handlers = setup_signal_handlers(self.shutdown_handle());

        let reason = tokio::select! {
            biased;
            received = &mut shutdown_receiver => match received {
                Ok(reason) => reason,
                Err(_) => ShutdownReason::Error("Shutdown channel closed unexpectedly".to_string()),
            },
            outcome = self.execute(&script) => match outcome {
                Ok(()) => ShutdownReason::Completed,
                Err(e) => {
                    error!("Capture run failed: {}", e);
                    ShutdownReason::Error(e.to_string())
                }
            },
        };

        info!("Shutdown initiated: {:?}", reason);
        let state = self.session.state().await;
        let report = RunReport {
            reason,
            artifact: self.session.artifact().map(ArtifactSummary::from),
            state,
        };

        for handler in signal_handlers {
            handler.abort();
        }
        self.shutdown().await;

        info!("Clubcam capture run complete");
        Ok(report)
    }

    async fn execute(&mut self, script: &CaptureScript) -> Result<()> {
        let session = &mut self.session;
        session.open(script.facing).await?;

        if let Some(filter) = &script.filter {
            session.select_filter(filter).await?;
        }
        if let Some(mask) = &script.mask {
            session.select_mask(mask).await?;
        }
        if let Some(ar_filter) = script.ar_filter.as_deref() {
            session.select_ar_filter(Some(ar_filter)).await?;
        }

        tokio::time::sleep(script.warmup).await;

        match script.record_seconds {
            Some(seconds) => {
                session.shutter_press().await?;
                let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds as u64);
                loop {
                    tokio::time::sleep(RECORDING_POLL).await;
                    if session.poll_recording().await? {
                        info!("Recording reached its limit before release");
                        break;
                    }
                    if tokio::time::Instant::now() >= deadline {
                        session.shutter_release().await?;
                        break;
                    }
                }
            }
            None => session.shutter_tap().await?,
        }

        if session.state().await.mode == SessionMode::Post {
            if let Some(caption) = &script.caption {
                session.set_caption(caption).await?;
            }
            for sticker in &script.stickers {
                session.toggle_sticker(sticker).await?;
            }
        } else if script.caption.is_some() || !script.stickers.is_empty() {
            warn!("Caption and stickers are ignored in avatar mode");
        }

        if script.publish {
            let url = session.publish().await?;
            info!("Published to {}", url);
        }
        Ok(())
    }
}

/// Turn SIGINT and SIGTERM into shutdown requests
fn setup_signal_handlers(handle: ShutdownHandle) -> Vec<JoinHandle<()>> {
    let mut handlers = Vec::new();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let handle_sigterm = handle.clone();
        handlers.push(tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    if sigterm.recv().await.is_some() {
                        info!("Received SIGTERM signal");
                        handle_sigterm
                            .trigger(ShutdownReason::Signal("SIGTERM".to_string()))
                            .await;
                    }
                }
                Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
            }
        }));
    }

    handlers.push(tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received SIGINT signal (Ctrl+C)");
            handle
                .trigger(ShutdownReason::Signal("SIGINT".to_string()))
                .await;
        }
    }));

    handlers
}
