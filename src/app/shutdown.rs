use super::ClubcamOrchestrator;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

impl ClubcamOrchestrator {
    /// Tear the session down: tracks, loops, timers and the event logger
    pub async fn shutdown(&mut self) {
        info!("Beginning graceful shutdown");

        self.session.close().await;
        self.cancellation_token.cancel();

        if let Some(logger) = self.event_logger.take() {
            if timeout(Duration::from_secs(2), logger).await.is_err() {
                warn!("Event logger did not stop in time");
            }
        }

        info!("Graceful shutdown completed");
    }
}
