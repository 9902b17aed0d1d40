use crate::error::EventBusError;
use crate::frame::Facing;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur during a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A live stream was acquired
    CameraOpened { facing: Facing, width: u32, height: u32 },
    /// The live stream was released
    CameraReleased,
    /// Acquisition failed; the session shows the retry state
    CameraFailed { reason: String },
    /// The landmark detector reached a new state
    DetectorStateChanged { state: String },
    /// A still image was composited
    PhotoCaptured { artifact_id: String },
    /// Recording started with the negotiated mime type
    RecordingStarted { mime_type: String },
    /// Recording ended, either by the user or by the duration limit
    RecordingStopped { duration: Duration, auto_stopped: bool },
    /// The session moved between capture and edit
    PhaseChanged { phase: String },
    /// The artifact was stored by the upload service
    UploadCompleted { url: String },
    /// The upload service returned no URL
    UploadFailed,
    /// The generative avatar service produced an image
    AvatarGenerated,
    /// The generative avatar service failed
    AvatarFailed,
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::CameraOpened {
                facing,
                width,
                height,
            } => format!("Camera opened ({}, {}x{})", facing, width, height),
            SessionEvent::CameraReleased => "Camera released".to_string(),
            SessionEvent::CameraFailed { reason } => format!("Camera failed: {}", reason),
            SessionEvent::DetectorStateChanged { state } => {
                format!("Detector state: {}", state)
            }
            SessionEvent::PhotoCaptured { artifact_id } => {
                format!("Photo captured: {}", artifact_id)
            }
            SessionEvent::RecordingStarted { mime_type } => {
                format!("Recording started ({})", mime_type)
            }
            SessionEvent::RecordingStopped {
                duration,
                auto_stopped,
            } => format!(
                "Recording stopped after {:.1}s{}",
                duration.as_secs_f64(),
                if *auto_stopped { " (limit reached)" } else { "" }
            ),
            SessionEvent::PhaseChanged { phase } => format!("Phase changed to {}", phase),
            SessionEvent::UploadCompleted { url } => format!("Upload completed: {}", url),
            SessionEvent::UploadFailed => "Upload failed".to_string(),
            SessionEvent::AvatarGenerated => "Avatar generated".to_string(),
            SessionEvent::AvatarFailed => "Avatar generation failed".to_string(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::CameraOpened { .. } => "camera_opened",
            SessionEvent::CameraReleased => "camera_released",
            SessionEvent::CameraFailed { .. } => "camera_failed",
            SessionEvent::DetectorStateChanged { .. } => "detector_state_changed",
            SessionEvent::PhotoCaptured { .. } => "photo_captured",
            SessionEvent::RecordingStarted { .. } => "recording_started",
            SessionEvent::RecordingStopped { .. } => "recording_stopped",
            SessionEvent::PhaseChanged { .. } => "phase_changed",
            SessionEvent::UploadCompleted { .. } => "upload_completed",
            SessionEvent::UploadFailed => "upload_failed",
            SessionEvent::AvatarGenerated => "avatar_generated",
            SessionEvent::AvatarFailed => "avatar_failed",
        }
    }
}

/// Event bus for session observers using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SessionEvent) -> Result<usize, EventBusError> {
        match &event {
            SessionEvent::CameraFailed { reason } => {
                error!("Camera failed: {}", reason);
            }
            SessionEvent::UploadFailed | SessionEvent::AvatarFailed => {
                warn!("{}", event.description());
            }
            SessionEvent::CameraOpened { .. }
            | SessionEvent::RecordingStopped { .. }
            | SessionEvent::UploadCompleted { .. } => {
                info!("{}", event.description());
            }
            _ => {
                debug!("Event: {}", event.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, treating an absent audience as normal
    pub fn notify(&self, event: SessionEvent) {
        if let Err(e) = self.publish(event) {
            debug!("No session event subscribers: {}", e);
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
