use thiserror::Error;

/// Main error type for the clubcam capture core
#[derive(Error, Debug)]
pub enum ClubcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Camera acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Landmark detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Camera/microphone acquisition failures, one per actionable cause
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera device found")]
    DeviceNotFound,

    #[error("Camera is busy or could not be started")]
    DeviceBusy,

    #[error("Camera capture is not supported on this platform")]
    Unsupported,

    #[error("Camera configuration rejected: {details}")]
    Configuration { details: String },

    #[error("Camera acquisition cancelled")]
    Cancelled,
}

impl AcquisitionError {
    /// Message shown in place of the live video, matched to the cause
    pub fn user_message(&self) -> &'static str {
        match self {
            AcquisitionError::PermissionDenied => {
                "Camera access was denied. Allow camera and microphone access in your settings, then tap retry."
            }
            AcquisitionError::DeviceNotFound => {
                "No camera was found on this device. Connect a camera, then tap retry."
            }
            AcquisitionError::DeviceBusy => {
                "The camera is in use by another app. Close it, then tap retry."
            }
            AcquisitionError::Unsupported => {
                "This browser or app cannot use the camera. Try a different browser."
            }
            AcquisitionError::Configuration { .. } => {
                "The camera could not be configured. Tap retry to try again."
            }
            AcquisitionError::Cancelled => "Camera start was cancelled.",
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum DetectorError {
    #[error("Model load failed: {details}")]
    ModelLoad { details: String },

    #[error("Inference failed: {details}")]
    Inference { details: String },

    #[error("Detector is not ready")]
    NotReady,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No video frame available for capture")]
    NoFrame,

    #[error("Mask asset '{asset}' refused: {reason}")]
    MaskRefused { asset: String, reason: String },

    #[error("Mask asset '{asset}' failed to load: {details}")]
    MaskLoad { asset: String, details: String },

    #[error("Mask asset '{asset}' timed out after {timeout_ms}ms")]
    MaskTimeout { asset: String, timeout_ms: u64 },

    #[error("Image encoding failed: {details}")]
    Encoding { details: String },

    #[error("Unknown catalog entry '{id}'")]
    UnknownCatalogEntry { id: String },

    #[error("Imported file is not usable: {details}")]
    Import { details: String },
}

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("No supported video encoding is available; try a different browser or app")]
    NoSupportedEncoding,

    #[error("Encoding profile rejected: {details}")]
    ProfileRejected { details: String },

    #[error("Encoder failure: {details}")]
    Encoder { details: String },

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording is in progress")]
    NotRecording,

    #[error("Recording was cancelled")]
    Cancelled,

    #[error("Recording task failed: {details}")]
    Task { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload failed")]
    Failed,

    #[error("Avatar generation failed")]
    AvatarGenerationFailed,

    #[error("Nothing to upload")]
    NoArtifact,
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

impl ClubcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClubcamError>;
