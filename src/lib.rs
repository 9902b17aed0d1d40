pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod frame;
pub mod geometry;
pub mod overlay;
pub mod services;
pub mod session;

pub use app::{CaptureScript, ClubcamOrchestrator, RunReport, ShutdownReason};
pub use camera::{MediaAcquisitionManager, MediaStream, SyntheticMediaDevices};
pub use capture::{CaptureArtifact, CaptureCompositor, Recorder};
pub use config::ClubcamConfig;
pub use detector::{DetectorState, LandmarkDetector};
pub use error::{ClubcamError, Result};
pub use events::{EventBus, SessionEvent};
pub use frame::{Facing, FrameData};
pub use overlay::{ArRenderer, OverlayRenderLoop};
pub use services::ServiceHub;
pub use session::{CaptureSessionController, SessionMode, SessionPhase, SessionState};
