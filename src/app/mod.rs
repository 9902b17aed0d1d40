mod orchestrator;
mod runtime;
mod shutdown;
mod types;


pub use orchestrator::{ClubcamOrchestrator, ShutdownHandle};
pub use types::{ArtifactSummary, CaptureScript, RunReport, ShutdownReason};
