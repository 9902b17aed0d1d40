use std::fmt;

/// Why the detector settled on the frame-centered path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The model loader reported an error
    LoadFailed(String),
    /// The model did not finish loading within the configured bound
    TimedOut,
}

/// Lifecycle of the landmark detector.
///
/// `Ready` and `FallbackStatic` are terminal for a detector instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    FallbackStatic(FallbackReason),
}

impl DetectorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DetectorState::Ready | DetectorState::FallbackStatic(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectorState::Unloaded => "unloaded",
            DetectorState::Loading => "loading",
            DetectorState::Ready => "ready",
            DetectorState::FallbackStatic(_) => "fallback_static",
        }
    }
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorState::FallbackStatic(FallbackReason::LoadFailed(details)) => {
                write!(f, "fallback_static (load failed: {})", details)
            }
            DetectorState::FallbackStatic(FallbackReason::TimedOut) => {
                write!(f, "fallback_static (load timed out)")
            }
            other => write!(f, "{}", other.name()),
        }
    }
}
