mod detection_loop;
mod landmark;
mod skin;
mod state;
mod tracker;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use detection_loop::{DetectionLoop, DetectionSnapshot};
pub use landmark::{DetectedFace, LandmarkModel, LandmarkModelLoader};
pub use skin::{SkinModelLoader, SkinModelParams, SkinRegionModel};
pub use state::{DetectorState, FallbackReason};
pub use tracker::LandmarkDetector;
