mod builder;
mod manager;
mod stream;
mod synthetic;

pub use builder::MediaAcquisitionManagerBuilder;
pub use manager::{classify_platform_error, MediaAcquisitionManager};
pub use stream::{
    MediaDevices, MediaStream, MediaTrack, PlatformMediaError, StreamConstraints, StreamSettings,
    TrackKind,
};
pub use synthetic::{
    render_synthetic_frame, SyntheticDeviceConfig, SyntheticMediaDevices, SYNTHETIC_SKIN,
};
