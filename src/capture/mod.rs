mod artifact;
mod color;
mod compositor;
mod encode;
#[cfg(all(feature = "gstreamer", target_os = "linux"))]
mod gst;
mod mask;
mod metadata;
mod mjpeg;
mod recorder;

pub use artifact::{
    extension_for_mime, suggested_filename, AppliedEffects, ArtifactKind, CaptureArtifact,
};
pub use color::{
    color_filter, color_filters, normal_filter, FilterDefinition, FilterFunction, COLOR_FILTERS,
};
pub use compositor::{compose, CaptureCompositor, PhotoRequest};
pub use encode::{data_url, encode_jpeg, JPEG_MIME};
#[cfg(all(feature = "gstreamer", target_os = "linux"))]
pub use gst::GstRecorderBackend;
pub use mask::{mask, masks, AssetMaskLoader, MaskDefinition, MaskLoader, MASKS};
pub use metadata::ArtifactMetadata;
pub(crate) use metadata::save_metadata;
pub use mjpeg::{MjpegRecorderBackend, MOTION_JPEG_MIME};
pub use recorder::{
    negotiate, EncoderSession, Recorder, RecorderBackend, RecordingHandle, RecordingOutcome,
};
