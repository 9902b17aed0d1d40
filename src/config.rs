use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::frame::Facing;
use crate::session::SessionMode;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ClubcamConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Upper bound for the requested resolution (width, height); devices may deliver less
    #[serde(default = "default_camera_max_resolution")]
    pub max_resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Camera facing used when a session opens
    #[serde(default = "default_camera_facing")]
    pub default_facing: Facing,

    /// Request a microphone track alongside video
    #[serde(default = "default_camera_audio")]
    pub audio: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Time allowed for the landmark model to load before falling back
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// Minimum spacing between detection passes
    #[serde(default = "default_detection_interval_ms")]
    pub detection_interval_ms: u64,

    /// Frame downscale factor used for analysis (1=full, 2=1/2, 4=1/4)
    #[serde(default = "default_analysis_scale")]
    pub analysis_scale: u32,

    /// Minimum region area, in analysis pixels, accepted as a face
    #[serde(default = "default_min_face_area")]
    pub min_face_area: u32,

    /// Maximum number of faces reported per frame
    #[serde(default = "default_max_faces")]
    pub max_faces: usize,

    /// Optional JSON parameter file for the landmark model
    #[serde(default)]
    pub model_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    /// Render loop rate
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,

    /// Particle pool bound when faces are tracked
    #[serde(default = "default_particle_cap")]
    pub particle_cap: usize,

    /// Particle pool bound in frame-centered fallback mode
    #[serde(default = "default_fallback_particle_cap")]
    pub fallback_particle_cap: usize,

    /// Downward acceleration applied per tick, in pixels/tick²
    #[serde(default = "default_gravity")]
    pub gravity: f32,

    /// TrueType font used to rasterize glyphs; swatches are drawn when absent
    #[serde(default)]
    pub glyph_font_path: Option<String>,

    #[serde(default = "default_fallback_face_width_fraction")]
    pub fallback_face_width_fraction: f32,

    #[serde(default = "default_fallback_face_height_fraction")]
    pub fallback_face_height_fraction: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// JPEG quality for still captures (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Recording auto-stops after this many seconds
    #[serde(default = "default_max_recording_seconds")]
    pub max_recording_seconds: u32,

    /// Interval at which encoded data is flushed during recording
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,

    /// Recording timer heartbeat
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// Directory holding static mask assets
    #[serde(default = "default_mask_root")]
    pub mask_root: String,

    #[serde(default = "default_mask_load_timeout_ms")]
    pub mask_load_timeout_ms: u64,

    /// Timezone used for artifact filenames
    #[serde(default = "default_filename_timezone")]
    pub filename_timezone: String,

    /// Ordered recording encodings, best first; a no-options default is always tried last
    #[serde(default = "default_encoding_preferences")]
    pub encoding_preferences: Vec<EncodingProfile>,
}

/// One entry of the recording preference list
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct EncodingProfile {
    /// Container/codec mime type; `None` lets the backend pick
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub video_bits_per_second: Option<u32>,
    #[serde(default)]
    pub audio_bits_per_second: Option<u32>,
}

impl EncodingProfile {
    pub fn new(mime_type: &str) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            video_bits_per_second: None,
            audio_bits_per_second: None,
        }
    }

    pub fn with_bitrates(mut self, video: u32, audio: u32) -> Self {
        self.video_bits_per_second = Some(video);
        self.audio_bits_per_second = Some(audio);
        self
    }

    /// The platform default: no mime type and no bitrates
    pub fn platform_default() -> Self {
        Self::default()
    }

    pub fn has_bitrates(&self) -> bool {
        self.video_bits_per_second.is_some() || self.audio_bits_per_second.is_some()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_mode")]
    pub mode: SessionMode,

    /// Upper bound for decorative stickers attached in post mode
    #[serde(default = "default_max_stickers")]
    pub max_stickers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    /// Root directory of the local media store
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Write a JSON metadata sidecar next to each stored artifact
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl ClubcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("clubcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "camera.max_resolution",
                vec![
                    default_camera_max_resolution().0,
                    default_camera_max_resolution().1,
                ],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.default_facing", "front")?
            .set_default("camera.audio", default_camera_audio())?
            .set_default("detector.load_timeout_ms", default_load_timeout_ms())?
            .set_default(
                "detector.detection_interval_ms",
                default_detection_interval_ms(),
            )?
            .set_default("detector.analysis_scale", default_analysis_scale())?
            .set_default("detector.min_face_area", default_min_face_area())?
            .set_default("detector.max_faces", default_max_faces() as i64)?
            .set_default("overlay.refresh_hz", default_refresh_hz())?
            .set_default("overlay.particle_cap", default_particle_cap() as i64)?
            .set_default(
                "overlay.fallback_particle_cap",
                default_fallback_particle_cap() as i64,
            )?
            .set_default("overlay.gravity", default_gravity() as f64)?
            .set_default("capture.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default(
                "capture.max_recording_seconds",
                default_max_recording_seconds(),
            )?
            .set_default("capture.chunk_interval_ms", default_chunk_interval_ms())?
            .set_default("capture.heartbeat_ms", default_heartbeat_ms())?
            .set_default("capture.mask_root", default_mask_root())?
            .set_default(
                "capture.mask_load_timeout_ms",
                default_mask_load_timeout_ms(),
            )?
            .set_default("capture.filename_timezone", default_filename_timezone())?
            .set_default("session.mode", "post")?
            .set_default("session.max_stickers", default_max_stickers() as i64)?
            .set_default("upload.storage_path", default_storage_path())?
            .set_default("upload.save_metadata", default_save_metadata())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // CLUBCAM_CAPTURE__JPEG_QUALITY=80 style overrides
            .add_source(
                Environment::with_prefix("CLUBCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ClubcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.max_resolution.0 == 0 || self.camera.max_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera max_resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.detector.load_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Detector load_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.detector.analysis_scale == 0 {
            return Err(ConfigError::Message(
                "Detector analysis_scale must be at least 1".to_string(),
            ));
        }

        if self.overlay.refresh_hz == 0 {
            return Err(ConfigError::Message(
                "Overlay refresh_hz must be greater than 0".to_string(),
            ));
        }

        for (name, fraction) in [
            (
                "fallback_face_width_fraction",
                self.overlay.fallback_face_width_fraction,
            ),
            (
                "fallback_face_height_fraction",
                self.overlay.fallback_face_height_fraction,
            ),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ConfigError::Message(format!(
                    "Overlay {} must be within (0, 1]",
                    name
                )));
            }
        }

        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Capture jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.capture.max_recording_seconds == 0 {
            return Err(ConfigError::Message(
                "Capture max_recording_seconds must be greater than 0".to_string(),
            ));
        }

        if self.capture.chunk_interval_ms == 0 || self.capture.heartbeat_ms == 0 {
            return Err(ConfigError::Message(
                "Capture chunk_interval_ms and heartbeat_ms must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            max_resolution: default_camera_max_resolution(),
            fps: default_camera_fps(),
            default_facing: default_camera_facing(),
            audio: default_camera_audio(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: default_load_timeout_ms(),
            detection_interval_ms: default_detection_interval_ms(),
            analysis_scale: default_analysis_scale(),
            min_face_area: default_min_face_area(),
            max_faces: default_max_faces(),
            model_path: None,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            refresh_hz: default_refresh_hz(),
            particle_cap: default_particle_cap(),
            fallback_particle_cap: default_fallback_particle_cap(),
            gravity: default_gravity(),
            glyph_font_path: None,
            fallback_face_width_fraction: default_fallback_face_width_fraction(),
            fallback_face_height_fraction: default_fallback_face_height_fraction(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            max_recording_seconds: default_max_recording_seconds(),
            chunk_interval_ms: default_chunk_interval_ms(),
            heartbeat_ms: default_heartbeat_ms(),
            mask_root: default_mask_root(),
            mask_load_timeout_ms: default_mask_load_timeout_ms(),
            filename_timezone: default_filename_timezone(),
            encoding_preferences: default_encoding_preferences(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: default_session_mode(),
            max_stickers: default_max_stickers(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            save_metadata: default_save_metadata(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

// Default value functions
fn default_camera_max_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_facing() -> Facing {
    Facing::Front
}
fn default_camera_audio() -> bool {
    true
}

fn default_load_timeout_ms() -> u64 {
    3000
}
fn default_detection_interval_ms() -> u64 {
    66
}
fn default_analysis_scale() -> u32 {
    4
}
fn default_min_face_area() -> u32 {
    120
}
fn default_max_faces() -> usize {
    4
}

fn default_refresh_hz() -> u32 {
    60
}
fn default_particle_cap() -> usize {
    15
}
fn default_fallback_particle_cap() -> usize {
    20
}
fn default_gravity() -> f32 {
    0.15
}
fn default_fallback_face_width_fraction() -> f32 {
    0.4
}
fn default_fallback_face_height_fraction() -> f32 {
    0.5
}

fn default_jpeg_quality() -> u8 {
    90
}
fn default_max_recording_seconds() -> u32 {
    30
}
fn default_chunk_interval_ms() -> u64 {
    1000
}
fn default_heartbeat_ms() -> u64 {
    1000
}
fn default_mask_root() -> String {
    "./assets/masks".to_string()
}
fn default_mask_load_timeout_ms() -> u64 {
    2000
}
fn default_filename_timezone() -> String {
    "UTC".to_string()
}
fn default_encoding_preferences() -> Vec<EncodingProfile> {
    vec![
        EncodingProfile::new("video/webm;codecs=vp9").with_bitrates(2_500_000, 128_000),
        EncodingProfile::new("video/webm;codecs=vp8").with_bitrates(2_500_000, 128_000),
        EncodingProfile::new("video/webm").with_bitrates(2_500_000, 128_000),
        EncodingProfile::new("video/mp4").with_bitrates(2_500_000, 128_000),
        EncodingProfile::new("video/x-motion-jpeg").with_bitrates(2_500_000, 128_000),
    ]
}

fn default_session_mode() -> SessionMode {
    SessionMode::Post
}
fn default_max_stickers() -> usize {
    3
}

fn default_storage_path() -> String {
    "./uploads".to_string()
}
fn default_save_metadata() -> bool {
    true
}

fn default_event_bus_capacity() -> usize {
    100
}
