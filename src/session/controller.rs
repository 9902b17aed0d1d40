use super::state::{sticker, SessionMode, SessionPhase, SessionState};
use crate::camera::{MediaAcquisitionManager, MediaDevices, MediaStream, SyntheticMediaDevices};
use crate::capture::{
    color_filter, mask, AssetMaskLoader, CaptureArtifact, CaptureCompositor, MaskLoader,
    MjpegRecorderBackend, PhotoRequest, Recorder, RecorderBackend, RecordingHandle,
};
use crate::config::ClubcamConfig;
use crate::detector::{
    DetectionLoop, DetectorState, LandmarkDetector, LandmarkModelLoader, SkinModelLoader,
};
use crate::error::{
    AcquisitionError, CaptureError, ClubcamError, RecordingError, Result, UploadError,
};
use crate::events::{EventBus, SessionEvent};
use crate::frame::Facing;
use crate::overlay::{
    ar_filter, painter_from_config, ArRenderer, OverlayRenderLoop, OverlaySurface, RenderInputs,
    SharedOverlay, StdRandom, TickReport,
};
use crate::services::{ServiceHub, UploadCategory};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Platform capabilities and collaborators a session runs against
pub struct SessionDependencies {
    pub devices: Arc<dyn MediaDevices>,
    pub model_loader: Arc<dyn LandmarkModelLoader>,
    pub mask_loader: Arc<dyn MaskLoader>,
    pub recorder_backend: Arc<dyn RecorderBackend>,
    pub services: ServiceHub,
    pub event_bus: Arc<EventBus>,
}

impl SessionDependencies {
    /// Built-in implementations: synthetic camera, skin-region detector,
    /// asset-root masks, motion JPEG recording, and the installed service hub
    /// (local storage when none is installed)
    pub fn from_config(config: &ClubcamConfig) -> Self {
        let services = ServiceHub::global()
            .cloned()
            .unwrap_or_else(|| ServiceHub::from_config(&config.upload));

        Self {
            devices: Arc::new(SyntheticMediaDevices::default()),
            model_loader: Arc::new(SkinModelLoader::new(config.detector.clone())),
            mask_loader: Arc::new(AssetMaskLoader::from_config(&config.capture)),
            recorder_backend: default_recorder_backend(config),
            services,
            event_bus: Arc::new(EventBus::new(config.system.event_bus_capacity)),
        }
    }
}

#[cfg(all(feature = "gstreamer", target_os = "linux"))]
fn default_recorder_backend(config: &ClubcamConfig) -> Arc<dyn RecorderBackend> {
    match crate::capture::GstRecorderBackend::new() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            warn!("GStreamer unavailable, recording motion JPEG: {}", e);
            Arc::new(MjpegRecorderBackend::new(config.capture.jpeg_quality))
        }
    }
}

#[cfg(not(all(feature = "gstreamer", target_os = "linux")))]
fn default_recorder_backend(config: &ClubcamConfig) -> Arc<dyn RecorderBackend> {
    Arc::new(MjpegRecorderBackend::new(config.capture.jpeg_quality))
}

/// Loops tied to one live stream
struct LiveLoops {
    scope: CancellationToken,
    detection: DetectionLoop,
    render: OverlayRenderLoop,
}

impl LiveLoops {
    async fn stop(mut self) {
        self.scope.cancel();
        self.render.stop().await;
        self.detection.stop().await;
    }
}

/// Drives one capture flow: capture phase with live preview, then edit.
///
/// The controller is the only mutable owner of session state. Background
/// work (detector load, detection, overlay rendering, recording) runs in
/// tasks scoped under the session's shutdown token.
pub struct CaptureSessionController {
    config: ClubcamConfig,
    camera: MediaAcquisitionManager,
    detector: Arc<LandmarkDetector>,
    model_loader: Arc<dyn LandmarkModelLoader>,
    detector_load: Option<JoinHandle<DetectorState>>,
    detector_events: Option<JoinHandle<()>>,
    overlay: SharedOverlay,
    loops: Option<LiveLoops>,
    compositor: CaptureCompositor,
    recorder: Recorder,
    recording: Option<RecordingHandle>,
    services: ServiceHub,
    event_bus: Arc<EventBus>,
    state: SessionState,
    artifact: Option<CaptureArtifact>,
    initial_facing: Facing,
    shutdown: CancellationToken,
    closed: bool,
}

impl CaptureSessionController {
    pub fn new(config: ClubcamConfig, deps: SessionDependencies) -> Self {
        let (width, height) = config.camera.max_resolution;
        let initial_facing = config.camera.default_facing;
        let state = SessionState::fresh(config.session.mode, initial_facing);

        Self {
            camera: MediaAcquisitionManager::new(deps.devices, config.camera.clone()),
            detector: Arc::new(LandmarkDetector::new(config.detector.clone())),
            model_loader: deps.model_loader,
            detector_load: None,
            detector_events: None,
            overlay: OverlaySurface::shared(width, height),
            loops: None,
            compositor: CaptureCompositor::new(config.capture.clone(), deps.mask_loader),
            recorder: Recorder::new(config.capture.clone(), deps.recorder_backend)
                .with_event_bus(Arc::clone(&deps.event_bus)),
            recording: None,
            services: deps.services,
            event_bus: deps.event_bus,
            state,
            artifact: None,
            initial_facing,
            shutdown: CancellationToken::new(),
            closed: false,
            config,
        }
    }

    /// Snapshot of the session as the UI would render it. A recording that
    /// stopped on its own is collected first, so the snapshot is in edit.
    pub async fn state(&mut self) -> SessionState {
        self.settle_recording().await;

        let mut state = self.state.clone();
        state.detector = self.detector.state().name().to_string();
        if let Some(recording) = &self.recording {
            state.recording = !recording.is_finished();
            state.recording_elapsed = recording.elapsed();
        }
        state
    }

    /// Phase as of the last controller call
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Artifact as of the last controller call
    pub fn artifact(&self) -> Option<&CaptureArtifact> {
        self.artifact.as_ref()
    }

    pub fn detector(&self) -> &Arc<LandmarkDetector> {
        &self.detector
    }

    pub fn overlay(&self) -> &SharedOverlay {
        &self.overlay
    }

    pub fn active_stream(&self) -> Option<&MediaStream> {
        self.camera.active_stream()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Last overlay tick, while the camera is live
    pub fn render_report(&self) -> Option<TickReport> {
        self.loops.as_ref().map(|loops| loops.render.last_report())
    }

    /// Cancelling this token abandons a pending acquisition and stops every
    /// background task; follow up with `close`
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &ClubcamConfig {
        &self.config
    }

    /// Enter the capture phase: start the detector load and acquire the camera.
    ///
    /// An acquisition failure is kept in the state for `retry`.
    pub async fn open(&mut self, facing: Option<Facing>) -> Result<()> {
        self.ensure_open()?;
        let facing = facing.unwrap_or(self.config.camera.default_facing);
        self.initial_facing = facing;
        self.state = SessionState::fresh(self.config.session.mode, facing);

        self.start_detector();
        info!("Capture session opened ({} mode, {} camera)", self.state.mode, facing);
        self.acquire(facing).await?;
        Ok(())
    }

    /// Re-run acquisition after a failure
    pub async fn retry(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.ensure_phase(SessionPhase::Capture, "retry")?;
        info!("Retrying camera acquisition");
        self.acquire(self.state.facing).await?;
        Ok(())
    }

    pub async fn select_filter(&mut self, id: &str) -> Result<()> {
        self.ensure_capture_selection("select a filter").await?;
        let filter = color_filter(id).ok_or_else(|| CaptureError::UnknownCatalogEntry {
            id: id.to_string(),
        })?;
        debug!("Color filter: {} ({})", filter.id, filter.expression());
        self.state.color_filter = filter.id.to_string();
        Ok(())
    }

    pub async fn select_mask(&mut self, id: &str) -> Result<()> {
        self.ensure_capture_selection("select a mask").await?;
        let mask = mask(id).ok_or_else(|| CaptureError::UnknownCatalogEntry {
            id: id.to_string(),
        })?;
        debug!("Mask: {}", mask.id);
        self.state.mask = mask.id.to_string();
        Ok(())
    }

    /// Select or clear the AR filter; the overlay picks it up on its next tick
    pub async fn select_ar_filter(&mut self, id: Option<&str>) -> Result<()> {
        self.ensure_capture_selection("select an AR filter").await?;
        let filter = match id {
            Some(id) => Some(ar_filter(id).ok_or_else(|| CaptureError::UnknownCatalogEntry {
                id: id.to_string(),
            })?),
            None => None,
        };

        if let Some(loops) = &self.loops {
            loops.render.set_filter(filter);
        }
        debug!("AR filter: {}", filter.map(|f| f.id).unwrap_or("none"));
        self.state.ar_filter = filter.map(|f| f.id.to_string());
        Ok(())
    }

    /// Release the stream and re-acquire with the other camera
    pub async fn toggle_facing(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.settle_recording().await;
        self.ensure_phase(SessionPhase::Capture, "switch camera")?;
        if self.recording.is_some() {
            return Err(RecordingError::AlreadyRecording.into());
        }

        let facing = self.state.facing.toggled();
        info!("Switching to {} camera", facing);
        self.state.facing = facing;
        self.acquire(facing).await?;
        Ok(())
    }

    /// Best-effort; returns whether the torch followed the request
    pub fn set_torch(&mut self, on: bool) -> bool {
        let applied = self.camera.set_torch(on);
        self.state.torch = applied && on;
        applied
    }

    /// Tap on the shutter: composite a still and move to edit
    pub async fn shutter_tap(&mut self) -> Result<()> {
        self.settle_recording().await;
        self.ensure_live("capture a photo")?;
        if self.recording.is_some() {
            return Err(RecordingError::AlreadyRecording.into());
        }

        let frame = self
            .camera
            .active_stream()
            .and_then(MediaStream::latest_frame)
            .ok_or(CaptureError::NoFrame)?;

        let filter = color_filter(&self.state.color_filter).ok_or_else(|| {
            CaptureError::UnknownCatalogEntry {
                id: self.state.color_filter.clone(),
            }
        })?;
        let mask = mask(&self.state.mask).filter(|mask| mask.asset.is_some());

        let artifact = self
            .compositor
            .capture_photo(PhotoRequest {
                frame: &frame,
                facing: self.state.facing,
                filter,
                overlay: Some(&self.overlay),
                ar_filter: self.state.ar_filter.as_deref(),
                mask,
            })
            .await?;

        self.event_bus.notify(SessionEvent::PhotoCaptured {
            artifact_id: artifact.id.clone(),
        });
        self.enter_edit(artifact).await;
        Ok(())
    }

    /// Press and hold: start recording the live stream
    pub async fn shutter_press(&mut self) -> Result<()> {
        self.settle_recording().await;
        self.ensure_live("record")?;
        if self.recording.is_some() {
            return Err(RecordingError::AlreadyRecording.into());
        }

        let stream = self
            .camera
            .active_stream()
            .cloned()
            .ok_or(CaptureError::NoFrame)?;

        match self.recorder.start(&stream, &self.shutdown) {
            Ok(handle) => {
                self.event_bus.notify(SessionEvent::RecordingStarted {
                    mime_type: handle.mime_type().to_string(),
                });
                self.state.recording = true;
                self.state.recording_elapsed = Duration::ZERO;
                self.state.recording_error = None;
                self.recording = Some(handle);
                Ok(())
            }
            Err(e) => {
                error!("Recording could not start: {}", e);
                self.state.recording_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Release the shutter. Stops a recording; otherwise nothing happens.
    pub async fn shutter_release(&mut self) -> Result<()> {
        match self.recording.take() {
            Some(handle) => self.finish_recording(handle).await,
            None => {
                debug!("Shutter released with no recording in progress");
                Ok(())
            }
        }
    }

    /// Collect a recording that ended on its own (duration limit or stream end).
    /// Returns true when the session moved to edit.
    pub async fn poll_recording(&mut self) -> Result<bool> {
        let finished = self
            .recording
            .as_ref()
            .map(RecordingHandle::is_finished)
            .unwrap_or(false);

        if let Some(recording) = &self.recording {
            self.state.recording_elapsed = recording.elapsed();
        }
        if !finished {
            return Ok(false);
        }

        match self.recording.take() {
            Some(handle) => {
                self.finish_recording(handle).await?;
                Ok(self.state.phase == SessionPhase::Edit)
            }
            None => Ok(false),
        }
    }

    /// Use a file from outside the live camera; the camera is released
    pub async fn import_file(&mut self, data: Vec<u8>, mime_type: &str) -> Result<()> {
        self.ensure_open()?;
        self.settle_recording().await;
        self.ensure_phase(SessionPhase::Capture, "import a file")?;
        if self.recording.is_some() {
            return Err(RecordingError::AlreadyRecording.into());
        }

        let artifact = self.compositor.import_file(data, mime_type)?;
        info!("Imported {} ({} bytes)", artifact.mime_type, artifact.len());
        self.enter_edit(artifact).await;
        Ok(())
    }

    pub async fn set_caption(&mut self, caption: &str) -> Result<()> {
        self.settle_recording().await;
        self.ensure_post_edit("caption")?;
        self.state.caption = caption.to_string();
        Ok(())
    }

    /// Add or remove a sticker; returns whether it is now selected.
    /// Adding beyond `session.max_stickers` is refused.
    pub async fn toggle_sticker(&mut self, id: &str) -> Result<bool> {
        self.settle_recording().await;
        self.ensure_post_edit("stickers")?;
        let sticker = sticker(id).ok_or_else(|| CaptureError::UnknownCatalogEntry {
            id: id.to_string(),
        })?;

        if let Some(index) = self.state.stickers.iter().position(|s| s == sticker.id) {
            self.state.stickers.remove(index);
            return Ok(false);
        }

        if self.state.stickers.len() >= self.config.session.max_stickers {
            return Err(ClubcamError::component(
                "session",
                &format!(
                    "At most {} stickers can be attached",
                    self.config.session.max_stickers
                ),
            ));
        }
        self.state.stickers.push(sticker.id.to_string());
        Ok(true)
    }

    /// Discard the artifact and start over with a fresh capture phase
    pub async fn back(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.settle_recording().await;
        self.ensure_phase(SessionPhase::Edit, "go back")?;

        self.discard_to_capture();
        info!("Back to capture");
        self.acquire(self.initial_facing).await?;
        Ok(())
    }

    /// Upload to the category for the session mode: posts, or avatars when
    /// the photo is used directly as an avatar
    pub async fn publish(&mut self) -> Result<String> {
        let category = match self.state.mode {
            SessionMode::Post => UploadCategory::Posts,
            SessionMode::Avatar => UploadCategory::Avatars,
        };
        self.publish_to(category).await
    }

    /// Upload the artifact. A failed upload keeps it for another attempt.
    pub async fn publish_to(&mut self, category: UploadCategory) -> Result<String> {
        self.ensure_open()?;
        self.settle_recording().await;
        self.ensure_phase(SessionPhase::Edit, "publish")?;
        let artifact = self.artifact.as_ref().ok_or(UploadError::NoArtifact)?;

        match self.services.upload().upload(artifact, category).await {
            Some(url) => {
                info!("Published {} to {}", artifact.id, category);
                self.state.upload_error = None;
                self.state.published_url = Some(url.clone());
                self.event_bus
                    .notify(SessionEvent::UploadCompleted { url: url.clone() });
                Ok(url)
            }
            None => {
                error!("Upload of {} to {} failed", artifact.id, category);
                self.state.upload_error = Some(UploadError::Failed.to_string());
                self.event_bus.notify(SessionEvent::UploadFailed);
                Err(UploadError::Failed.into())
            }
        }
    }

    /// Avatar mode: send the photo to the generative avatar service.
    /// A failure is recorded for retry and the session stays in edit.
    pub async fn use_for_ai(&mut self) -> Result<String> {
        self.ensure_open()?;
        self.settle_recording().await;
        self.ensure_phase(SessionPhase::Edit, "generate an avatar")?;
        if self.state.mode != SessionMode::Avatar {
            return Err(ClubcamError::component(
                "session",
                "Avatar generation is only available in avatar mode",
            ));
        }
        let artifact = self.artifact.as_ref().ok_or(UploadError::NoArtifact)?;
        if !artifact.is_image() {
            return Err(ClubcamError::component(
                "session",
                "Avatar generation needs a photo",
            ));
        }

        match self.services.avatar().generate(&artifact.bytes).await {
            Some(image) => {
                info!("Avatar generated from {}", artifact.id);
                self.state.avatar_error = None;
                self.state.avatar_preview = Some(image.clone());
                self.event_bus.notify(SessionEvent::AvatarGenerated);
                Ok(image)
            }
            None => {
                warn!("Avatar generation failed for {}", artifact.id);
                self.state.avatar_error = Some(UploadError::AvatarGenerationFailed.to_string());
                self.event_bus.notify(SessionEvent::AvatarFailed);
                Err(UploadError::AvatarGenerationFailed.into())
            }
        }
    }

    /// Leave the flow. An edit in progress is discarded first. Every task,
    /// track and timer of the session is stopped. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.settle_recording().await;
        self.closed = true;

        if self.state.phase == SessionPhase::Edit {
            self.discard_to_capture();
        }

        self.shutdown.cancel();

        if let Some(recording) = self.recording.take() {
            recording.abort().await;
            self.state.recording = false;
        }

        self.release_camera().await;

        if let Some(load) = self.detector_load.take() {
            load.abort();
        }
        if let Some(forwarder) = self.detector_events.take() {
            let _ = forwarder.await;
        }

        info!("Capture session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ClubcamError::component("session", "Session is closed"));
        }
        Ok(())
    }

    fn ensure_phase(&self, phase: SessionPhase, action: &str) -> Result<()> {
        if self.state.phase != phase {
            return Err(ClubcamError::component(
                "session",
                &format!("Cannot {} in the {} phase", action, self.state.phase),
            ));
        }
        Ok(())
    }

    fn ensure_live(&self, action: &str) -> Result<()> {
        self.ensure_open()?;
        self.ensure_phase(SessionPhase::Capture, action)?;
        if !self.camera.is_open() {
            return Err(CaptureError::NoFrame.into());
        }
        Ok(())
    }

    /// Selections belong to the live view of an open session
    async fn ensure_capture_selection(&mut self, action: &str) -> Result<()> {
        self.ensure_open()?;
        self.settle_recording().await;
        self.ensure_phase(SessionPhase::Capture, action)
    }

    fn ensure_post_edit(&self, what: &str) -> Result<()> {
        self.ensure_phase(SessionPhase::Edit, &format!("edit {}", what))?;
        if self.state.mode != SessionMode::Post {
            return Err(ClubcamError::component(
                "session",
                &format!("{} are only available in post mode", what),
            ));
        }
        Ok(())
    }

    /// Load the detector once per session, forwarding its state changes
    fn start_detector(&mut self) {
        if self.detector_load.is_some() {
            return;
        }

        let mut states = self.detector.subscribe();
        self.detector_load = Some(self.detector.spawn_loading(Arc::clone(&self.model_loader)));

        let event_bus = Arc::clone(&self.event_bus);
        let cancel = self.shutdown.clone();
        self.detector_events = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = states.borrow_and_update().clone();
                        event_bus.notify(SessionEvent::DetectorStateChanged {
                            state: state.name().to_string(),
                        });
                        if state.is_terminal() {
                            break;
                        }
                    }
                }
            }
        }));
    }

    async fn acquire(&mut self, facing: Facing) -> std::result::Result<(), AcquisitionError> {
        self.stop_loops().await;

        match self.camera.open_cancellable(facing, &self.shutdown).await {
            Ok(stream) => {
                let settings = stream.settings();
                self.state.facing = facing;
                self.state.camera_live = true;
                self.state.torch = false;
                self.state.camera_error = None;
                self.start_loops(&stream);
                self.event_bus.notify(SessionEvent::CameraOpened {
                    facing,
                    width: settings.width,
                    height: settings.height,
                });
                Ok(())
            }
            Err(e) => {
                self.state.camera_live = false;
                self.state.torch = false;
                if e != AcquisitionError::Cancelled {
                    error!("Camera unavailable: {}", e);
                    self.state.camera_error = Some(e.user_message().to_string());
                    self.event_bus.notify(SessionEvent::CameraFailed {
                        reason: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    fn start_loops(&mut self, stream: &MediaStream) {
        let scope = self.shutdown.child_token();
        let overlay_config = self.config.overlay.clone();

        let detection = DetectionLoop::spawn(
            Arc::clone(&self.detector),
            stream.frames(),
            Duration::from_millis(self.config.detector.detection_interval_ms),
            &scope,
        );

        let renderer = ArRenderer::new(
            overlay_config.clone(),
            painter_from_config(overlay_config.glyph_font_path.as_deref()),
            Box::new(StdRandom::from_entropy()),
        );
        let render = OverlayRenderLoop::spawn(
            renderer,
            Arc::clone(&self.overlay),
            RenderInputs {
                frames: stream.frames(),
                detector: Arc::clone(&self.detector),
                detections: detection.results(),
            },
            overlay_config.refresh_hz,
            &scope,
        );
        render.set_filter(self.state.ar_filter.as_deref().and_then(ar_filter));

        self.loops = Some(LiveLoops {
            scope,
            detection,
            render,
        });
    }

    async fn stop_loops(&mut self) {
        if let Some(loops) = self.loops.take() {
            loops.stop().await;
        }
    }

    async fn release_camera(&mut self) {
        self.stop_loops().await;
        if self.camera.active_stream().is_some() {
            self.camera.close();
            self.event_bus.notify(SessionEvent::CameraReleased);
        }
        self.state.camera_live = false;
        self.state.torch = false;
    }

    async fn finish_recording(&mut self, handle: RecordingHandle) -> Result<()> {
        self.state.recording = false;
        match handle.stop().await {
            Ok(outcome) => {
                let duration = outcome.artifact.duration.unwrap_or_default();
                self.state.recording_elapsed = duration;
                debug!(
                    "Collected {:.1}s clip (auto-stopped: {})",
                    duration.as_secs_f32(),
                    outcome.auto_stopped
                );
                self.enter_edit(outcome.artifact).await;
                Ok(())
            }
            Err(RecordingError::Cancelled) => {
                debug!("Recording cancelled");
                Ok(())
            }
            Err(e) => {
                error!("Recording failed: {}", e);
                self.state.recording_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Collect a recording that ended without a release. A failure stays in
    /// `recording_error`.
    async fn settle_recording(&mut self) {
        if let Err(e) = self.poll_recording().await {
            debug!("Finished recording could not be collected: {}", e);
        }
    }

    async fn enter_edit(&mut self, artifact: CaptureArtifact) {
        self.release_camera().await;
        self.artifact = Some(artifact);
        self.state.has_artifact = true;
        self.state.recording = false;
        self.state.phase = SessionPhase::Edit;
        info!("Entered edit phase");
        self.event_bus.notify(SessionEvent::PhaseChanged {
            phase: SessionPhase::Edit.to_string(),
        });
    }

    /// Drop the artifact and every edit/capture selection
    fn discard_to_capture(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            debug!("Discarding artifact {}", artifact.id);
        }
        self.state = SessionState::fresh(self.state.mode, self.initial_facing);
        self.event_bus.notify(SessionEvent::PhaseChanged {
            phase: SessionPhase::Capture.to_string(),
        });
    }
}

impl Drop for CaptureSessionController {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(load) = self.detector_load.take() {
            load.abort();
        }
    }
}
