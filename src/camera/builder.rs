use super::manager::MediaAcquisitionManager;
use super::stream::MediaDevices;
use crate::config::CameraConfig;
use crate::error::{ClubcamError, Result};
use std::sync::Arc;

/// Builder for the media acquisition manager
pub struct MediaAcquisitionManagerBuilder {
    config: Option<CameraConfig>,
    devices: Option<Arc<dyn MediaDevices>>,
}

impl MediaAcquisitionManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            devices: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn devices(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn build(self) -> Result<MediaAcquisitionManager> {
        let config = self
            .config
            .ok_or_else(|| ClubcamError::system("Camera configuration must be specified"))?;
        let devices = self
            .devices
            .ok_or_else(|| ClubcamError::system("Media devices must be specified"))?;

        Ok(MediaAcquisitionManager::new(devices, config))
    }
}

impl Default for MediaAcquisitionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
