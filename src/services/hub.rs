use super::avatar::{AvatarGenerator, DisabledAvatarGenerator};
use super::upload::{LocalUploadService, UploadService};
use crate::config::UploadConfig;
use crate::error::{ClubcamError, Result};

use std::sync::{Arc, OnceLock};
use tracing::info;

/// External collaborators shared by every session
#[derive(Clone)]
pub struct ServiceHub {
    upload: Arc<dyn UploadService>,
    avatar: Arc<dyn AvatarGenerator>,
}

static SERVICES: OnceLock<ServiceHub> = OnceLock::new();

impl ServiceHub {
    pub fn new(upload: Arc<dyn UploadService>, avatar: Arc<dyn AvatarGenerator>) -> Self {
        Self { upload, avatar }
    }

    /// Local file storage and no avatar generation
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            Arc::new(LocalUploadService::from_config(config)),
            Arc::new(DisabledAvatarGenerator),
        )
    }

    pub fn upload(&self) -> &Arc<dyn UploadService> {
        &self.upload
    }

    pub fn avatar(&self) -> &Arc<dyn AvatarGenerator> {
        &self.avatar
    }

    /// Make `hub` the process-wide instance. Fails if one is already installed.
    pub fn install(hub: ServiceHub) -> Result<&'static ServiceHub> {
        SERVICES
            .set(hub)
            .map_err(|_| ClubcamError::system("Service hub is already installed"))?;
        info!("Service hub installed");
        SERVICES
            .get()
            .ok_or_else(|| ClubcamError::system("Service hub installation was lost"))
    }

    pub fn global() -> Option<&'static ServiceHub> {
        SERVICES.get()
    }
}
