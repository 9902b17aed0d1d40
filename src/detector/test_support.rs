//! Scripted models and loaders shared by detector, overlay and session tests.

use super::landmark::{DetectedFace, LandmarkModel, LandmarkModelLoader};
use crate::error::DetectorError;
use crate::frame::FrameData;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Returns the same faces for every frame
pub struct FixedModel {
    pub faces: Vec<DetectedFace>,
}

impl LandmarkModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn detect(&self, _frame: &FrameData) -> Result<Vec<DetectedFace>, DetectorError> {
        Ok(self.faces.clone())
    }
}

/// Fails every other call
pub struct FlakyModel {
    pub calls: AtomicUsize,
    pub faces: Vec<DetectedFace>,
}

impl LandmarkModel for FlakyModel {
    fn name(&self) -> &str {
        "flaky"
    }

    fn detect(&self, _frame: &FrameData) -> Result<Vec<DetectedFace>, DetectorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            Err(DetectorError::Inference {
                details: "scripted failure".to_string(),
            })
        } else {
            Ok(self.faces.clone())
        }
    }
}

/// Resolves with a model after `delay`
pub struct DelayedLoader {
    pub delay: Duration,
    pub model: Arc<dyn LandmarkModel>,
}

#[async_trait]
impl LandmarkModelLoader for DelayedLoader {
    async fn load(&self) -> Result<Arc<dyn LandmarkModel>, DetectorError> {
        tokio::time::sleep(self.delay).await;
        Ok(Arc::clone(&self.model))
    }
}

/// Fails after `delay`
pub struct FailingLoader {
    pub delay: Duration,
}

#[async_trait]
impl LandmarkModelLoader for FailingLoader {
    async fn load(&self) -> Result<Arc<dyn LandmarkModel>, DetectorError> {
        tokio::time::sleep(self.delay).await;
        Err(DetectorError::ModelLoad {
            details: "scripted load failure".to_string(),
        })
    }
}

/// Never resolves
pub struct PendingLoader;

#[async_trait]
impl LandmarkModelLoader for PendingLoader {
    async fn load(&self) -> Result<Arc<dyn LandmarkModel>, DetectorError> {
        std::future::pending().await
    }
}

pub fn fixed_loader(faces: Vec<DetectedFace>) -> Arc<dyn LandmarkModelLoader> {
    Arc::new(DelayedLoader {
        delay: Duration::ZERO,
        model: Arc::new(FixedModel { faces }),
    })
}
