use async_trait::async_trait;
use tracing::info;

/// Generative avatar service.
///
/// Takes the encoded selfie and returns the generated image as a `data:` URL,
/// or `None` on failure.
#[async_trait]
pub trait AvatarGenerator: Send + Sync {
    async fn generate(&self, selfie: &[u8]) -> Option<String>;
}

/// Used when no generation service is configured; every request fails
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAvatarGenerator;

#[async_trait]
impl AvatarGenerator for DisabledAvatarGenerator {
    async fn generate(&self, selfie: &[u8]) -> Option<String> {
        info!(
            "Avatar generation requested for {} bytes but no service is configured",
            selfie.len()
        );
        None
    }
}
