use crate::error::ApiError;

/// Hosted generative-text endpoint: one prompt in, one reply out.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}
