use crate::error::LlmError;

/// One credentialed completion client.
///
/// Implementations make a single network call per invocation. Retrying is the
/// caller's job (see [`crate::RetryPolicy`]).
#[async_trait::async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send `prompt` as a single user message and return the first choice's text.
    async fn complete(&self, prompt: &str, model: &str, temperature: f32)
    -> Result<String, LlmError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
