//! Language-model provider interface.

use async_trait::async_trait;

/// A model inference backend.
///
/// Two calling modes: free-text chat for answer synthesis, and
/// schema-constrained generation for the classification gate. Implementations
/// make exactly one outbound request per call and hold no conversation state.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a chat message with an optional system prompt, returning the
    /// model's text response.
    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;

    /// Generate output constrained to the given JSON schema, returning the
    /// raw JSON text. Callers own parsing and validation; providers without
    /// native constrained decoding may return best-effort JSON, which the
    /// caller must validate-and-retry rather than trust.
    async fn generate_structured(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        schema: &serde_json::Value,
    ) -> anyhow::Result<String>;

    /// Provider name for logging and error messages.
    fn name(&self) -> &str;
}
