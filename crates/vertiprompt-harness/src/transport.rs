use crate::errors::TransportError;
use crate::model::{GenerationRequest, GenerationResult, ModelDescriptor};

/// Contract for a chat-completion gateway.
///
/// Implementations perform exactly one network call per method invocation;
/// retries and fallback belong to the caller.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Lists models offered by the gateway.
    ///
    /// Never fails: any error is logged and yields an empty list.
    async fn list_models(&self) -> Vec<ModelDescriptor>;

    /// Requests one chat completion.
    async fn complete_chat(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, TransportError>;
}
