use tracing::{debug, warn};

use crate::errors::{HarnessError, TransportError};
use crate::model::{GenerationRequest, GenerationResult, ModelDescriptor};
use crate::transport::ChatTransport;

use super::config::OpenRouterClientConfig;
use super::wire::{build_request_body, map_completion_response, map_models_response};

/// Transport for OpenRouter's chat-completions API.
///
/// The credential is not part of the client: it travels with each
/// `GenerationRequest`, since it is user-supplied per run.
pub struct OpenRouterTransport {
    client: reqwest::Client,
    config: OpenRouterClientConfig,
}

impl OpenRouterTransport {
    /// Creates a transport from explicit client configuration.
    pub fn new(config: OpenRouterClientConfig) -> Result<Self, HarnessError> {
        if config.base_url.trim().is_empty() {
            return Err(HarnessError::Config(
                "OpenRouter client config base_url must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build OpenRouter client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport using `OpenRouterClientConfig::from_env`.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::new(OpenRouterClientConfig::from_env()?)
    }

    async fn fetch_models(&self) -> Result<Vec<ModelDescriptor>, TransportError> {
        let response = self
            .client
            .get(self.config.models_url())
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), serde_json::Value::Null));
        }
        let value: serde_json::Value = response.json().await.map_err(|e| {
            TransportError::protocol(format!("model listing was not valid JSON: {e}"))
        })?;
        Ok(map_models_response(&value))
    }
}

#[async_trait::async_trait]
impl ChatTransport for OpenRouterTransport {
    async fn list_models(&self) -> Vec<ModelDescriptor> {
        match self.fetch_models().await {
            Ok(models) => {
                debug!(
                    event = "transport.models_listed",
                    domain = "transport",
                    count = models.len() as u64
                );
                models
            }
            Err(err) => {
                warn!(
                    event = "transport.models_list_failed",
                    domain = "transport",
                    code = err.code(),
                    error = %err
                );
                Vec::new()
            }
        }
    }

    async fn complete_chat(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, TransportError> {
        if request.api_key.trim().is_empty() {
            return Err(TransportError::MissingCredential);
        }
        let body = build_request_body(&request);
        debug!(
            event = "transport.chat_request",
            domain = "transport",
            model = request.model.as_str(),
            messages = request.messages.len() as u64,
            max_tokens = request.max_tokens,
            json_mode = request.response_format.is_some()
        );

        let response = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(request.api_key.trim())
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let text = response.text().await.map_err(network_error)?;
        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) if !status.is_success() => serde_json::Value::Null,
            Err(e) => {
                return Err(TransportError::protocol(format!(
                    "completion response was not valid JSON: {e}"
                )));
            }
        };
        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), value));
        }
        map_completion_response(&request.model, value)
    }
}

fn network_error(err: reqwest::Error) -> TransportError {
    TransportError::network(format!("OpenRouter request failed: {err}"), err.is_timeout())
}
