use std::fmt;

/// Per-million-token prices for one model.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pricing {
    /// Price per million prompt tokens.
    pub prompt: f64,
    /// Price per million completion tokens.
    pub completion: f64,
}

impl Pricing {
    pub const fn new(prompt: f64, completion: f64) -> Self {
        Self { prompt, completion }
    }
}

/// A model the gateway can route to.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelDescriptor {
    /// Gateway model id (for example `openai/o3-pro`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    pub pricing: Pricing,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, pricing: Pricing) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pricing,
        }
    }
}

/// Role of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat-completion request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Requested output format for the completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Ask the model for a single JSON object.
    JsonObject,
}

/// A single chat-completion request.
///
/// Built fresh for every attempt; the pipeline never reuses one across models.
#[derive(Clone, PartialEq)]
pub struct GenerationRequest {
    /// Credential passed through to the gateway as a bearer token.
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: Option<ResponseFormat>,
}

impl GenerationRequest {
    /// Creates a request with default generation parameters (2048 tokens,
    /// temperature 0.3, no response format).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            messages,
            max_tokens: 2048,
            temperature: 0.3,
            response_format: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn response_format(mut self, format: Option<ResponseFormat>) -> Self {
        self.response_format = format;
        self
    }
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("response_format", &self.response_format)
            .finish()
    }
}

/// Token counts reported by the gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// The parsed shape of a successful completion.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationResult {
    /// Model that actually served the request (may differ from the requested
    /// one when the gateway routes automatically).
    pub model_id: String,
    pub usage: Option<TokenUsage>,
    /// Raw reply text. Untrusted: it is whatever the model produced.
    pub content: String,
}
