use std::time::Duration;

use crate::errors::HarnessError;

/// Configuration for the OpenRouter transport client.
#[derive(Clone, Debug)]
pub struct OpenRouterClientConfig {
    /// Base URL for the OpenRouter-compatible API (including `/api/v1`).
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Default HTTP timeout for requests.
    pub timeout: Duration,
    /// Sent as `HTTP-Referer` for gateway-side app attribution.
    pub referer: String,
    /// Sent as `X-Title` for gateway-side app attribution.
    pub title: String,
}

impl Default for OpenRouterClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout: Duration::from_secs(120),
            referer: "https://vertiprompt.github.io".to_string(),
            title: "VertiPrompt".to_string(),
        }
    }
}

impl OpenRouterClientConfig {
    /// Builds a config from defaults plus optional environment overrides:
    /// `VERTIPROMPT_BASE_URL` and `VERTIPROMPT_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("VERTIPROMPT_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().to_string();
        }
        if let Ok(raw) = std::env::var("VERTIPROMPT_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                HarnessError::Config(format!(
                    "VERTIPROMPT_HTTP_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.timeout = Duration::from_secs(secs.max(1));
        }
        Ok(config)
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn models_url(&self) -> String {
        format!("{}/models", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
