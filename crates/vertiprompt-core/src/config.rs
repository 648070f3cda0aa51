use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{DEFAULT_MODEL, FALLBACK_MODEL};
use crate::contract::ResponseContract;
use crate::errors::ConfigError;
use crate::orchestrator::Orchestrator;
use crate::policy::RetryPolicy;
use crate::prompt::SliceHints;

/// Settings shared by every run of a `Generator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Slice count the model is asked to aim for.
    #[serde(default = "default_num_slices")]
    pub num_slices: u32,
    /// Upper slice count hint. Replies above it are accepted with a warning.
    #[serde(default = "default_max_slices")]
    pub max_slices: u32,
    /// Descriptions shorter than this (in characters) are rejected.
    #[serde(default = "default_min_description_chars")]
    pub min_description_chars: usize,
    #[serde(default = "RetryPolicy::primary")]
    pub primary_retry: RetryPolicy,
    #[serde(default = "RetryPolicy::fallback")]
    pub fallback_retry: RetryPolicy,
    #[serde(default)]
    pub contract: ResponseContract,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn fallback_model() -> String {
    FALLBACK_MODEL.to_string()
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_num_slices() -> u32 {
    3
}

const fn default_max_slices() -> u32 {
    5
}

const fn default_min_description_chars() -> usize {
    50
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            fallback_model: fallback_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            num_slices: default_num_slices(),
            max_slices: default_max_slices(),
            min_description_chars: default_min_description_chars(),
            primary_retry: RetryPolicy::primary(),
            fallback_retry: RetryPolicy::fallback(),
            contract: ResponseContract::default(),
        }
    }
}

impl GenerationSettings {
    /// Defaults overridden by `VERTIPROMPT_*` environment variables:
    /// `DEFAULT_MODEL`, `FALLBACK_MODEL`, `MAX_TOKENS`, `TEMPERATURE`,
    /// `NUM_SLICES`, `MAX_SLICES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(model) = env_value::<String>("VERTIPROMPT_DEFAULT_MODEL")? {
            settings.default_model = model;
        }
        if let Some(model) = env_value::<String>("VERTIPROMPT_FALLBACK_MODEL")? {
            settings.fallback_model = model;
        }
        if let Some(max_tokens) = env_value("VERTIPROMPT_MAX_TOKENS")? {
            settings.max_tokens = max_tokens;
        }
        if let Some(temperature) = env_value("VERTIPROMPT_TEMPERATURE")? {
            settings.temperature = temperature;
        }
        if let Some(num_slices) = env_value("VERTIPROMPT_NUM_SLICES")? {
            settings.num_slices = num_slices;
        }
        if let Some(max_slices) = env_value("VERTIPROMPT_MAX_SLICES")? {
            settings.max_slices = max_slices;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() || self.fallback_model.trim().is_empty() {
            return Err(ConfigError("model ids must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError("max_tokens must be greater than 0".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.num_slices == 0 || self.max_slices < self.num_slices {
            return Err(ConfigError(format!(
                "slice hints must satisfy 0 < num_slices <= max_slices, got {}/{}",
                self.num_slices, self.max_slices
            )));
        }
        Ok(())
    }

    pub fn hints(&self) -> SliceHints {
        SliceHints {
            num_slices: self.num_slices,
            max_slices: self.max_slices,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.primary_retry.clone(),
            self.fallback_retry.clone(),
            self.fallback_model.clone(),
        )
    }
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ConfigError(format!("could not parse {key}={raw:?}")))
}
