use thiserror::Error;
use vertiprompt_harness::TransportError;

/// The model answered, but its reply did not contain a usable slice list.
///
/// Every variant keeps the raw reply for diagnostics. Parse errors halt a run
/// and are never retried: the gateway already returned success, so another
/// attempt would most likely repeat the same output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("reply is not valid JSON: {reason}")]
    InvalidJson { reason: String, raw: String },
    #[error("reply does not match the slice schema: {reason}")]
    Schema { reason: String, raw: String },
    #[error("reply contains no slices")]
    NoSlices { raw: String },
}

impl ParseError {
    /// The reply text that failed to parse.
    pub fn raw(&self) -> &str {
        match self {
            Self::InvalidJson { raw, .. } | Self::Schema { raw, .. } | Self::NoSlices { raw } => {
                raw
            }
        }
    }
}

/// Error that halts a generation run after it has started.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Retry and fallback were exhausted, or the failure was permanent.
    #[error("generation failed on {model} after {attempts} attempt(s): {error}")]
    Transport {
        error: TransportError,
        model: String,
        attempts: u32,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The caller abandoned the run through its abort handle.
    #[error("generation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Short stable code used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { error, .. } => error.code(),
            Self::Parse(ParseError::InvalidJson { .. }) => "parse.invalid_json",
            Self::Parse(ParseError::Schema { .. }) => "parse.schema_mismatch",
            Self::Parse(ParseError::NoSlices { .. }) => "parse.no_slices",
            Self::Cancelled => "run.cancelled",
        }
    }
}

/// Error that prevents a generation run from starting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Another run is already in flight on this generator.
    #[error("a generation is already in progress")]
    Busy,
    /// Invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),
}

/// An export file could not be imported. Nothing is loaded when this occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportFormatError {
    #[error("file is too large ({size} bytes, max {limit})")]
    TooLarge { size: usize, limit: usize },
    #[error("file is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid or unsupported file format: schemaVersion {found:?}")]
    UnsupportedSchemaVersion { found: Option<String> },
    #[error("invalid or unsupported file format: slices must be an array")]
    SlicesNotArray,
    #[error("invalid slice at index {index}: {reason}")]
    InvalidSlice { index: usize, reason: String },
}

/// Session file read/write failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);
