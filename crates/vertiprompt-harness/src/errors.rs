/// Errors returned by a `ChatTransport` call.
///
/// The pipeline classifies these as transient or permanent through
/// [`TransportError::is_transient`]; everything else about them is diagnostic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// No credential was supplied, so no request was sent.
    #[error("API key is missing")]
    MissingCredential,
    /// Gateway answered with a non-success HTTP status.
    #[error("gateway error (status {status}): {message}")]
    Status {
        status: u16,
        message: String,
        /// Decoded error body, or `Value::Null` when the body was not JSON.
        payload: serde_json::Value,
    },
    /// The request never produced an HTTP response (connect, timeout, read).
    #[error("transport failure: {message}")]
    Network { message: String, timed_out: bool },
    /// A success response whose body did not have the expected shape.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl TransportError {
    /// Creates a status error from a decoded error payload.
    ///
    /// The message is taken from `error.message` when the gateway sent one,
    /// otherwise it falls back to `HTTP Error: <status>`.
    pub fn status(status: u16, payload: serde_json::Value) -> Self {
        let message = payload
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("HTTP Error: {status}"));
        Self::Status {
            status,
            message,
            payload,
        }
    }

    /// Creates a network-level error.
    pub fn network(message: impl Into<String>, timed_out: bool) -> Self {
        Self::Network {
            message: message.into(),
            timed_out,
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// HTTP status code, when the gateway produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw decoded error payload, when the gateway produced one.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Status { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Returns true for failures likely to succeed on retry: HTTP 429, any
    /// 5xx, and requests that timed out. A connection that could not be made
    /// at all is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Network { timed_out, .. } => *timed_out,
            Self::MissingCredential | Self::Protocol { .. } => false,
        }
    }

    /// Short stable code used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "transport.auth_missing",
            Self::Status { status: 429, .. } => "transport.rate_limited",
            Self::Status { status, .. } if *status >= 500 => "transport.gateway_5xx",
            Self::Status { .. } => "transport.rejected",
            Self::Network { timed_out: true, .. } => "transport.timeout",
            Self::Network { .. } => "transport.network",
            Self::Protocol { .. } => "transport.invalid_response",
        }
    }
}

/// Top-level error type for building and configuring transports.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// A transport call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
