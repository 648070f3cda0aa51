//! OpenRouter transport and client configuration.
//!
//! Vendor-specific wire shapes live here so the root transport API stays
//! gateway-agnostic.
mod adapter;
mod config;
pub(crate) mod wire;

pub use adapter::OpenRouterTransport;
pub use config::OpenRouterClientConfig;
