//! Chat-completion transport used by the VertiPrompt generation pipeline.
//!
//! The crate exposes one seam, [`ChatTransport`], with two calls: list the
//! models a gateway offers and request a single chat completion. Vendor
//! implementations live under `vendors::*`.
//!
//! # Usage (OpenRouter)
//!
//! ```no_run
//! use vertiprompt_harness::prelude::*;
//! use vertiprompt_harness::vendors::openrouter::OpenRouterTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let transport = OpenRouterTransport::from_env()?;
//! let request = GenerationRequest::new(
//!     std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
//!     "openrouter/auto",
//!     vec![
//!         ChatMessage::system("Answer briefly."),
//!         ChatMessage::user("Say hello"),
//!     ],
//! );
//!
//! let result = transport.complete_chat(request).await?;
//! println!("{}", result.content);
//! # Ok(())
//! # }
//! ```

/// Public error types used by the transport API.
pub mod errors;
/// Model descriptors, chat messages, and request/response shapes.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// The transport contract consumed by the pipeline.
pub mod transport;
/// Vendor-specific transport implementations.
pub mod vendors;

pub use errors::{HarnessError, TransportError};
pub use model::{
    ChatMessage, ChatRole, GenerationRequest, GenerationResult, ModelDescriptor, Pricing,
    ResponseFormat, TokenUsage,
};
pub use transport::ChatTransport;
