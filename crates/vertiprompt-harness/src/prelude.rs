//! Common imports for typical transport usage.
pub use crate::{
    ChatMessage, ChatRole, ChatTransport, GenerationRequest, GenerationResult, HarnessError,
    ModelDescriptor, Pricing, ResponseFormat, TokenUsage, TransportError,
};
