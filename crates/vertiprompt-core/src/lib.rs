//! Generation pipeline that turns a product description into ordered feature
//! slices.
//!
//! One run drives `iterations` sequential rounds of
//! prompt assembly -> retry/fallback transport call -> reply parsing -> cost
//! estimation, and returns every slice collected before the run finished or
//! halted.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vertiprompt_core::{GenerateRequest, GenerationSettings, Generator, RunContext};
//! use vertiprompt_harness::vendors::openrouter::OpenRouterTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Generator::new(
//!     Arc::new(OpenRouterTransport::from_env()?),
//!     GenerationSettings::default(),
//! );
//! let outcome = generator
//!     .generate(
//!         GenerateRequest::new(
//!             std::env::var("OPENROUTER_API_KEY")?,
//!             "A recipe planner that turns a pantry photo into a weekly shopping list.",
//!         )
//!         .iterations(2),
//!         RunContext::default(),
//!     )
//!     .await?;
//!
//! for (i, slice) in outcome.slices.iter().enumerate() {
//!     println!("Slice {} — {}", i + 1, slice.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod contract;
pub mod cost;
pub mod delay;
pub mod errors;
pub mod events;
pub mod export;
pub mod generator;
pub mod observability;
pub mod orchestrator;
pub mod parser;
pub mod policy;
pub mod prompt;
pub mod run;
pub mod slice;
pub mod store;

#[cfg(test)]
mod test_support;

pub use catalog::{DEFAULT_MODEL, FALLBACK_MODEL};
pub use config::GenerationSettings;
pub use contract::ResponseContract;
pub use cost::PriceTable;
pub use errors::{ConfigError, GenerateError, ImportFormatError, ParseError, PipelineError, StoreError};
pub use events::GenerationEvent;
pub use generator::{GenerateRequest, Generator, RunContext};
pub use policy::RetryPolicy;
pub use run::{AbortHandle, AbortSignal, IterationFailure, RunOutcome, RunState};
pub use slice::Slice;
