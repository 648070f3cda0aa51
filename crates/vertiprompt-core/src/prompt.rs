//! Prompt assembly. Pure functions of their inputs: no I/O, no clock.

use vertiprompt_harness::ChatMessage;

use crate::contract::ResponseContract;

const STRUCTURED_SYSTEM_PROMPT: &str = include_str!("../prompts/slice_synthesiser.md");
const LEGACY_SYSTEM_PROMPT: &str = include_str!("../prompts/legacy_slice_synthesiser.md");

/// Slice-count hints passed to the model. They are hints, not limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceHints {
    pub num_slices: u32,
    pub max_slices: u32,
}

impl Default for SliceHints {
    fn default() -> Self {
        Self {
            num_slices: 3,
            max_slices: 5,
        }
    }
}

/// The constant behavioural contract for a response contract.
pub fn system_prompt(contract: ResponseContract) -> &'static str {
    match contract {
        ResponseContract::Json => STRUCTURED_SYSTEM_PROMPT,
        ResponseContract::LegacyText => LEGACY_SYSTEM_PROMPT,
    }
}

/// Per-run user message embedding the raw description and count hints.
pub fn user_prompt(description: &str, hints: SliceHints) -> String {
    format!(
        "PORTAL_DESCRIPTION: \"\"\"{description}\"\"\"\n\nNUM_SLICES: {}\nMAX_SLICES: {}",
        hints.num_slices, hints.max_slices
    )
}

/// `[system, user]` messages for one attempt.
pub fn assemble(contract: ResponseContract, description: &str, hints: SliceHints) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(contract)),
        ChatMessage::user(user_prompt(description, hints)),
    ]
}
