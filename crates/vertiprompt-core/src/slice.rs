use serde::{Deserialize, Serialize};

/// One independently implementable feature unit, expressed as a prompt for a
/// coding agent.
///
/// Slices are never mutated after parsing; runs only append them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub title: String,
    pub prompt: String,
}

impl Slice {
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
        }
    }
}
