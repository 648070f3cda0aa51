use serde::{Deserialize, Serialize};
use vertiprompt_harness::ResponseFormat;

use crate::parser::{JsonSliceParser, LegacyTextParser, SliceParser};

/// The reply format a run asks for. Selects the system prompt, the requested
/// response format and the parser as one unit so they cannot drift apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseContract {
    /// `{"slices": [...]}` JSON object.
    #[default]
    Json,
    /// `Slice N — <Title>` headers with ```` ```prompt ```` fences.
    LegacyText,
}

impl ResponseContract {
    pub fn response_format(self) -> Option<ResponseFormat> {
        match self {
            Self::Json => Some(ResponseFormat::JsonObject),
            Self::LegacyText => None,
        }
    }

    pub fn parser(self) -> &'static dyn SliceParser {
        match self {
            Self::Json => &JsonSliceParser,
            Self::LegacyText => &LegacyTextParser,
        }
    }
}
