//! Reply parsing strategies.
//!
//! The model's reply is untrusted input. A strategy either returns every slice
//! the reply describes or fails as a whole: dropping a malformed element would
//! be indistinguishable from the model choosing to produce fewer slices.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ParseError;
use crate::slice::Slice;

/// Turns raw reply content into an ordered slice list.
pub trait SliceParser: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    fn parse(&self, content: &str) -> Result<Vec<Slice>, ParseError>;
}

/// Structured strategy: `{"slices": [{"title": ..., "prompt": ...}, ...]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSliceParser;

impl SliceParser for JsonSliceParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, content: &str) -> Result<Vec<Slice>, ParseError> {
        let body = strip_code_fence(content);
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| ParseError::InvalidJson {
                reason: e.to_string(),
                raw: content.to_string(),
            })?;
        let schema = |reason: String| ParseError::Schema {
            reason,
            raw: content.to_string(),
        };

        let items = match value.get("slices") {
            None => return Err(schema("missing `slices` field".into())),
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err(schema("`slices` is not an array".into())),
        };
        if items.is_empty() {
            return Err(ParseError::NoSlices {
                raw: content.to_string(),
            });
        }

        items
            .iter()
            .enumerate()
            .map(|(index, item)| -> Result<Slice, ParseError> {
                let field = |name: &str| {
                    item.get(name)
                        .and_then(|v| v.as_str())
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| {
                            schema(format!("slice {index} has no non-empty string `{name}`"))
                        })
                };
                Ok(Slice::new(field("title")?, field("prompt")?))
            })
            .collect()
    }
}

/// Models asked for JSON often still wrap it in a markdown fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim().contains(char::is_whitespace) => body.trim(),
        _ => inner.trim(),
    }
}

static LEGACY_SLICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\n)Slice \d+ [—–-] (.*?)\n```prompt([\s\S]*?)```")
        .expect("legacy slice pattern is valid")
});

/// Earlier text format: `Slice N — <Title>` followed by a ```` ```prompt ````
/// fenced block, repeated.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyTextParser;

impl SliceParser for LegacyTextParser {
    fn name(&self) -> &'static str {
        "legacy_text"
    }

    fn parse(&self, content: &str) -> Result<Vec<Slice>, ParseError> {
        let slices = LEGACY_SLICE
            .captures_iter(content)
            .enumerate()
            .map(|(index, caps)| {
                let title = caps.get(1).map_or("", |m| m.as_str()).trim();
                let prompt = caps.get(2).map_or("", |m| m.as_str()).trim();
                if title.is_empty() || prompt.is_empty() {
                    return Err(ParseError::Schema {
                        reason: format!("slice {index} has an empty title or prompt"),
                        raw: content.to_string(),
                    });
                }
                Ok(Slice::new(title, prompt))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if slices.is_empty() {
            return Err(ParseError::NoSlices {
                raw: content.to_string(),
            });
        }
        Ok(slices)
    }
}
