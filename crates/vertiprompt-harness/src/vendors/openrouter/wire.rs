use crate::errors::TransportError;
use crate::model::{GenerationRequest, GenerationResult, ModelDescriptor, Pricing, TokenUsage};

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

pub(crate) fn build_request_body(req: &GenerationRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": req.model,
        "messages": req.messages,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
    });
    if let Some(format) = req.response_format {
        body["response_format"] = serde_json::json!({ "type": format });
    }
    body
}

/// Maps a 2xx chat-completions body to a `GenerationResult`.
///
/// OpenRouter occasionally reports upstream failures inside a 200 body as
/// `{"error": {"code": 502, ...}}`; those are surfaced as status errors so the
/// caller can classify them like any other HTTP failure.
pub(crate) fn map_completion_response(
    requested_model: &str,
    value: serde_json::Value,
) -> Result<GenerationResult, TransportError> {
    if value.get("choices").is_none()
        && let Some(code) = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
    {
        return Err(TransportError::status(code, value));
    }

    let content = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| TransportError::protocol("completion response did not include message content"))?
        .to_string();

    let model_id = value
        .get("model")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(requested_model)
        .to_string();

    let usage = value.get("usage").and_then(|usage| {
        let prompt_tokens = usage.get("prompt_tokens")?.as_u64()?;
        let completion_tokens = usage.get("completion_tokens")?.as_u64()?;
        Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        })
    });

    Ok(GenerationResult {
        model_id,
        usage,
        content,
    })
}

/// Maps a `/models` listing to descriptors, skipping entries without an id.
pub(crate) fn map_models_response(value: &serde_json::Value) -> Vec<ModelDescriptor> {
    let Some(items) = value.get("data").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(|v| v.as_str())?.trim();
            if id.is_empty() {
                return None;
            }
            let name = item
                .get("name")
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(id);
            let pricing = item.get("pricing");
            let price = |key: &str| {
                pricing
                    .and_then(|p| p.get(key))
                    .and_then(per_token_price)
                    .map(|per_token| per_token * TOKENS_PER_MILLION)
                    .unwrap_or(0.0)
            };
            Some(ModelDescriptor::new(
                id,
                name,
                Pricing::new(price("prompt"), price("completion")),
            ))
        })
        .collect()
}

/// Listing prices arrive as decimal strings per token; variable-price routers
/// report negative sentinels, which are treated as unknown.
fn per_token_price(value: &serde_json::Value) -> Option<f64> {
    let price = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (price.is_finite() && price >= 0.0).then_some(price)
}
