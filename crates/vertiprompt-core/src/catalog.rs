//! Curated model list and shaping of the gateway's model listing.

use vertiprompt_harness::{ModelDescriptor, Pricing};

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "openai/o3-pro";
/// General-purpose router tried once after the primary model gives up.
pub const FALLBACK_MODEL: &str = "openrouter/auto";

/// Listing ids containing these fragments are image models, not chat models.
const EXCLUDED_ID_FRAGMENTS: [&str; 2] = ["sdxl", "dall-e"];

/// High-capability models with known prices (per million tokens).
pub fn curated_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new(DEFAULT_MODEL, "OpenAI: o3-pro (Recommended)", Pricing::new(5.0, 15.0)),
        ModelDescriptor::new(
            "anthropic/claude-opus-4",
            "Anthropic: Claude Opus 4",
            Pricing::new(15.0, 75.0),
        ),
        ModelDescriptor::new(
            "deepseek/deepseek-r1-0528",
            "DeepSeek: R1 0528",
            Pricing::new(3.5, 10.5),
        ),
        ModelDescriptor::new(
            "perplexity/sonar-reasoning-pro",
            "Perplexity: Sonar Reasoning Pro",
            Pricing::new(1.0, 1.0),
        ),
    ]
}

/// Builds the selectable model list from a gateway listing.
///
/// Image models are dropped, and the default and fallback ids are always
/// present: when the listing lacks them they are prepended (default first).
pub fn selectable_models(
    listed: Vec<ModelDescriptor>,
    default_model: &str,
    fallback_model: &str,
) -> Vec<ModelDescriptor> {
    let filtered: Vec<ModelDescriptor> = listed
        .into_iter()
        .filter(|m| {
            !m.id.is_empty()
                && !EXCLUDED_ID_FRAGMENTS
                    .iter()
                    .any(|fragment| m.id.contains(fragment))
        })
        .collect();

    let curated = curated_models();
    let mut models = Vec::with_capacity(filtered.len() + 2);
    for id in [default_model, fallback_model] {
        let already_listed = filtered.iter().any(|m| m.id == id);
        let already_added = models.iter().any(|m: &ModelDescriptor| m.id == id);
        if already_listed || already_added {
            continue;
        }
        let placeholder = curated
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .unwrap_or_else(|| ModelDescriptor::new(id, id, Pricing::default()));
        models.push(placeholder);
    }
    models.extend(filtered);
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(id: &str) -> ModelDescriptor {
        ModelDescriptor::new(id, id, Pricing::default())
    }

    #[test]
    fn curated_list_contains_default() {
        assert!(curated_models().iter().any(|m| m.id == DEFAULT_MODEL));
        assert!(!curated_models().iter().any(|m| m.id == FALLBACK_MODEL));
    }

    #[test]
    fn empty_listing_still_offers_default_and_fallback() {
        let ids: Vec<_> = selectable_models(Vec::new(), DEFAULT_MODEL, FALLBACK_MODEL)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![DEFAULT_MODEL, FALLBACK_MODEL]);
    }

    #[test]
    fn image_models_are_filtered_and_listed_entries_not_duplicated() {
        let models = selectable_models(
            vec![
                listed("stability/sdxl"),
                listed("openai/dall-e-3"),
                listed(FALLBACK_MODEL),
                listed("mistral/small"),
            ],
            DEFAULT_MODEL,
            FALLBACK_MODEL,
        );
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![DEFAULT_MODEL, FALLBACK_MODEL, "mistral/small"]);
        assert_eq!(models[0].pricing, Pricing::new(5.0, 15.0));
    }
}
