//! Best-effort cost accounting. Nothing here can fail a run: an unknown model
//! or missing usage simply costs zero.

use std::collections::HashMap;

use vertiprompt_harness::{GenerationResult, ModelDescriptor, Pricing, TokenUsage};

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Cost of one completion given per-million-token prices.
pub fn estimate_cost(usage: Option<TokenUsage>, pricing: Option<Pricing>) -> f64 {
    let (Some(usage), Some(pricing)) = (usage, pricing) else {
        return 0.0;
    };
    let cost = (usage.prompt_tokens as f64 / TOKENS_PER_MILLION) * pricing.prompt
        + (usage.completion_tokens as f64 / TOKENS_PER_MILLION) * pricing.completion;
    if cost.is_finite() && cost > 0.0 { cost } else { 0.0 }
}

/// Per-model price lookup keyed by model id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, Pricing>,
}

impl PriceTable {
    pub fn from_models<'a>(models: impl IntoIterator<Item = &'a ModelDescriptor>) -> Self {
        Self {
            prices: models
                .into_iter()
                .map(|m| (m.id.clone(), m.pricing))
                .collect(),
        }
    }

    /// The curated catalog's prices.
    pub fn curated() -> Self {
        Self::from_models(crate::catalog::curated_models().iter())
    }

    /// Adds prices for models not already in the table; existing entries win.
    pub fn extend_missing<'a>(&mut self, models: impl IntoIterator<Item = &'a ModelDescriptor>) {
        for model in models {
            self.prices.entry(model.id.clone()).or_insert(model.pricing);
        }
    }

    pub fn pricing(&self, model_id: &str) -> Option<Pricing> {
        self.prices.get(model_id).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Cost of a completion, priced by the model that actually served it.
    pub fn estimate(&self, result: &GenerationResult) -> f64 {
        estimate_cost(result.usage, self.pricing(&result.model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt_tokens: u64, completion_tokens: u64) -> Option<TokenUsage> {
        Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        })
    }

    #[test]
    fn cost_is_linear_in_tokens() {
        let cost = estimate_cost(usage(2_000_000, 500_000), Some(Pricing::new(5.0, 15.0)));
        assert!((cost - 17.5).abs() < 1e-9);
    }

    #[test]
    fn missing_inputs_cost_zero() {
        assert_eq!(estimate_cost(None, Some(Pricing::new(5.0, 15.0))), 0.0);
        assert_eq!(estimate_cost(usage(10, 10), None), 0.0);
    }

    #[test]
    fn estimate_is_idempotent_and_unknown_models_are_free() {
        let table = PriceTable::curated();
        let known = GenerationResult {
            model_id: "openai/o3-pro".into(),
            usage: usage(1_000, 2_000),
            content: String::new(),
        };
        assert_eq!(table.estimate(&known), table.estimate(&known));
        assert!((table.estimate(&known) - 0.035).abs() < 1e-12);

        for tokens in [0, 1, 1_000_000_000] {
            let unknown = GenerationResult {
                model_id: "vendor/not-in-table".into(),
                usage: usage(tokens, tokens),
                content: String::new(),
            };
            assert_eq!(table.estimate(&unknown), 0.0);
        }
    }

    #[test]
    fn extend_missing_keeps_curated_prices() {
        let mut table = PriceTable::curated();
        let before = table.len();
        table.extend_missing(&[
            ModelDescriptor::new("openai/o3-pro", "o3-pro", Pricing::new(99.0, 99.0)),
            ModelDescriptor::new("mistral/small", "Small", Pricing::new(0.2, 0.6)),
        ]);
        assert_eq!(table.len(), before + 1);
        assert_eq!(table.pricing("openai/o3-pro"), Some(Pricing::new(5.0, 15.0)));
        assert_eq!(table.pricing("mistral/small"), Some(Pricing::new(0.2, 0.6)));
    }
}
