/*!
 * Token usage and cost estimation.
 *
 * Tokens are estimated with the same 4-characters-per-token heuristic the
 * batch builder uses, on both the texts sent and the translations received,
 * and priced with the configured per-1k-token rates.
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::app_config::PricingConfig;

use super::batch::estimate_tokens;

/// Cost of a single batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Batch the cost belongs to
    pub batch_id: String,
    /// Estimated tokens sent
    pub input_tokens: u64,
    /// Estimated tokens received
    pub output_tokens: u64,
    /// Unrounded cost in minor units
    pub cost_minor_units: f64,
}

/// Estimated cost of a translation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Estimated tokens sent
    pub input_tokens: u64,
    /// Estimated tokens received
    pub output_tokens: u64,
    /// Total cost rounded to whole minor units (e.g. cents)
    pub total_cost_minor_units: u64,
    /// ISO currency code
    pub currency: String,
    /// Per-batch costs, in the order batches completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<CostBreakdown>>,
}

impl Cost {
    /// Total tokens in both directions
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Accumulates per-batch token estimates during a run
#[derive(Debug)]
pub struct CostTracker {
    pricing: PricingConfig,
    entries: Mutex<Vec<CostBreakdown>>,
}

impl CostTracker {
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            pricing,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Price a token count pair without recording it
    pub fn price(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1000.0 * self.pricing.input_cost_per_1k_tokens
            + output_tokens as f64 / 1000.0 * self.pricing.output_cost_per_1k_tokens
    }

    /// Record one provider call for a batch
    ///
    /// Calls for the same batch (fallbacks, quality retries) add up into a
    /// single breakdown entry.
    pub fn record<'a, I, O>(&self, batch_id: &str, inputs: I, outputs: O) -> CostBreakdown
    where
        I: IntoIterator<Item = &'a str>,
        O: IntoIterator<Item = &'a str>,
    {
        let input_tokens: u64 = inputs.into_iter().map(|t| estimate_tokens(t) as u64).sum();
        let output_tokens: u64 = outputs.into_iter().map(|t| estimate_tokens(t) as u64).sum();
        let cost = self.price(input_tokens, output_tokens);

        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.batch_id == batch_id) {
            Some(entry) => {
                entry.input_tokens += input_tokens;
                entry.output_tokens += output_tokens;
                entry.cost_minor_units += cost;
                entry.clone()
            }
            None => {
                let entry = CostBreakdown {
                    batch_id: batch_id.to_string(),
                    input_tokens,
                    output_tokens,
                    cost_minor_units: cost,
                };
                entries.push(entry.clone());
                entry
            }
        }
    }

    /// Running total
    pub fn total(&self) -> Cost {
        let entries = self.entries.lock();
        let input_tokens = entries.iter().map(|e| e.input_tokens).sum();
        let output_tokens = entries.iter().map(|e| e.output_tokens).sum();
        let exact: f64 = entries.iter().map(|e| e.cost_minor_units).sum();

        Cost {
            input_tokens,
            output_tokens,
            total_cost_minor_units: exact.round().max(0.0) as u64,
            currency: self.pricing.currency.clone(),
            breakdown: (!entries.is_empty()).then(|| entries.clone()),
        }
    }
}
