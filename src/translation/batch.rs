/*!
 * Batch building.
 *
 * Canonical items are grouped greedily into batches bounded by an item count
 * and an estimated token budget, so each call to the translation capability
 * stays within its limits.
 */

use log::debug;

use super::models::CanonicalItem;

/// Characters per token in the token estimate
const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens for a text: `ceil(utf8_len / 4)`
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// A bounded group of canonical items sent together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Batch identifier, unique within a run
    pub id: String,
    /// Items in the batch (never empty)
    pub items: Vec<CanonicalItem>,
    /// Sum of the items' token estimates
    pub token_count: usize,
}

impl Batch {
    /// Texts to send, index-aligned with `items`
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text.clone()).collect()
    }

    /// Every fragment id covered by this batch
    pub fn fragment_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|item| item.fragment_ids.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Greedy batch builder
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    max_batch_size: usize,
    max_tokens_per_batch: usize,
}

impl BatchBuilder {
    /// Create a builder; zero limits are raised to one
    pub fn new(max_batch_size: usize, max_tokens_per_batch: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            max_tokens_per_batch: max_tokens_per_batch.max(1),
        }
    }

    /// Split items into batches.
    ///
    /// A batch is closed before an item that would push it past either limit.
    /// An item whose own estimate exceeds the token budget still goes out,
    /// alone in its batch. Items are never split and no batch is empty.
    pub fn build(&self, items: Vec<CanonicalItem>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Vec<CanonicalItem> = Vec::new();
        let mut current_tokens = 0usize;

        for item in items {
            let tokens = estimate_tokens(&item.text);

            if !current.is_empty()
                && (current.len() + 1 > self.max_batch_size
                    || current_tokens + tokens > self.max_tokens_per_batch)
            {
                batches.push(Self::seal(batches.len(), std::mem::take(&mut current), current_tokens));
                current_tokens = 0;
            }

            current.push(item);
            current_tokens += tokens;
        }

        if !current.is_empty() {
            batches.push(Self::seal(batches.len(), current, current_tokens));
        }

        debug!(
            "Built {} batches (max {} items, {} tokens)",
            batches.len(),
            self.max_batch_size,
            self.max_tokens_per_batch
        );

        batches
    }

    fn seal(index: usize, items: Vec<CanonicalItem>, token_count: usize) -> Batch {
        Batch {
            id: format!("batch-{}", index + 1),
            items,
            token_count,
        }
    }
}
