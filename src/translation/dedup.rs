/*!
 * Fragment deduplication.
 *
 * Fragments whose trimmed text is identical are collapsed into one canonical
 * item, so each distinct text is sent to the translation capability once and
 * its translation is copied back to every fragment that shares it.
 */

use log::{debug, warn};
use std::collections::HashMap;

use super::models::{CanonicalItem, Fragment};

/// Canonical items plus the mapping back to fragments
#[derive(Debug, Clone, Default)]
pub struct DeduplicationResult {
    /// Distinct texts in first-seen order
    pub items: Vec<CanonicalItem>,
    /// Trimmed text of every translatable fragment
    pub fragment_to_text: HashMap<String, String>,
    /// Position of each text in `items`
    index: HashMap<String, usize>,
}

impl DeduplicationResult {
    /// Number of translatable fragments
    pub fn fragment_count(&self) -> usize {
        self.fragment_to_text.len()
    }

    /// Canonical item for a text
    pub fn item(&self, text: &str) -> Option<&CanonicalItem> {
        self.index.get(text).map(|&i| &self.items[i])
    }

    /// Canonical texts mapped to the fragments that carry them
    pub fn canonical_map(&self) -> HashMap<&str, &[String]> {
        self.items
            .iter()
            .map(|item| (item.text.as_str(), item.fragment_ids.as_slice()))
            .collect()
    }

    /// Copy canonical translations back onto every fragment id.
    ///
    /// Fragments whose canonical text has no translation are left out.
    pub fn redistribute(&self, translations: &HashMap<String, String>) -> HashMap<String, String> {
        let mut result = HashMap::with_capacity(self.fragment_to_text.len());
        for item in &self.items {
            if let Some(translated) = translations.get(&item.text) {
                for id in &item.fragment_ids {
                    result.insert(id.clone(), translated.clone());
                }
            }
        }
        result
    }
}

/// Collapses fragments with identical trimmed text
pub struct Deduplicator;

impl Deduplicator {
    /// Group fragments by exact trimmed text.
    ///
    /// Empty-after-trim fragments are dropped. Case and punctuation are
    /// significant. A repeated fragment id keeps its first occurrence.
    pub fn deduplicate<'a, I>(fragments: I) -> DeduplicationResult
    where
        I: IntoIterator<Item = &'a Fragment>,
    {
        let mut result = DeduplicationResult::default();
        let mut skipped_empty = 0usize;

        for fragment in fragments {
            let text = fragment.text.trim();
            if text.is_empty() {
                skipped_empty += 1;
                continue;
            }
            if result.fragment_to_text.contains_key(&fragment.id) {
                warn!("Duplicate fragment id {} ignored", fragment.id);
                continue;
            }

            result
                .fragment_to_text
                .insert(fragment.id.clone(), text.to_string());

            match result.index.get(text) {
                Some(&i) => result.items[i].fragment_ids.push(fragment.id.clone()),
                None => {
                    result.index.insert(text.to_string(), result.items.len());
                    result
                        .items
                        .push(CanonicalItem::new(text.to_string(), fragment.id.clone()));
                }
            }
        }

        debug!(
            "Deduplicated {} fragments into {} canonical items ({} empty skipped)",
            result.fragment_to_text.len(),
            result.items.len(),
            skipped_empty
        );

        result
    }
}
