/*!
 * Data model shared across the translation pipeline.
 *
 * Fragments come in from a document adapter, canonical items and batches are
 * built from them, and a `TranslationResult` goes back out.
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::app_config::QualityTier;
use crate::errors::ErrorRecord;
use crate::validation::QualityIssue;

use super::cost::Cost;

/// One unit of extracted source text with a stable id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Stable identity of the fragment
    pub id: String,
    /// Text content
    pub text: String,
    /// Adapter-specific data carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Fragment {
    /// Create a fragment without metadata
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: None,
        }
    }

    /// Attach adapter metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Copy of this fragment carrying a translated text
    pub fn translated(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            text: text.into(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A distinct trimmed text shared by one or more fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalItem {
    /// Trimmed text sent to the translation capability
    pub text: String,
    /// Fragments carrying this text, in first-seen order (never empty)
    pub fragment_ids: Vec<String>,
}

impl CanonicalItem {
    pub fn new(text: String, first_fragment_id: String) -> Self {
        Self {
            text,
            fragment_ids: vec![first_fragment_id],
        }
    }
}

/// A translation request as handed to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Fragments to translate, in document order
    pub fragments: Vec<Fragment>,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Quality tier; the configured default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<QualityTier>,
}

impl TranslationRequest {
    pub fn new(
        fragments: Vec<Fragment>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            fragments,
            source_language: source_language.into(),
            target_language: target_language.into(),
            quality_tier: None,
        }
    }

    /// Set the quality tier
    pub fn with_quality_tier(mut self, tier: QualityTier) -> Self {
        self.quality_tier = Some(tier);
        self
    }

    /// Number of distinct fragment ids that carry any text after trimming
    pub fn translatable_count(&self) -> usize {
        self.fragments
            .iter()
            .filter(|f| !f.text.trim().is_empty())
            .map(|f| f.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Summary data attached to a translation result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationMetadata {
    /// Fragments with translatable text
    pub total_count: usize,
    /// Fragments that received a translation
    pub translated_count: usize,
    /// Fragments marked failed
    pub failed_count: usize,
    /// Wall time of the run
    pub execution_time_ms: u64,
    /// Estimated cost of the run
    pub cost: Cost,
    /// Partial failures
    pub errors: Vec<ErrorRecord>,
    /// Issues reported by the quality checker
    pub quality_issues: Vec<QualityIssue>,
}

/// Final output of a translation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Recovery session that tracked the run
    pub session_id: String,
    /// Translated fragments by id
    pub translated_fragments: BTreeMap<String, Fragment>,
    /// Counts, cost and errors
    pub metadata: TranslationMetadata,
}

impl TranslationResult {
    /// Whether every translatable fragment was translated
    pub fn is_complete(&self) -> bool {
        self.metadata.failed_count == 0
            && self.metadata.translated_count == self.metadata.total_count
    }

    /// Translated text of one fragment
    pub fn text_of(&self, fragment_id: &str) -> Option<&str> {
        self.translated_fragments
            .get(fragment_id)
            .map(|f| f.text.as_str())
    }
}
