/*!
 * Interface to the external translation capability.
 *
 * The pipeline never talks to a concrete LLM client directly. Anything that
 * can turn a list of texts into an index-aligned list of translations
 * implements `TranslationProvider`:
 * - `mock`: Configurable in-process provider used by tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::QualityTier;
use crate::errors::ProviderError;

/// Progress reported by a provider while it works through its own chunks:
/// `(current, total, percentage, phase)`
pub type ProviderProgressCallback = Arc<dyn Fn(usize, usize, f64, &str) + Send + Sync>;

/// Per-call options passed to the provider
#[derive(Clone, Default)]
pub struct TranslateOptions {
    /// Quality tier of the run
    pub quality_tier: QualityTier,
    /// Optional progress hook for the provider's internal chunking
    pub on_progress: Option<ProviderProgressCallback>,
}

impl TranslateOptions {
    pub fn new(quality_tier: QualityTier) -> Self {
        Self {
            quality_tier,
            on_progress: None,
        }
    }

    /// Attach a progress hook
    pub fn with_progress(mut self, callback: ProviderProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Invoke the progress hook if one is set
    pub fn report_progress(&self, current: usize, total: usize, phase: &str) {
        if let Some(callback) = &self.on_progress {
            let percentage = if total == 0 {
                100.0
            } else {
                current as f64 / total as f64 * 100.0
            };
            callback(current, total, percentage, phase);
        }
    }
}

impl Debug for TranslateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslateOptions")
            .field("quality_tier", &self.quality_tier)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Common trait for translation capabilities
///
/// Implementations must return exactly one translation per input text, in
/// input order. The pipeline checks the count and falls back to one text per
/// call when it does not match.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Translate a batch of texts
    ///
    /// # Arguments
    /// * `texts` - Texts to translate
    /// * `source_language` - Source language code
    /// * `target_language` - Target language code
    /// * `options` - Tier and progress hook
    ///
    /// # Returns
    /// * `Result<Vec<String>, ProviderError>` - Translations, index-aligned with `texts`
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

pub mod mock;
