/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationService`, which sends batches of texts
 * to a translation provider and recovers from responses that do not line up
 * with the input by translating each text on its own.
 */

use log::{debug, warn};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{TranslateOptions, TranslationProvider};

/// Outcome of translating one batch of texts
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTranslation {
    /// One entry per input text; `None` where no translation was obtained
    pub translations: Vec<Option<String>>,
    /// Whether the per-text fallback was used
    pub used_fallback: bool,
    /// Number of provider calls made
    pub calls: usize,
}

impl BatchTranslation {
    /// Number of texts left without a translation
    pub fn missing_count(&self) -> usize {
        self.translations.iter().filter(|t| t.is_none()).count()
    }
}

/// Translation service wrapping a provider
#[derive(Debug, Clone)]
pub struct TranslationService {
    provider: Arc<dyn TranslationProvider>,
}

impl TranslationService {
    /// Create a new translation service over a provider
    pub fn new(provider: Arc<dyn TranslationProvider>) -> Self {
        Self { provider }
    }

    /// Name of the wrapped provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Translate a batch of texts with per-text fallback.
    ///
    /// A response whose length does not match the input is never trusted
    /// positionally: every text is then translated alone and each failure
    /// only affects its own position. Any other provider error fails the
    /// whole batch.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<BatchTranslation, ProviderError> {
        if texts.is_empty() {
            return Ok(BatchTranslation {
                translations: Vec::new(),
                used_fallback: false,
                calls: 0,
            });
        }

        let mismatch = match self
            .provider
            .translate_batch(texts, source_language, target_language, options)
            .await
        {
            Ok(translated) if translated.len() == texts.len() => {
                return Ok(BatchTranslation {
                    translations: translated.into_iter().map(Some).collect(),
                    used_fallback: false,
                    calls: 1,
                });
            }
            Ok(translated) => ProviderError::LengthMismatch {
                expected: texts.len(),
                actual: translated.len(),
            },
            Err(e @ ProviderError::LengthMismatch { .. }) => e,
            Err(e) => return Err(e),
        };

        if texts.len() == 1 {
            warn!("{} failed a single-text call: {}", self.provider.name(), mismatch);
            return Ok(BatchTranslation {
                translations: vec![None],
                used_fallback: false,
                calls: 1,
            });
        }

        debug!(
            "{}; falling back to {} individual calls",
            mismatch,
            texts.len()
        );

        let mut translations = Vec::with_capacity(texts.len());
        for text in texts {
            match self
                .translate_one(text, source_language, target_language, options)
                .await
            {
                Ok(translated) => translations.push(Some(translated)),
                Err(e) => {
                    warn!("Individual translation failed: {}", e);
                    translations.push(None);
                }
            }
        }

        Ok(BatchTranslation {
            translations,
            used_fallback: true,
            calls: texts.len() + 1,
        })
    }

    /// Translate a single text
    pub async fn translate_one(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<String, ProviderError> {
        let input = [text.to_string()];
        let mut translated = self
            .provider
            .translate_batch(&input, source_language, target_language, options)
            .await?;

        if translated.len() != 1 {
            return Err(ProviderError::LengthMismatch {
                expected: 1,
                actual: translated.len(),
            });
        }
        Ok(translated.remove(0))
    }
}
