/*!
 * Mock translation providers for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::intermittent(n)` - Fails every nth call
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::slow(ms)` - Succeeds after a delay
 * - `MockProvider::count_mismatch()` - Drops the last text of multi-text batches
 *
 * Every call is recorded so tests can assert what was sent.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{TranslateOptions, TranslationProvider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth call)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Simulates slow response
    Slow { delay_ms: u64 },
    /// Returns one translation fewer than requested for batches of two or more
    CountMismatch,
    /// Returns empty translations
    Empty,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub texts: Vec<String>,
    pub source_language: String,
    pub target_language: String,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Call counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every call made, in call order
    calls: Arc<Mutex<Vec<MockCall>>>,
    /// Fixed translations by source text
    dictionary: Arc<HashMap<String, String>>,
    /// Texts that always fail when they are the only text in a call
    poisoned: Arc<Vec<String>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            dictionary: Arc::new(HashMap::new()),
            poisoned: Arc::new(Vec::new()),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that sleeps before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock that loses a translation in multi-text batches
    pub fn count_mismatch() -> Self {
        Self::new(MockBehavior::CountMismatch)
    }

    /// Create a mock that returns empty translations
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Use fixed translations for known texts
    pub fn with_dictionary<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionary = Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Make single-text calls for these texts fail
    pub fn with_poisoned_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.poisoned = Arc::new(texts.into_iter().map(Into::into).collect());
        self
    }

    /// Translation the working mode produces for a text
    pub fn translate_text(&self, text: &str, target_language: &str) -> String {
        self.dictionary
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", target_language, text))
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every text sent, across all calls
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .flat_map(|call| call.texts.iter().cloned())
            .collect()
    }

    fn translate_all(&self, texts: &[String], target_language: &str) -> Vec<String> {
        texts
            .iter()
            .map(|text| self.translate_text(text, target_language))
            .collect()
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            calls: Arc::clone(&self.calls),
            dictionary: Arc::clone(&self.dictionary),
            poisoned: Arc::clone(&self.poisoned),
        }
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(MockCall {
            texts: texts.to_vec(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        });

        if texts.len() == 1 && self.poisoned.contains(&texts[0]) {
            return Err(ProviderError::RequestFailed(format!(
                "Simulated failure for '{}'",
                texts[0]
            )));
        }

        let result = match self.behavior {
            MockBehavior::Working => Ok(self.translate_all(texts, target_language)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.translate_all(texts, target_language))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.translate_all(texts, target_language))
            }

            MockBehavior::CountMismatch => {
                let mut translated = self.translate_all(texts, target_language);
                if translated.len() > 1 {
                    translated.pop();
                }
                Ok(translated)
            }

            MockBehavior::Empty => Ok(vec![String::new(); texts.len()]),
        };

        if result.is_ok() {
            options.report_progress(texts.len(), texts.len(), "translated");
        }
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}
