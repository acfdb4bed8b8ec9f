/*!
 * Translation orchestrator.
 *
 * The orchestrator wires the pipeline together for one run:
 * 1. Preparing: deduplicate fragments and build batches
 * 2. Translating: run batches through the provider under bounded concurrency,
 *    quality-checking and recording each item as its batch completes
 * 3. Validating: summarise quality findings
 * 4. Applying: copy canonical translations back to every fragment id
 *
 * Every run is tracked by a recovery session, so an interrupted or partially
 * failed run can be resumed with `resume_translation`.
 */

use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::{Config, QualityTier};
use crate::errors::{ErrorRecord, ProviderError, TranslationError};
use crate::language_utils::validate_language_code;
use crate::progress::{ProgressEmitter, ProgressPhase, ProgressTracker};
use crate::providers::{ProviderProgressCallback, TranslateOptions, TranslationProvider};
use crate::session::{RecoveryManager, RecoverySession};
use crate::validation::{QualityChecker, QualityIssue, QualityResult};

use super::batch::{Batch, BatchBuilder};
use super::concurrency::BatchProcessor;
use super::core::TranslationService;
use super::cost::CostTracker;
use super::dedup::Deduplicator;
use super::models::{CanonicalItem, Fragment, TranslationMetadata, TranslationRequest, TranslationResult};

/// Everything a batch worker needs about its run
struct RunContext<'a> {
    session_id: &'a str,
    source_language: &'a str,
    target_language: &'a str,
    tier: QualityTier,
    options: TranslateOptions,
    originals: HashMap<&'a str, &'a Fragment>,
    tracker: &'a ProgressTracker,
    cost: &'a CostTracker,
}

/// What one successful batch produced
#[derive(Debug, Default)]
struct BatchReport {
    /// Canonical text and its translation
    translations: Vec<(String, String)>,
    errors: Vec<ErrorRecord>,
    issues: Vec<QualityIssue>,
}

/// Abandons the session if the run is dropped before it finishes
struct SessionGuard<'a> {
    recovery: &'a RecoveryManager,
    session_id: String,
    armed: bool,
}

impl SessionGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.recovery.abandon(&self.session_id);
        }
    }
}

/// Runs translation requests end to end
#[derive(Debug)]
pub struct TranslationOrchestrator {
    service: TranslationService,
    config: Config,
    checker: QualityChecker,
    recovery: Arc<RecoveryManager>,
    progress: Arc<ProgressEmitter>,
}

impl TranslationOrchestrator {
    /// Create an orchestrator with an explicit recovery manager
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        config: Config,
        recovery: Arc<RecoveryManager>,
    ) -> Self {
        Self {
            service: TranslationService::new(provider),
            checker: QualityChecker::with_config(&config.quality),
            config,
            recovery,
            progress: Arc::new(ProgressEmitter::new()),
        }
    }

    /// Create an orchestrator whose recovery storage follows the configuration
    pub fn from_config(
        provider: Arc<dyn TranslationProvider>,
        config: Config,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let recovery = RecoveryManager::from_config(&config.recovery)?;
        Ok(Self::new(provider, config, Arc::new(recovery)))
    }

    /// Emitter receiving progress of every run
    pub fn progress(&self) -> &ProgressEmitter {
        &self.progress
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate every fragment of a request.
    ///
    /// Fails only when nothing can be attempted: unknown languages or no
    /// translatable text. Batch and item failures are reported in the
    /// result's metadata instead.
    pub async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        let work = request.fragments.clone();
        self.run(&request, &work, None).await
    }

    /// Continue a persisted session.
    ///
    /// Returns `None` when the session does not exist. Fragments not yet
    /// completed (including failed ones) are translated in a new session that
    /// starts from the old one's translations. The old session is deleted once
    /// the merged result is complete.
    pub async fn resume_translation(
        &self,
        session_id: &str,
    ) -> Result<Option<TranslationResult>, TranslationError> {
        let Some(session) = self.recovery.load_state(session_id).await else {
            info!("No recovery session {} to resume", session_id);
            return Ok(None);
        };

        let remaining: Vec<Fragment> = session
            .get_resumable_fragments()
            .into_iter()
            .filter(|f| !f.text.trim().is_empty())
            .collect();

        if remaining.is_empty() {
            info!("Session {} has nothing left to translate", session_id);
            return Ok(Some(self.stored_result(&session)));
        }

        info!(
            "Resuming session {}: {} fragments left",
            session_id,
            remaining.len()
        );
        let result = self
            .run(&session.original_request, &remaining, Some(&session))
            .await?;

        if result.is_complete() {
            self.recovery.delete_session(session_id).await;
            debug!("Deleted superseded session {}", session_id);
        }
        Ok(Some(result))
    }

    /// Result made only of a session's stored translations
    fn stored_result(&self, session: &RecoverySession) -> TranslationResult {
        let translated_fragments = Self::prior_translations(session);
        let total_count = session.original_request.translatable_count();
        let translated_count = translated_fragments.len();

        TranslationResult {
            session_id: session.id.clone(),
            translated_fragments,
            metadata: TranslationMetadata {
                total_count,
                translated_count,
                failed_count: total_count.saturating_sub(translated_count),
                cost: CostTracker::new(self.config.pricing.clone()).total(),
                ..TranslationMetadata::default()
            },
        }
    }

    /// Stored translations that still belong to the session's request
    fn prior_translations(session: &RecoverySession) -> BTreeMap<String, Fragment> {
        session
            .original_request
            .fragments
            .iter()
            .filter_map(|f| {
                session
                    .translated_fragments
                    .get(&f.id)
                    .map(|t| (f.id.clone(), t.clone()))
            })
            .collect()
    }

    fn validate_request(request: &TranslationRequest) -> Result<(), TranslationError> {
        for code in [&request.source_language, &request.target_language] {
            validate_language_code(code)
                .map_err(|_| TranslationError::InvalidLanguage(code.clone()))?;
        }
        Ok(())
    }

    /// Translate `work`, a subset of `request`'s fragments, in a new session
    async fn run(
        &self,
        request: &TranslationRequest,
        work: &[Fragment],
        prior: Option<&RecoverySession>,
    ) -> Result<TranslationResult, TranslationError> {
        let started = Instant::now();
        Self::validate_request(request)?;

        let dedup = Deduplicator::deduplicate(work);
        if dedup.items.is_empty() {
            return Err(TranslationError::NoTranslatableText(work.len()));
        }

        let tier = request.quality_tier.unwrap_or(self.config.quality.tier);
        let session_id = self.recovery.create_session(request).await;
        let mut guard = SessionGuard {
            recovery: &self.recovery,
            session_id: session_id.clone(),
            armed: true,
        };
        let tracker = Arc::new(ProgressTracker::for_session(
            Arc::clone(&self.progress),
            session_id.clone(),
        ));
        tracker.set_phase(ProgressPhase::Initializing, Some("Recovery session created".to_string()));

        let prior_translations = prior.map(Self::prior_translations).unwrap_or_default();
        for fragment in prior_translations.values() {
            self.recovery.add_completed(&session_id, fragment.clone());
        }

        tracker.set_phase(ProgressPhase::Preparing, Some("Building batches".to_string()));
        tracker.set_total(dedup.fragment_count() + prior_translations.len());
        tracker.set_current(prior_translations.len());

        let batches = BatchBuilder::new(
            self.config.batch.max_batch_size,
            self.config.batch.max_tokens_per_batch,
        )
        .build(dedup.items.clone());
        let batch_fragments: HashMap<String, Vec<String>> = batches
            .iter()
            .map(|b| (b.id.clone(), b.fragment_ids()))
            .collect();

        info!(
            "Session {}: {} fragments, {} distinct texts, {} batches ({} -> {}, tier {}, provider {})",
            session_id,
            dedup.fragment_count(),
            dedup.items.len(),
            batches.len(),
            request.source_language,
            request.target_language,
            tier,
            self.service.provider_name()
        );

        let cost = CostTracker::new(self.config.pricing.clone());
        let ctx = RunContext {
            session_id: &session_id,
            source_language: &request.source_language,
            target_language: &request.target_language,
            tier,
            options: TranslateOptions::new(tier).with_progress(provider_progress_hook(&tracker)),
            // Reversed so the first of a repeated id wins
            originals: work.iter().rev().map(|f| (f.id.as_str(), f)).collect(),
            tracker: tracker.as_ref(),
            cost: &cost,
        };
        self.sync_progress(&ctx);

        tracker.set_phase(ProgressPhase::Translating, None);
        let processor = BatchProcessor::new(
            self.config.batch.concurrency,
            self.config.batch.inter_batch_delay(),
        );
        let outcomes = {
            let ctx = &ctx;
            processor
                .process(batches, move |batch| self.run_batch(ctx, batch))
                .await
        };

        tracker.set_phase(ProgressPhase::Validating, None);
        let mut translations = HashMap::new();
        let mut metadata = TranslationMetadata::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(report) => {
                    translations.extend(report.translations);
                    metadata.errors.extend(report.errors);
                    metadata.quality_issues.extend(report.issues);
                }
                Err(e) => {
                    let ids = batch_fragments
                        .get(&outcome.batch_id)
                        .cloned()
                        .unwrap_or_default();
                    metadata.errors.push(ErrorRecord::batch_failed(ids, &e));
                }
            }
        }
        if !metadata.quality_issues.is_empty() {
            info!(
                "Session {}: {} quality issues reported",
                session_id,
                metadata.quality_issues.len()
            );
        }

        tracker.set_phase(ProgressPhase::Applying, None);
        let mut translated_fragments = prior_translations;
        for (id, text) in dedup.redistribute(&translations) {
            if let Some(original) = ctx.originals.get(id.as_str()) {
                translated_fragments.insert(id, original.translated(text));
            }
        }

        metadata.total_count = request.translatable_count();
        metadata.translated_count = translated_fragments.len();
        metadata.failed_count = metadata.total_count.saturating_sub(metadata.translated_count);
        metadata.cost = cost.total();
        metadata.execution_time_ms = started.elapsed().as_millis() as u64;

        if translations.is_empty() {
            let message = format!("No batch produced a translation ({} errors)", metadata.errors.len());
            tracker.set_phase(ProgressPhase::Error, Some(message.clone()));
            self.sync_progress(&ctx);
            self.recovery.fail(&session_id, &message).await;
        } else {
            tracker.set_phase(ProgressPhase::Completed, None);
            self.sync_progress(&ctx);
            self.recovery.complete(&session_id).await;
        }
        guard.disarm();

        info!(
            "Session {} finished: {}/{} translated, {} failed, {} errors, cost {} {} in {} ms",
            session_id,
            metadata.translated_count,
            metadata.total_count,
            metadata.failed_count,
            metadata.errors.len(),
            metadata.cost.total_cost_minor_units,
            metadata.cost.currency,
            metadata.execution_time_ms
        );

        Ok(TranslationResult {
            session_id,
            translated_fragments,
            metadata,
        })
    }

    /// Translate one batch, check each item and record it in the session
    async fn run_batch(
        &self,
        ctx: &RunContext<'_>,
        batch: Batch,
    ) -> Result<BatchReport, ProviderError> {
        let texts = batch.texts();
        let translated = match self
            .service
            .translate_batch(&texts, ctx.source_language, ctx.target_language, &ctx.options)
            .await
        {
            Ok(translated) => translated,
            Err(e) => {
                error!("{} failed for session {}: {}", batch.id, ctx.session_id, e);
                for id in batch.fragment_ids() {
                    self.recovery.add_failed(ctx.session_id, &id);
                }
                ctx.cost.record(&batch.id, texts.iter().map(String::as_str), std::iter::empty());
                ctx.tracker.increment(batch.fragment_ids().len());
                self.sync_progress(ctx);
                return Err(e);
            }
        };

        let outputs = translated.translations.iter().flatten().map(String::as_str);
        ctx.cost.record(&batch.id, texts.iter().map(String::as_str), outputs);
        if translated.used_fallback {
            // The individual calls resent every text
            ctx.cost.record(&batch.id, texts.iter().map(String::as_str), std::iter::empty());
        }

        let mut report = BatchReport::default();
        for (item, translation) in batch.items.iter().zip(translated.translations) {
            match translation {
                None => {
                    for id in &item.fragment_ids {
                        self.recovery.add_failed(ctx.session_id, id);
                    }
                    report.errors.push(ErrorRecord::translation_failed(
                        item.fragment_ids.clone(),
                        format!("No translation returned in {}", batch.id),
                    ));
                }
                Some(text) => {
                    let (text, issues, rejection) =
                        self.check_quality(ctx, &batch.id, item, text).await;
                    for id in &item.fragment_ids {
                        if let Some(original) = ctx.originals.get(id.as_str()) {
                            self.recovery
                                .add_completed(ctx.session_id, original.translated(text.clone()));
                        }
                    }
                    report.issues.extend(issues);
                    report.errors.extend(rejection);
                    report.translations.push((item.text.clone(), text));
                }
            }
            ctx.tracker.increment(item.fragment_ids.len());
        }
        self.sync_progress(ctx);

        Ok(report)
    }

    /// Run the quality checker on a professional-tier item, re-translating it
    /// when error issues are found and retries are enabled
    async fn check_quality(
        &self,
        ctx: &RunContext<'_>,
        batch_id: &str,
        item: &CanonicalItem,
        translated: String,
    ) -> (String, Vec<QualityIssue>, Option<ErrorRecord>) {
        if !ctx.tier.runs_quality_checks() {
            return (translated, Vec::new(), None);
        }

        let fragment_id = item.fragment_ids.first().map(String::as_str).unwrap_or_default();
        let check = |text: &str| -> QualityResult {
            self.checker.check(
                &item.text,
                text,
                fragment_id,
                ctx.source_language,
                ctx.target_language,
            )
        };

        let mut best_result = check(&translated);
        let mut best = translated;
        if best_result.passed {
            return (best, best_result.issues, None);
        }

        for issue in best_result.errors() {
            warn!("Quality error in {}: {}", issue.fragment_id, issue.description);
        }

        let quality = &self.config.quality;
        if !quality.retry_on_error_issues {
            return (best, best_result.issues, None);
        }

        for attempt in 1..=quality.max_quality_retries {
            debug!(
                "Re-translating {} (attempt {}/{}, score {})",
                fragment_id, attempt, quality.max_quality_retries, best_result.score
            );
            match self
                .service
                .translate_one(&item.text, ctx.source_language, ctx.target_language, &ctx.options)
                .await
            {
                Ok(candidate) => {
                    ctx.cost.record(batch_id, [item.text.as_str()], [candidate.as_str()]);
                    let result = check(&candidate);
                    if result.score > best_result.score {
                        best = candidate;
                        best_result = result;
                    }
                    if best_result.passed {
                        break;
                    }
                }
                Err(e) => warn!("Quality retry for {} failed: {}", fragment_id, e),
            }
        }

        let rejection = (!best_result.passed).then(|| {
            ErrorRecord::quality_rejected(
                item.fragment_ids.clone(),
                format!(
                    "{} error issues left after {} retries (score {})",
                    best_result.errors().count(),
                    quality.max_quality_retries,
                    best_result.score
                ),
            )
        });
        (best, best_result.issues, rejection)
    }

    fn sync_progress(&self, ctx: &RunContext<'_>) {
        self.recovery
            .update_progress(ctx.session_id, ctx.tracker.snapshot());
    }
}

/// Publish progress a provider reports from its own chunking as the message
/// of the run's current phase
fn provider_progress_hook(tracker: &Arc<ProgressTracker>) -> ProviderProgressCallback {
    let tracker = Arc::clone(tracker);
    Arc::new(move |current: usize, total: usize, percentage: f64, phase: &str| {
        tracker.set_message(format!("{} {}/{} ({:.0}%)", phase, current, total, percentage));
    })
}
