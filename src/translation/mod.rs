/*!
 * Translation pipeline core.
 *
 * This module contains the functionality that turns a set of fragments into
 * translated fragments. It is split into several submodules:
 *
 * - `models`: Fragments, requests and results
 * - `dedup`: Collapsing fragments with identical text
 * - `batch`: Token-budget-aware batch building
 * - `concurrency`: Worker pool with a concurrency ceiling
 * - `core`: Provider calls with per-text fallback
 * - `cost`: Token and cost estimation
 * - `orchestrator`: `translate` and `resume_translation`
 */

// Re-export main types for easier usage
pub use self::batch::{Batch, BatchBuilder};
pub use self::concurrency::{BatchOutcome, BatchProcessor};
pub use self::core::TranslationService;
pub use self::cost::{Cost, CostTracker};
pub use self::dedup::{DeduplicationResult, Deduplicator};
pub use self::models::{
    CanonicalItem, Fragment, TranslationMetadata, TranslationRequest, TranslationResult,
};
pub use self::orchestrator::TranslationOrchestrator;

// Submodules
pub mod batch;
pub mod concurrency;
pub mod core;
pub mod cost;
pub mod dedup;
pub mod models;
pub mod orchestrator;
