/*!
 * # transcore - Crash-recoverable translation pipeline core
 *
 * A Rust library that takes extracted text fragments and translates them
 * through an external translation capability.
 *
 * ## Features
 *
 * - Deduplication of identical fragments so each text is translated once
 * - Batching bounded by item count and an estimated token budget
 * - Bounded-concurrency batch execution with per-batch failure isolation
 * - Heuristic quality checks (length, formatting, placeholders, URLs, emails)
 * - Progress publishing to any number of subscribers
 * - Durable recovery sessions with autosave and resume
 * - Token-based cost estimation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The pipeline itself:
 *   - `translation::dedup`: Fragment deduplication
 *   - `translation::batch`: Batch building
 *   - `translation::concurrency`: Bounded worker pool
 *   - `translation::core`: Provider calls with individual fallback
 *   - `translation::orchestrator`: End-to-end runs and resume
 * - `validation`: Quality checking
 * - `progress`: Progress tracking and publishing
 * - `session`: Recovery sessions and their storage
 * - `providers`: The translation capability interface and a mock
 * - `language_utils`: ISO language code utilities
 * - `file_utils`: File system operations
 * - `logging`: Stderr logger
 * - `errors`: Custom error types
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod logging;
pub mod progress;
pub mod providers;
pub mod session;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::{Config, QualityTier};
pub use errors::{ErrorKind, ErrorRecord, ProviderError, RecoveryError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use progress::{ProgressEmitter, ProgressPhase, ProgressState, ProgressTracker};
pub use providers::{TranslateOptions, TranslationProvider};
pub use session::{RecoveryManager, RecoverySession};
pub use translation::{Fragment, TranslationOrchestrator, TranslationRequest, TranslationResult};
pub use validation::{QualityChecker, QualityIssue, QualityResult};
