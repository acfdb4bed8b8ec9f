/*!
 * Crash recovery for translation runs.
 *
 * This module provides:
 * - Durable session records of a run's progress and partial results
 * - Pluggable storage (JSON files or memory)
 * - The recovery manager that autosaves, loads and expires sessions
 */

pub mod manager;
pub mod models;
pub mod store;

// Re-export main types
pub use manager::RecoveryManager;
pub use models::{RecoverySession, SessionSummary};
pub use store::{JsonFileStore, MemoryStore, SessionStore};
