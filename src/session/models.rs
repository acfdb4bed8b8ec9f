/*!
 * Recovery session records.
 *
 * A `RecoverySession` is everything needed to resume an interrupted run:
 * the original request, the last known progress, and which fragments are
 * already translated.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::progress::{ProgressPhase, ProgressState};
use crate::translation::models::{Fragment, TranslationRequest};

/// Durable record of one translation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySession {
    /// Session ID, also the storage key
    pub id: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Request the run was started with
    pub original_request: TranslationRequest,
    /// Last known progress
    pub progress: ProgressState,
    /// Fragments with a translation, in completion order
    pub completed_fragment_ids: Vec<String>,
    /// Fragments that failed at least once, in failure order
    pub failed_fragment_ids: Vec<String>,
    /// Translations obtained so far
    pub translated_fragments: BTreeMap<String, Fragment>,
}

impl RecoverySession {
    /// Create a fresh session for a request
    pub fn new(id: String, original_request: TranslationRequest) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            original_request,
            progress: ProgressState::default(),
            completed_fragment_ids: Vec::new(),
            failed_fragment_ids: Vec::new(),
            translated_fragments: BTreeMap::new(),
        }
    }

    /// Record a translated fragment; ids are never removed once added
    pub fn add_completed(&mut self, fragment: Fragment) {
        if !self.completed_fragment_ids.contains(&fragment.id) {
            self.completed_fragment_ids.push(fragment.id.clone());
        }
        self.translated_fragments.insert(fragment.id.clone(), fragment);
    }

    /// Record a failed fragment; ids are never removed once added
    pub fn add_failed(&mut self, fragment_id: &str) {
        if !self.failed_fragment_ids.iter().any(|id| id == fragment_id) {
            self.failed_fragment_ids.push(fragment_id.to_string());
        }
    }

    /// Fragments of the original request that still need a translation.
    ///
    /// Failed fragments are included: only completed ids are excluded.
    pub fn get_resumable_fragments(&self) -> Vec<Fragment> {
        let completed: HashSet<&str> = self
            .completed_fragment_ids
            .iter()
            .map(String::as_str)
            .collect();

        self.original_request
            .fragments
            .iter()
            .filter(|f| !completed.contains(f.id.as_str()))
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            timestamp: self.timestamp,
            phase: self.progress.phase,
            progress_percentage: self.progress.percentage(),
            completed_count: self.completed_fragment_ids.len(),
            failed_count: self.failed_fragment_ids.len(),
            fragment_count: self.original_request.fragments.len(),
        }
    }
}

/// Listing entry for a persisted session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub phase: ProgressPhase,
    pub progress_percentage: f64,
    pub completed_count: usize,
    pub failed_count: usize,
    pub fragment_count: usize,
}

impl SessionSummary {
    /// Check if session is worth resuming
    pub fn is_resumable(&self) -> bool {
        self.phase != ProgressPhase::Completed || self.failed_count > 0
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({:.1}% complete, {} failed, {})",
            self.id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.progress_percentage,
            self.failed_count,
            self.phase
        )
    }
}
