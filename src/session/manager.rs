/*!
 * Recovery manager for translation session lifecycle.
 *
 * This module handles:
 * - Creating sessions and persisting them immediately
 * - Recording completed and failed fragments as batches finish
 * - Autosaving every active session on a fixed interval
 * - Loading, listing, deleting and expiring persisted sessions
 *
 * All state is keyed by session id, so one manager can track any number of
 * concurrent runs. Persistence is best-effort: storage errors are logged and
 * never reach the translation that triggered them.
 */

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::app_config::RecoveryConfig;
use crate::progress::{ProgressPhase, ProgressState};
use crate::translation::models::{Fragment, TranslationRequest};

use super::models::{RecoverySession, SessionSummary};
use super::store::{JsonFileStore, MemoryStore, SessionStore};

/// Length of the random part of a session id
const SESSION_SUFFIX_LEN: usize = 8;

/// Age after which `cleanup_expired` removes a session
const DEFAULT_MAX_AGE_DAYS: u64 = 7;

/// A session with a running autosave task
struct ActiveSession {
    state: Arc<Mutex<RecoverySession>>,
    /// Cancels the autosave task when dropped
    cancel: DropGuard,
    autosave: Option<JoinHandle<()>>,
}

/// Recovery manager for handling translation session lifecycle
pub struct RecoveryManager {
    /// Persistence backend
    store: Arc<dyn SessionStore>,
    /// Autosave period; zero disables autosave
    autosave_interval: Duration,
    /// Age limit used by `cleanup_expired`
    max_age_days: u64,
    /// Sessions created by this manager and not yet completed or failed
    active: Mutex<HashMap<String, ActiveSession>>,
}

impl RecoveryManager {
    /// Create a new recovery manager over a store
    pub fn new(store: Arc<dyn SessionStore>, autosave_interval: Duration) -> Self {
        Self {
            store,
            autosave_interval,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Set the age limit applied by `cleanup_expired`
    pub fn with_max_age_days(mut self, max_age_days: u64) -> Self {
        self.max_age_days = max_age_days;
        self
    }

    /// Create a manager persisting JSON files to a directory
    pub fn with_directory<P: Into<PathBuf>>(directory: P, autosave_interval: Duration) -> Self {
        Self::new(Arc::new(JsonFileStore::new(directory)), autosave_interval)
    }

    /// Create a manager from settings; disabled recovery keeps sessions in memory
    pub fn from_config(config: &RecoveryConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::new_in_memory().with_max_age_days(config.max_age_days));
        }
        let directory = config.resolve_directory()?;
        debug!("Recovery sessions stored in {:?}", directory);
        Ok(Self::with_directory(directory, config.autosave_interval())
            .with_max_age_days(config.max_age_days))
    }

    /// Create a manager with an in-memory store and no autosave (for testing)
    pub fn new_in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Duration::ZERO)
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Age limit used by `cleanup_expired`
    pub fn max_age_days(&self) -> u64 {
        self.max_age_days
    }

    /// Number of sessions still running
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Create and persist a session for a request, and start autosaving it
    pub async fn create_session(&self, request: &TranslationRequest) -> String {
        let session_id = generate_session_id();
        let session = RecoverySession::new(session_id.clone(), request.clone());

        info!(
            "Creating recovery session {} ({} fragments)",
            session_id,
            request.fragments.len()
        );

        if let Err(e) = self.store.save(&session).await {
            warn!("Failed to persist new session {}: {}", session_id, e);
        }

        let state = Arc::new(Mutex::new(session));
        let token = CancellationToken::new();
        let autosave = (!self.autosave_interval.is_zero()).then(|| {
            tokio::spawn(autosave_loop(
                Arc::clone(&self.store),
                Arc::clone(&state),
                self.autosave_interval,
                token.clone(),
            ))
        });

        self.active.lock().insert(
            session_id.clone(),
            ActiveSession {
                state,
                cancel: token.drop_guard(),
                autosave,
            },
        );

        session_id
    }

    /// Record a translated fragment
    pub fn add_completed(&self, session_id: &str, fragment: Fragment) {
        self.with_session(session_id, |s| s.add_completed(fragment));
    }

    /// Record a failed fragment
    pub fn add_failed(&self, session_id: &str, fragment_id: &str) {
        self.with_session(session_id, |s| s.add_failed(fragment_id));
    }

    /// Store the latest progress snapshot
    pub fn update_progress(&self, session_id: &str, progress: ProgressState) {
        self.with_session(session_id, |s| s.progress = progress);
    }

    /// In-memory state of an active session
    pub fn snapshot(&self, session_id: &str) -> Option<RecoverySession> {
        let state = self.state_of(session_id)?;
        let session = state.lock().clone();
        Some(session)
    }

    /// Persist the current state of an active session; returns whether it was written
    pub async fn save_state(&self, session_id: &str) -> bool {
        match self.snapshot(session_id) {
            Some(session) => self.persist(&session).await,
            None => {
                debug!("save_state: session {} is not active", session_id);
                false
            }
        }
    }

    /// Stop autosaving, mark the session completed and save it one last time
    pub async fn complete(&self, session_id: &str) -> Option<RecoverySession> {
        let session = self
            .finish(session_id, ProgressPhase::Completed, None)
            .await?;
        info!("Recovery session {} completed", session_id);
        Some(session)
    }

    /// Stop autosaving, mark the session failed and save it one last time
    pub async fn fail(&self, session_id: &str, message: &str) -> Option<RecoverySession> {
        let session = self
            .finish(session_id, ProgressPhase::Error, Some(message.to_string()))
            .await?;
        warn!("Recovery session {} failed: {}", session_id, message);
        Some(session)
    }

    /// Stop tracking a session without a final save.
    ///
    /// Used when a run is dropped mid-flight: the last autosave stays on
    /// disk and the autosave task is cancelled.
    pub fn abandon(&self, session_id: &str) -> bool {
        let removed = self.active.lock().remove(session_id);
        if removed.is_some() {
            warn!("Recovery session {} abandoned before completion", session_id);
        }
        removed.is_some()
    }

    // =========================================================================
    // Persisted Sessions
    // =========================================================================

    /// Load a persisted session; `None` when missing or unreadable
    pub async fn load_state(&self, session_id: &str) -> Option<RecoverySession> {
        match self.store.load(session_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to load session {}: {}", session_id, e);
                None
            }
        }
    }

    /// Summaries of persisted sessions, newest first
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store.list().await.unwrap_or_else(|e| {
            warn!("Failed to list sessions: {}", e);
            Vec::new()
        })
    }

    /// Delete a persisted session, stopping it first if it is active
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let active = self.active.lock().remove(session_id);
        if let Some(active) = active {
            Self::stop_autosave(session_id, active.cancel, active.autosave).await;
        }
        match self.store.delete(session_id).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!("Failed to delete session {}: {}", session_id, e);
                false
            }
        }
    }

    /// Delete persisted sessions older than the configured age limit
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup(self.max_age_days).await
    }

    /// Delete persisted sessions older than `max_age_days`.
    ///
    /// An age too large to subtract from the current time removes nothing.
    pub async fn cleanup(&self, max_age_days: u64) -> usize {
        let cutoff = i64::try_from(max_age_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            debug!("Cleanup age of {} days reaches past the earliest date, nothing removed", max_age_days);
            return 0;
        };

        match self.store.cleanup_older_than(cutoff).await {
            Ok(removed) => {
                if removed > 0 {
                    info!("Removed {} recovery sessions older than {} days", removed, max_age_days);
                }
                removed
            }
            Err(e) => {
                warn!("Session cleanup failed: {}", e);
                0
            }
        }
    }

    /// Fragments of a session that still need a translation
    pub fn get_resumable_fragments(session: &RecoverySession) -> Vec<Fragment> {
        session.get_resumable_fragments()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn state_of(&self, session_id: &str) -> Option<Arc<Mutex<RecoverySession>>> {
        self.active
            .lock()
            .get(session_id)
            .map(|active| Arc::clone(&active.state))
    }

    fn with_session<F: FnOnce(&mut RecoverySession)>(&self, session_id: &str, f: F) {
        match self.state_of(session_id) {
            Some(state) => f(&mut state.lock()),
            None => debug!("Ignoring update for inactive session {}", session_id),
        }
    }

    async fn persist(&self, session: &RecoverySession) -> bool {
        match self.store.save(session).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save session {}: {}", session.id, e);
                false
            }
        }
    }

    /// Cancel the autosave task and wait for it, so a save still in flight
    /// cannot land after whatever the caller writes next
    async fn stop_autosave(session_id: &str, cancel: DropGuard, task: Option<JoinHandle<()>>) {
        drop(cancel);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Autosave task for {} ended abnormally: {}", session_id, e);
            }
        }
    }

    async fn finish(
        &self,
        session_id: &str,
        phase: ProgressPhase,
        message: Option<String>,
    ) -> Option<RecoverySession> {
        let active = self.active.lock().remove(session_id)?;
        Self::stop_autosave(session_id, active.cancel, active.autosave).await;

        let session = {
            let mut state = active.state.lock();
            state.progress.phase = phase;
            state.progress.message = message;
            state.progress.estimated_time_remaining_ms = None;
            state.clone()
        };
        self.persist(&session).await;
        Some(session)
    }
}

impl std::fmt::Debug for RecoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryManager")
            .field("store", &self.store)
            .field("autosave_interval", &self.autosave_interval)
            .field("max_age_days", &self.max_age_days)
            .field("active", &self.active_count())
            .finish()
    }
}

/// Session id: creation timestamp plus a random suffix
fn generate_session_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S%3f"), suffix)
}

/// Re-persist the latest state until cancelled
async fn autosave_loop(
    store: Arc<dyn SessionStore>,
    state: Arc<Mutex<RecoverySession>>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let session = state.lock().clone();
                match store.save(&session).await {
                    Ok(()) => debug!(
                        "Autosaved session {} ({} completed)",
                        session.id,
                        session.completed_fragment_ids.len()
                    ),
                    Err(e) => warn!("Autosave of session {} failed: {}", session.id, e),
                }
            }
        }
    }
}
