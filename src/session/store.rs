/*!
 * Durable storage for recovery sessions.
 *
 * - `JsonFileStore`: one `<session_id>.json` file per session in a directory
 * - `MemoryStore`: process-local map, for tests and disabled recovery
 *
 * File operations run on the blocking thread pool so autosaves never stall
 * the runtime driving the translation.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::RecoveryError;
use crate::file_utils::FileManager;

use super::models::{RecoverySession, SessionSummary};

/// Session ids double as file names
static SESSION_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid session id regex"));

const SESSION_FILE_EXTENSION: &str = "json";

/// Reject ids that are unsafe as storage keys
pub fn validate_session_id(id: &str) -> Result<(), RecoveryError> {
    if SESSION_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(RecoveryError::InvalidSessionId(id.to_string()))
    }
}

/// Persistence backend for recovery sessions
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Write a session, replacing any earlier version
    async fn save(&self, session: &RecoverySession) -> Result<(), RecoveryError>;

    /// Read a session; `Ok(None)` when it does not exist
    async fn load(&self, id: &str) -> Result<Option<RecoverySession>, RecoveryError>;

    /// Remove a session; returns whether it existed
    async fn delete(&self, id: &str) -> Result<bool, RecoveryError>;

    /// Summaries of every readable session, newest first
    async fn list(&self) -> Result<Vec<SessionSummary>, RecoveryError>;

    /// Remove sessions created before `cutoff`; returns how many were removed
    async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, RecoveryError>;
}

/// Run a blocking store operation off the async runtime
async fn run_blocking<F, T>(f: F) -> Result<T, RecoveryError>
where
    F: FnOnce() -> Result<T, RecoveryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RecoveryError::Task(e.to_string()))?
}

fn newest_first(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// Directory of JSON session files
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    /// Create a store over a directory; it is created on first save
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File path for a session id
    pub fn session_path(&self, id: &str) -> Result<PathBuf, RecoveryError> {
        validate_session_id(id)?;
        Ok(self
            .directory
            .join(format!("{}.{}", id, SESSION_FILE_EXTENSION)))
    }

    fn read_session(path: &Path) -> Result<Option<RecoverySession>, RecoveryError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn session_files(directory: &Path) -> Vec<PathBuf> {
        WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(SESSION_FILE_EXTENSION))
            .collect()
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn save(&self, session: &RecoverySession) -> Result<(), RecoveryError> {
        let path = self.session_path(&session.id)?;
        let bytes = serde_json::to_vec_pretty(session)?;

        run_blocking(move || {
            FileManager::write_atomic(&path, &bytes)?;
            Ok(())
        })
        .await
    }

    async fn load(&self, id: &str) -> Result<Option<RecoverySession>, RecoveryError> {
        let path = self.session_path(id)?;
        run_blocking(move || Self::read_session(&path)).await
    }

    async fn delete(&self, id: &str) -> Result<bool, RecoveryError> {
        let path = self.session_path(id)?;
        run_blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, RecoveryError> {
        let directory = self.directory.clone();
        run_blocking(move || {
            let mut summaries: Vec<SessionSummary> = Self::session_files(&directory)
                .into_iter()
                .filter_map(|path| match Self::read_session(&path) {
                    Ok(session) => session.map(|s| s.summary()),
                    Err(e) => {
                        debug!("Skipping unreadable session file {:?}: {}", path, e);
                        None
                    }
                })
                .collect();
            newest_first(&mut summaries);
            Ok(summaries)
        })
        .await
    }

    async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, RecoveryError> {
        let directory = self.directory.clone();
        run_blocking(move || {
            let mut removed = 0;
            for path in Self::session_files(&directory) {
                // Unreadable files are aged by modification time instead
                let created = match Self::read_session(&path) {
                    Ok(Some(session)) => Some(session.timestamp),
                    Ok(None) => None,
                    Err(_) => fs::metadata(&path)
                        .and_then(|m| m.modified())
                        .ok()
                        .map(DateTime::<Utc>::from),
                };

                if created.is_some_and(|t| t < cutoff) {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => warn!("Failed to remove expired session {:?}: {}", path, e),
                    }
                }
            }
            Ok(removed)
        })
        .await
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, RecoverySession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save(&self, session: &RecoverySession) -> Result<(), RecoveryError> {
        validate_session_id(&session.id)?;
        self.sessions
            .lock()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<RecoverySession>, RecoveryError> {
        validate_session_id(id)?;
        Ok(self.sessions.lock().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, RecoveryError> {
        validate_session_id(id)?;
        Ok(self.sessions.lock().remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, RecoveryError> {
        let mut summaries: Vec<SessionSummary> =
            self.sessions.lock().values().map(|s| s.summary()).collect();
        newest_first(&mut summaries);
        Ok(summaries)
    }

    async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, RecoveryError> {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.timestamp >= cutoff);
        Ok(before - sessions.len())
    }
}
