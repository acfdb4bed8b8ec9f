/*!
 * Error types for the transcore pipeline.
 *
 * This module contains custom error types for the different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions, plus the serialisable
 * `ErrorRecord` that partial failures are reported through.
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when calling the external translation capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making a request fails
    #[error("Translation request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the capability itself
    #[error("Provider responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP-like status code
        status_code: u16,
        /// Error message from the provider
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider returned a different number of texts than it was given
    #[error("Provider returned {actual} translations for {expected} texts")]
    LengthMismatch {
        /// Number of texts sent
        expected: usize,
        /// Number of texts received
        actual: usize,
    },
}

/// Errors raised by recovery persistence
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// Filesystem failure
    #[error("Recovery I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session record could not be encoded or decoded
    #[error("Recovery serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session id cannot be used as a storage key
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    /// Blocking persistence task did not finish
    #[error("Recovery task failed: {0}")]
    Task(String),
}

/// Errors that abort a translation run before any batch work starts
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Nothing left after trimming every fragment
    #[error("No translatable text in request ({0} fragments, all empty)")]
    NoTranslatableText(usize),

    /// Unknown language code
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// Pipeline settings are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Kind of a non-fatal failure recorded in a translation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The batch produced no translation for an item
    TranslationFailed,
    /// The whole batch call failed
    BatchFailed,
    /// Quality retries were exhausted with error-severity issues left
    QualityRejected,
}

/// A partial failure attached to a translation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Failure category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Fragments affected by the failure
    pub fragment_ids: Vec<String>,
    /// Whether resuming the session will try these fragments again
    pub retryable: bool,
}

impl ErrorRecord {
    /// An item in a batch came back without a translation
    pub fn translation_failed(fragment_ids: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::TranslationFailed,
            message: message.into(),
            fragment_ids,
            retryable: true,
        }
    }

    /// A batch call failed as a whole
    pub fn batch_failed(fragment_ids: Vec<String>, error: &ProviderError) -> Self {
        Self {
            kind: ErrorKind::BatchFailed,
            message: error.to_string(),
            fragment_ids,
            retryable: true,
        }
    }

    /// The translation was kept but failed quality checks after retrying
    pub fn quality_rejected(fragment_ids: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::QualityRejected,
            message: message.into(),
            fragment_ids,
            retryable: false,
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} ({} fragments): {}",
            self.kind,
            self.fragment_ids.len(),
            self.message
        )
    }
}
