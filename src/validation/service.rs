/*!
 * Quality checker that runs every heuristic rule on a translated item.
 *
 * This module provides the issue and result types and the `QualityChecker`
 * that combines length, formatting and placeholder rules into a scored result.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app_config::QualityConfig;
use crate::language_utils::language_codes_match;

use super::formatting::FormatValidator;
use super::length::LengthValidator;
use super::placeholders::PlaceholderValidator;

/// Category of a quality issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Missing or passthrough translation
    Untranslated,
    /// Length ratio out of bounds
    LengthMismatch,
    /// Line breaks or list markers differ
    FormatMismatch,
    /// Placeholders, URLs or emails differ
    PlaceholderMismatch,
}

/// Severity of a quality issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Translation is likely wrong
    Error,
    /// Translation usable but suspicious
    Warning,
    /// Worth noting only
    Info,
}

impl IssueSeverity {
    /// Score deduction for an issue of this severity
    pub fn weight(&self) -> u32 {
        match self {
            Self::Error => 10,
            Self::Warning => 5,
            Self::Info => 1,
        }
    }
}

/// A single finding about a translated fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub fragment_id: String,
    pub description: String,
    pub original: String,
    pub translated: String,
}

/// Result of checking one translated fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    /// No issue has error severity
    pub passed: bool,
    /// Everything found
    pub issues: Vec<QualityIssue>,
    /// `max(0, 100 - sum of severity weights)`
    pub score: u32,
}

impl QualityResult {
    /// Build a result from issues, deriving score and pass flag
    pub fn from_issues(issues: Vec<QualityIssue>) -> Self {
        let deductions: u32 = issues.iter().map(|i| i.severity.weight()).sum();
        Self {
            passed: !issues.iter().any(|i| i.severity == IssueSeverity::Error),
            score: 100u32.saturating_sub(deductions),
            issues,
        }
    }

    /// Issues with error severity
    pub fn errors(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
    }
}

/// Shared input of every rule
pub(crate) struct CheckContext<'a> {
    pub original: &'a str,
    pub translated: &'a str,
    pub fragment_id: &'a str,
}

impl CheckContext<'_> {
    pub fn issue(&self, issue_type: IssueType, severity: IssueSeverity, description: String) -> QualityIssue {
        QualityIssue {
            issue_type,
            severity,
            fragment_id: self.fragment_id.to_string(),
            description,
            original: self.original.to_string(),
            translated: self.translated.to_string(),
        }
    }
}

/// Heuristic quality checker
#[derive(Debug, Clone)]
pub struct QualityChecker {
    length: LengthValidator,
    formatting: FormatValidator,
    placeholders: PlaceholderValidator,
}

impl QualityChecker {
    /// Create a checker with the default 0.5..2.0 length ratio bounds
    pub fn new() -> Self {
        Self::with_config(&QualityConfig::default())
    }

    /// Create a checker from quality settings
    pub fn with_config(config: &QualityConfig) -> Self {
        Self {
            length: LengthValidator::new(config.min_length_ratio, config.max_length_ratio),
            formatting: FormatValidator,
            placeholders: PlaceholderValidator,
        }
    }

    /// Check a translated text against its original
    pub fn check(
        &self,
        original: &str,
        translated: &str,
        fragment_id: &str,
        source_language: &str,
        target_language: &str,
    ) -> QualityResult {
        let ctx = CheckContext {
            original,
            translated,
            fragment_id,
        };

        if let Some(issue) = self.length.check_empty(&ctx) {
            // Nothing else is meaningful on an empty translation
            return QualityResult::from_issues(vec![issue]);
        }

        let mut issues = Vec::new();
        if !language_codes_match(source_language, target_language) {
            issues.extend(self.length.check_passthrough(&ctx));
        }
        issues.extend(self.length.check_ratio(&ctx));
        issues.extend(self.formatting.check(&ctx));
        issues.extend(self.placeholders.check(&ctx));

        let result = QualityResult::from_issues(issues);
        if !result.issues.is_empty() {
            debug!(
                "Quality check {} ({} -> {}): score {}, {} issues",
                fragment_id,
                source_language,
                target_language,
                result.score,
                result.issues.len()
            );
        }
        result
    }
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self::new()
    }
}
