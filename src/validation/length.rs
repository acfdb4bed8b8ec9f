/*!
 * Length validation for translated fragments.
 *
 * This module validates that translation lengths are reasonable:
 * - Empty translation detection
 * - Passthrough (untranslated) detection
 * - Length ratio between original and translated text
 */

use super::service::{CheckContext, IssueSeverity, IssueType, QualityIssue};

/// Passthrough is only suspicious above this many characters
const PASSTHROUGH_MIN_CHARS: usize = 10;

/// Deviation from a 1.0 ratio above which a mismatch is a warning
const RATIO_WARNING_DEVIATION: f64 = 0.3;

/// Length validator for translations
#[derive(Debug, Clone)]
pub struct LengthValidator {
    min_ratio: f64,
    max_ratio: f64,
}

impl LengthValidator {
    pub fn new(min_ratio: f64, max_ratio: f64) -> Self {
        Self { min_ratio, max_ratio }
    }

    /// Calculate length ratio between translated and original text
    pub fn calculate_ratio(original: &str, translated: &str) -> Option<f64> {
        let original_len = original.chars().count();
        if original_len == 0 {
            return None;
        }
        Some(translated.chars().count() as f64 / original_len as f64)
    }

    /// Empty translated text
    pub(crate) fn check_empty(&self, ctx: &CheckContext<'_>) -> Option<QualityIssue> {
        ctx.translated.trim().is_empty().then(|| {
            ctx.issue(
                IssueType::Untranslated,
                IssueSeverity::Error,
                "Translation is empty".to_string(),
            )
        })
    }

    /// Translation identical to a non-trivial original
    pub(crate) fn check_passthrough(&self, ctx: &CheckContext<'_>) -> Option<QualityIssue> {
        let identical = ctx.translated == ctx.original;
        (identical && ctx.original.chars().count() > PASSTHROUGH_MIN_CHARS).then(|| {
            ctx.issue(
                IssueType::Untranslated,
                IssueSeverity::Warning,
                "Translation is identical to the original".to_string(),
            )
        })
    }

    /// Length ratio outside the configured bounds
    pub(crate) fn check_ratio(&self, ctx: &CheckContext<'_>) -> Option<QualityIssue> {
        let ratio = Self::calculate_ratio(ctx.original, ctx.translated)?;
        if ratio >= self.min_ratio && ratio <= self.max_ratio {
            return None;
        }

        let severity = if (ratio - 1.0).abs() > RATIO_WARNING_DEVIATION {
            IssueSeverity::Warning
        } else {
            IssueSeverity::Info
        };
        let direction = if ratio < self.min_ratio { "short" } else { "long" };

        Some(ctx.issue(
            IssueType::LengthMismatch,
            severity,
            format!(
                "Translation too {}: ratio {:.2} outside [{:.2}, {:.2}]",
                direction, ratio, self.min_ratio, self.max_ratio
            ),
        ))
    }
}
