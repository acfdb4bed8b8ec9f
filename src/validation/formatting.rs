/*!
 * Format validation for translated fragments.
 *
 * This module validates that structural formatting survives translation:
 * - Line break count
 * - Bullet list markers
 * - Numbered list markers
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::service::{CheckContext, IssueSeverity, IssueType, QualityIssue};

/// Regex for bullet list lines
static BULLET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*[-*•◦▪‣][ \t]+").expect("Invalid bullet regex")
});

/// Regex for numbered list lines ("1." or "1)")
static NUMBERED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+").expect("Invalid numbered list regex")
});

/// Structural counts of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    pub line_breaks: usize,
    pub bullets: usize,
    pub numbered: usize,
}

impl FormatProfile {
    pub fn of(text: &str) -> Self {
        Self {
            line_breaks: text.matches('\n').count(),
            bullets: BULLET_REGEX.find_iter(text).count(),
            numbered: NUMBERED_REGEX.find_iter(text).count(),
        }
    }
}

/// Format validator for translations
#[derive(Debug, Clone, Default)]
pub struct FormatValidator;

impl FormatValidator {
    pub(crate) fn check(&self, ctx: &CheckContext<'_>) -> Vec<QualityIssue> {
        let source = FormatProfile::of(ctx.original);
        let translated = FormatProfile::of(ctx.translated);

        [
            ("line breaks", source.line_breaks, translated.line_breaks),
            ("bullet markers", source.bullets, translated.bullets),
            ("numbered list items", source.numbered, translated.numbered),
        ]
        .into_iter()
        .filter(|(_, expected, actual)| expected != actual)
        .map(|(what, expected, actual)| {
            ctx.issue(
                IssueType::FormatMismatch,
                IssueSeverity::Warning,
                format!("{} mismatch: original has {}, translation has {}", what, expected, actual),
            )
        })
        .collect()
    }
}
