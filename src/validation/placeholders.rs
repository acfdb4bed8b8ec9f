/*!
 * Placeholder validation for translated fragments.
 *
 * Template placeholders, URLs and email addresses must come through
 * translation untouched. Placeholder patterns are compared by occurrence count
 * and then by the set of matched substrings; URLs and emails by set only.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;

use super::service::{CheckContext, IssueSeverity, IssueType, QualityIssue};

/// Placeholder patterns, most specific first. Each pattern is matched on the
/// text left after removing matches of the patterns before it, so `{{x}}` is
/// not also counted as `{x}`.
static PLACEHOLDER_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("{{x}}", r"\{\{[^{}]+\}\}"),
        ("${x}", r"\$\{[^{}]+\}"),
        ("#{x}", r"#\{[^{}]+\}"),
        ("{x}", r"\{[^{}]+\}"),
        ("[x]", r"\[[^\[\]]+\]"),
        ("%s", r"%(?:\d+\$)?[-+0#]*\d*(?:\.\d+)?[sdifuxXeEgGc@]"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("Invalid placeholder regex")))
    .collect()
});

/// Regex for http(s) URLs
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"'()\[\]{}]+"#).expect("Invalid URL regex")
});

/// Regex for email addresses
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

/// Placeholder occurrences of every pattern, in pattern order
pub fn extract_placeholders(text: &str) -> Vec<(&'static str, Vec<String>)> {
    let mut remaining: Cow<'_, str> = Cow::Borrowed(text);
    let mut found = Vec::with_capacity(PLACEHOLDER_PATTERNS.len());

    for (name, regex) in PLACEHOLDER_PATTERNS.iter() {
        let matches: Vec<String> = regex
            .find_iter(&remaining)
            .map(|m| m.as_str().to_string())
            .collect();
        if !matches.is_empty() {
            remaining = Cow::Owned(regex.replace_all(&remaining, " ").into_owned());
        }
        found.push((*name, matches));
    }

    found
}

/// Distinct URLs in a text, without trailing sentence punctuation
pub fn extract_urls(text: &str) -> BTreeSet<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .collect()
}

/// Distinct email addresses in a text
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Placeholder validator for translations
#[derive(Debug, Clone, Default)]
pub struct PlaceholderValidator;

impl PlaceholderValidator {
    pub(crate) fn check(&self, ctx: &CheckContext<'_>) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        let source = extract_placeholders(ctx.original);
        let translated = extract_placeholders(ctx.translated);
        for ((name, expected), (_, actual)) in source.iter().zip(translated.iter()) {
            if expected.len() != actual.len() {
                issues.push(ctx.issue(
                    IssueType::PlaceholderMismatch,
                    IssueSeverity::Error,
                    format!(
                        "{} placeholder count mismatch: original has {}, translation has {}",
                        name,
                        expected.len(),
                        actual.len()
                    ),
                ));
                continue;
            }

            let expected_set: BTreeSet<&String> = expected.iter().collect();
            let actual_set: BTreeSet<&String> = actual.iter().collect();
            if expected_set != actual_set {
                issues.push(ctx.issue(
                    IssueType::PlaceholderMismatch,
                    IssueSeverity::Error,
                    format!(
                        "{} placeholders changed: {:?} became {:?}",
                        name, expected_set, actual_set
                    ),
                ));
            }
        }

        let (source_urls, translated_urls) = (extract_urls(ctx.original), extract_urls(ctx.translated));
        if source_urls != translated_urls {
            issues.push(ctx.issue(
                IssueType::PlaceholderMismatch,
                IssueSeverity::Error,
                format!("URLs changed: {:?} became {:?}", source_urls, translated_urls),
            ));
        }

        let (source_emails, translated_emails) =
            (extract_emails(ctx.original), extract_emails(ctx.translated));
        if source_emails != translated_emails {
            issues.push(ctx.issue(
                IssueType::PlaceholderMismatch,
                IssueSeverity::Error,
                format!("Email addresses changed: {:?} became {:?}", source_emails, translated_emails),
            ));
        }

        issues
    }
}
