/*!
 * Tests for the quality checker
 */

use transcore::app_config::QualityConfig;
use transcore::validation::placeholders::{extract_emails, extract_urls};
use transcore::validation::{IssueSeverity, IssueType, QualityChecker, QualityIssue, QualityResult};

fn check(original: &str, translated: &str) -> QualityResult {
    QualityChecker::new().check(original, translated, "frag-1", "en", "fr")
}

fn issue(severity: IssueSeverity) -> QualityIssue {
    QualityIssue {
        issue_type: IssueType::LengthMismatch,
        severity,
        fragment_id: "x".to_string(),
        description: String::new(),
        original: String::new(),
        translated: String::new(),
    }
}

/// An empty translation is a single untranslated error
#[test]
fn test_check_withEmptyTranslation_shouldFailWithScoreNinety() {
    let result = check("Hello World", "");

    assert!(!result.passed);
    assert_eq!(result.score, 90);
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].issue_type, IssueType::Untranslated);
    assert_eq!(result.issues[0].severity, IssueSeverity::Error);
    assert_eq!(result.issues[0].fragment_id, "frag-1");
}

#[test]
fn test_check_withGoodTranslation_shouldPassWithFullScore() {
    let result = check("Hello World", "Bonjour le monde");

    assert!(result.passed);
    assert!(result.issues.is_empty());
    assert_eq!(result.score, 100);
}

/// Score deducts the severity weight of every issue
#[test]
fn test_qualityResult_fromIssues_shouldDeductWeights() {
    let result = QualityResult::from_issues(vec![
        issue(IssueSeverity::Error),
        issue(IssueSeverity::Warning),
    ]);
    assert_eq!(result.score, 85);
    assert!(!result.passed);

    let result = QualityResult::from_issues(vec![issue(IssueSeverity::Info); 3]);
    assert_eq!(result.score, 97);
    assert!(result.passed);

    let result = QualityResult::from_issues(vec![issue(IssueSeverity::Error); 12]);
    assert_eq!(result.score, 0);
}

#[test]
fn test_check_withPassthroughText_shouldWarn() {
    let result = check("This sentence was not translated", "This sentence was not translated");

    assert!(result.passed);
    assert_eq!(result.score, 95);
    assert_eq!(result.issues[0].issue_type, IssueType::Untranslated);
    assert_eq!(result.issues[0].severity, IssueSeverity::Warning);
}

#[test]
fn test_check_withSameLanguage_shouldAcceptIdenticalText() {
    let result = QualityChecker::new().check(
        "This sentence stays as it is",
        "This sentence stays as it is",
        "frag-1",
        "en",
        "eng",
    );

    assert!(result.issues.is_empty());
}

#[test]
fn test_check_withShortPassthrough_shouldNotWarn() {
    let result = check("OK", "OK");
    assert!(result.issues.is_empty());
}

#[test]
fn test_check_withTooLongTranslation_shouldReportLengthWarning() {
    let result = check("Yes", "Oui, absolument, bien entendu");

    assert!(result.passed);
    let length: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.issue_type == IssueType::LengthMismatch)
        .collect();
    assert_eq!(length.len(), 1);
    assert_eq!(length[0].severity, IssueSeverity::Warning);
}

#[test]
fn test_check_withCustomRatioBounds_shouldUseConfig() {
    let config = QualityConfig {
        min_length_ratio: 0.1,
        max_length_ratio: 20.0,
        ..QualityConfig::default()
    };
    let result = QualityChecker::with_config(&config).check(
        "Yes",
        "Oui, absolument, bien entendu",
        "frag-1",
        "en",
        "fr",
    );

    assert!(result.issues.is_empty());
}

/// Test placeholder preservation
#[test]
fn test_check_withDroppedPlaceholder_shouldBeError() {
    let result = check("Hello {name}, you have {count} messages", "Bonjour {name}, vous avez des messages");

    assert!(!result.passed);
    assert!(result
        .errors()
        .any(|i| i.issue_type == IssueType::PlaceholderMismatch));
}

#[test]
fn test_check_withReorderedPlaceholders_shouldPass() {
    let result = check("{count} messages for {name}", "{name} a {count} messages");
    assert!(result.passed);
}

#[test]
fn test_check_withRenamedTemplateVariable_shouldBeError() {
    let result = check("Welcome {{user}} to %s", "Bienvenue {{utilisateur}} sur %s");

    assert!(!result.passed);
    assert_eq!(result.errors().count(), 1);
}

#[test]
fn test_check_withChangedUrl_shouldBeError() {
    let result = check(
        "Read more at https://example.com/docs.",
        "Plus d'informations sur https://example.fr/docs.",
    );

    assert!(result
        .errors()
        .any(|i| i.description.contains("URLs changed")));
}

#[test]
fn test_check_withChangedEmail_shouldBeError() {
    let result = check("Write to help@example.com", "Écrivez à aide@example.com");

    assert!(result
        .errors()
        .any(|i| i.description.contains("Email addresses changed")));
}

#[test]
fn test_extractUrls_shouldTrimTrailingPunctuation() {
    let urls = extract_urls("See https://example.com/a, then http://test.org/b!");

    assert!(urls.contains("https://example.com/a"));
    assert!(urls.contains("http://test.org/b"));
}

#[test]
fn test_extractEmails_shouldFindAddresses() {
    let emails = extract_emails("Contact a.b@example.com or admin@test.org.");
    assert_eq!(emails.len(), 2);
}

/// Test line break and list structure checks
#[test]
fn test_check_withLostLineBreaks_shouldWarn() {
    let result = check("Line one\nLine two\nLine three", "Ligne un Ligne deux Ligne trois");

    assert!(result.passed);
    assert!(result
        .issues
        .iter()
        .any(|i| i.issue_type == IssueType::FormatMismatch && i.severity == IssueSeverity::Warning));
}

#[test]
fn test_check_withPreservedList_shouldPass() {
    let result = check(
        "Steps:\n1. Open\n2. Save\n- done",
        "Étapes :\n1. Ouvrir\n2. Enregistrer\n- terminé",
    );

    assert!(result.passed);
    assert_eq!(result.score, 100);
}

#[test]
fn test_qualityIssue_serialize_shouldUseTypeField() {
    let json = serde_json::to_value(issue(IssueSeverity::Warning)).unwrap();

    assert_eq!(json["type"], "length_mismatch");
    assert_eq!(json["severity"], "warning");
}
