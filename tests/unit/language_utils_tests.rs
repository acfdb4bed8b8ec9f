/*!
 * Tests for language code utilities
 */

use transcore::language_utils::{
    get_language_name, language_codes_match, normalize_to_part2t, validate_language_code,
    LanguageCodeType,
};

/// Test language code validation across code forms
#[test]
fn test_validateLanguageCode_withMixedCase_shouldNormalize() {
    assert_eq!(validate_language_code(" EN ").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("Fre").unwrap(), LanguageCodeType::Part2B);
    assert_eq!(validate_language_code("spa").unwrap(), LanguageCodeType::Part2T);
}

#[test]
fn test_validateLanguageCode_withGarbage_shouldFail() {
    for code in ["", "e", "zz", "abcd", "en-US"] {
        assert!(validate_language_code(code).is_err(), "{} should be rejected", code);
    }
}

#[test]
fn test_normalizeToPart2t_withBibliographicCode_shouldUseTerminologyForm() {
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("chi").unwrap(), "zho");
}

/// Test matching codes that name the same language
#[test]
fn test_languageCodesMatch_acrossForms_shouldMatch() {
    assert!(language_codes_match("de", "deu"));
    assert!(language_codes_match("ger", "DE"));
    assert!(!language_codes_match("de", "fr"));
    assert!(!language_codes_match("de", "invalid"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert!(get_language_name("xx").is_err());
}
