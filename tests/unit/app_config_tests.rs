/*!
 * Tests for pipeline configuration functionality
 */

use std::str::FromStr;
use std::time::Duration;

use transcore::app_config::{Config, LogLevel, QualityTier};
use transcore::session::{JsonFileStore, RecoveryManager, RecoverySession, SessionStore};

use crate::common;

/// Test configuration file round trip
#[test]
fn test_config_saveThenLoad_shouldPreserveValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.recovery.max_age_days = 30;
    config.batch.max_batch_size = 25;
    config.quality.tier = QualityTier::Professional;
    config.quality.retry_on_error_issues = true;
    config.recovery.directory = Some(dir.path().join("sessions"));
    config.pricing.currency = "EUR".to_string();
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.recovery.max_age_days, 30);
    assert_eq!(loaded.batch.max_batch_size, 25);
    assert_eq!(loaded.quality.tier, QualityTier::Professional);
    assert!(loaded.quality.retry_on_error_issues);
    assert_eq!(loaded.recovery.directory, Some(dir.path().join("sessions")));
    assert_eq!(loaded.pricing.currency, "EUR");
}

/// Test that invalid files are rejected on load
#[test]
fn test_config_fromFile_withZeroConcurrency_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"batch": {"concurrency": 0}}"#).unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_config_fromFile_withMalformedJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = Config::from_file(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_config_validate_withZeroAutosaveInterval_shouldFail() {
    let mut config = Config::default();
    config.recovery.autosave_interval_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_qualityTier_fromStr_shouldBeCaseInsensitive() {
    assert_eq!(QualityTier::from_str("FAST").unwrap(), QualityTier::Fast);
    assert_eq!(QualityTier::from_str("Professional").unwrap(), QualityTier::Professional);
    assert!(QualityTier::from_str("premium").is_err());

    assert!(QualityTier::Professional.runs_quality_checks());
    assert!(!QualityTier::Balanced.runs_quality_checks());
    assert_eq!(QualityTier::Fast.to_string(), "fast");
}

#[test]
fn test_logLevel_intoLevelFilter_shouldMapEveryLevel() {
    assert_eq!(log::LevelFilter::from(LogLevel::Error), log::LevelFilter::Error);
    assert_eq!(log::LevelFilter::from(LogLevel::Trace), log::LevelFilter::Trace);
    assert_eq!(log::LevelFilter::from(LogLevel::default()), log::LevelFilter::Info);
}

/// Recovery disabled in the configuration keeps sessions in memory
#[tokio::test]
async fn test_recoveryManager_fromConfig_withRecoveryDisabled_shouldNotTouchDisk() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.recovery.enabled = false;
    config.recovery.directory = Some(dir.path().join("sessions"));

    let manager = RecoveryManager::from_config(&config.recovery).unwrap();
    let request = common::en_fr_request(&[("a", "Hello")]);
    let id = manager.create_session(&request).await;

    assert!(manager.load_state(&id).await.is_some());
    assert!(!dir.path().join("sessions").exists());
}

/// The configured age limit drives expiry of persisted sessions
#[tokio::test]
async fn test_recoveryManager_fromConfig_cleanupExpired_shouldApplyMaxAge() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.recovery.directory = Some(dir.path().to_path_buf());
    config.recovery.max_age_days = 2;

    let store = JsonFileStore::new(dir.path());
    let mut old = RecoverySession::new("old".to_string(), common::en_fr_request(&[("a", "Hello")]));
    old.timestamp = chrono::Utc::now() - chrono::Duration::days(3);
    store.save(&old).await.unwrap();

    let manager = RecoveryManager::from_config(&config.recovery).unwrap();
    let fresh_id = manager.create_session(&common::en_fr_request(&[("a", "Hello")])).await;

    assert_eq!(manager.cleanup_expired().await, 1);
    let remaining: Vec<String> = manager.list_sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(remaining, vec![fresh_id]);
}

#[test]
fn test_recoveryConfig_autosaveInterval_shouldUseSeconds() {
    let mut config = Config::default();
    config.recovery.autosave_interval_secs = 5;
    assert_eq!(config.recovery.autosave_interval(), Duration::from_secs(5));
}
