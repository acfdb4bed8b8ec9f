/*!
 * Crash recovery, cancellation and resume
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use transcore::progress::{ProgressPhase, ProgressState};
use transcore::providers::mock::MockProvider;
use transcore::session::{JsonFileStore, RecoveryManager, RecoverySession, SessionStore};
use transcore::translation::Fragment;

use crate::common;
use crate::common::mock_providers::SelectiveFailureProvider;

fn ids(fragments: &[Fragment]) -> BTreeSet<String> {
    fragments.iter().map(|f| f.id.clone()).collect()
}

/// A process that dies mid-run leaves its last autosave behind
#[tokio::test]
async fn test_crashedSession_shouldBeLoadableFromFreshManager() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    let request = common::en_fr_request(&[("a", "Hello"), ("b", "World"), ("c", "Again")]);

    let session_id = {
        let manager = RecoveryManager::with_directory(dir.path(), Duration::from_millis(50));
        let session_id = manager.create_session(&request).await;
        manager.add_completed(&session_id, Fragment::new("a", "Bonjour"));
        manager.add_failed(&session_id, "b");
        manager.update_progress(
            &session_id,
            ProgressState {
                current: 1,
                total: 3,
                phase: ProgressPhase::Translating,
                ..ProgressState::default()
            },
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        // Dropped without complete()
        session_id
    };

    let fresh = RecoveryManager::with_directory(dir.path(), Duration::from_secs(30));
    let session = fresh.load_state(&session_id).await.unwrap();

    assert_eq!(session.completed_fragment_ids, vec!["a"]);
    assert_eq!(session.failed_fragment_ids, vec!["b"]);
    assert_eq!(session.translated_fragments["a"].text, "Bonjour");
    assert_eq!(session.progress.phase, ProgressPhase::Translating);
    assert_eq!(session.progress.current, 1);

    let resumable = RecoveryManager::get_resumable_fragments(&session);
    assert_eq!(ids(&resumable), BTreeSet::from(["b".to_string(), "c".to_string()]));

    let summaries = fresh.list_sessions().await;
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].is_resumable());
}

/// Dropping a run mid-flight stops tracking it but keeps it on disk
#[tokio::test]
async fn test_cancelledRun_shouldLeaveResumableSession() {
    let dir = common::create_temp_dir().unwrap();
    let slow = common::file_orchestrator(
        Arc::new(MockProvider::slow(500)),
        common::test_config(),
        dir.path(),
    );

    let request = common::en_fr_request(&[("a", "Hello"), ("b", "World")]);
    let outcome = tokio::time::timeout(Duration::from_millis(100), slow.translate(request)).await;
    assert!(outcome.is_err());
    assert_eq!(slow.recovery().active_count(), 0);

    let sessions = slow.recovery().list_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].is_resumable());
    let stale_id = sessions[0].id.clone();

    let provider = MockProvider::working();
    let orchestrator =
        common::file_orchestrator(Arc::new(provider.clone()), common::test_config(), dir.path());
    let result = orchestrator.resume_translation(&stale_id).await.unwrap().unwrap();

    assert!(result.is_complete());
    assert_eq!(result.text_of("a"), Some("[fr] Hello"));
    assert_eq!(result.text_of("b"), Some("[fr] World"));
    assert_ne!(result.session_id, stale_id);
    assert!(orchestrator.recovery().load_state(&stale_id).await.is_none());
}

/// Resume only sends what is missing and merges it with earlier translations
#[tokio::test]
async fn test_resumeTranslation_afterBatchFailure_shouldCompleteAndDeleteOldSession() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config();
    config.batch.max_batch_size = 1;

    let first = common::file_orchestrator(
        Arc::new(SelectiveFailureProvider::new("Broken")),
        config.clone(),
        dir.path(),
    );
    let request = common::en_fr_request(&[("a", "Hello"), ("b", "Broken"), ("c", "World")]);
    let partial = first.translate(request).await.unwrap();
    assert!(!partial.is_complete());

    let provider = MockProvider::working().with_dictionary([("Broken", "Cassé")]);
    let second = common::file_orchestrator(Arc::new(provider.clone()), config, dir.path());
    let resumed = second
        .resume_translation(&partial.session_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(provider.sent_texts(), vec!["Broken"]);
    assert!(resumed.is_complete());
    assert_eq!(resumed.metadata.total_count, 3);
    assert_eq!(resumed.text_of("a"), Some("[fr] Hello"));
    assert_eq!(resumed.text_of("b"), Some("Cassé"));
    assert_eq!(resumed.text_of("c"), Some("[fr] World"));

    assert!(second.recovery().load_state(&partial.session_id).await.is_none());
    let merged = second.recovery().load_state(&resumed.session_id).await.unwrap();
    assert_eq!(merged.progress.phase, ProgressPhase::Completed);
    assert_eq!(merged.completed_fragment_ids.len(), 3);
    assert_eq!(merged.original_request.fragments.len(), 3);
}

#[tokio::test]
async fn test_resumeTranslation_whenStillFailing_shouldKeepOldSession() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config();
    config.batch.max_batch_size = 1;
    let orchestrator = common::file_orchestrator(
        Arc::new(SelectiveFailureProvider::new("Broken")),
        config,
        dir.path(),
    );

    let request = common::en_fr_request(&[("a", "Hello"), ("b", "Broken")]);
    let partial = orchestrator.translate(request).await.unwrap();
    let resumed = orchestrator
        .resume_translation(&partial.session_id)
        .await
        .unwrap()
        .unwrap();

    assert!(!resumed.is_complete());
    assert_eq!(resumed.text_of("a"), Some("[fr] Hello"));
    assert!(orchestrator.recovery().load_state(&partial.session_id).await.is_some());
    assert_eq!(orchestrator.recovery().list_sessions().await.len(), 2);
}

#[tokio::test]
async fn test_resumeTranslation_withUnknownSession_shouldReturnNone() {
    let orchestrator =
        common::in_memory_orchestrator(Arc::new(MockProvider::working()), common::test_config());

    let result = orchestrator.resume_translation("20240101000000000-missing").await.unwrap();
    assert!(result.is_none());
}

/// A finished session resumes to its stored result without provider calls
#[tokio::test]
async fn test_resumeTranslation_withNothingLeft_shouldReturnStoredResult() {
    let provider = MockProvider::working();
    let orchestrator =
        common::in_memory_orchestrator(Arc::new(provider.clone()), common::test_config());

    let done = orchestrator
        .translate(common::en_fr_request(&[("a", "Hello"), ("b", "World")]))
        .await
        .unwrap();
    let calls_before = provider.call_count();

    let resumed = orchestrator
        .resume_translation(&done.session_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(provider.call_count(), calls_before);
    assert_eq!(resumed.session_id, done.session_id);
    assert_eq!(resumed.translated_fragments, done.translated_fragments);
    assert!(resumed.is_complete());
}

/// Sessions of runs executing at the same time never mix
#[tokio::test]
async fn test_concurrentRuns_shouldKeepSessionsSeparate() {
    let dir = common::create_temp_dir().unwrap();
    let orchestrator = common::file_orchestrator(
        Arc::new(MockProvider::slow(50)),
        common::test_config(),
        dir.path(),
    );

    let (first, second) = tokio::join!(
        orchestrator.translate(common::en_fr_request(&[("a", "Hello"), ("b", "World")])),
        orchestrator.translate(common::en_fr_request(&[("x", "Goodbye")])),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.session_id, second.session_id);
    let first_session = orchestrator.recovery().load_state(&first.session_id).await.unwrap();
    let second_session = orchestrator.recovery().load_state(&second.session_id).await.unwrap();
    assert_eq!(
        first_session.translated_fragments.keys().collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    assert_eq!(
        second_session.translated_fragments.keys().collect::<Vec<_>>(),
        vec!["x"]
    );
    assert_eq!(orchestrator.recovery().active_count(), 0);
}

#[tokio::test]
async fn test_cleanup_shouldRemoveOnlyExpiredSessions() {
    let dir = common::create_temp_dir().unwrap();
    let store = JsonFileStore::new(dir.path());

    let mut expired = RecoverySession::new(
        "expired".to_string(),
        common::en_fr_request(&[("a", "Hello")]),
    );
    expired.timestamp = chrono::Utc::now() - chrono::Duration::days(30);
    store.save(&expired).await.unwrap();
    let fresh = RecoverySession::new("fresh".to_string(), common::en_fr_request(&[("a", "Hello")]));
    store.save(&fresh).await.unwrap();

    let manager = RecoveryManager::with_directory(dir.path(), Duration::from_secs(30));
    assert_eq!(manager.cleanup(7).await, 1);
    assert!(manager.load_state("expired").await.is_none());
    assert!(manager.load_state("fresh").await.is_some());
}

#[tokio::test]
async fn test_deleteSession_shouldForgetPersistedRun() {
    let orchestrator =
        common::in_memory_orchestrator(Arc::new(MockProvider::working()), common::test_config());
    let result = orchestrator
        .translate(common::en_fr_request(&[("a", "Hello")]))
        .await
        .unwrap();

    assert!(orchestrator.recovery().delete_session(&result.session_id).await);
    assert!(!orchestrator.recovery().delete_session(&result.session_id).await);
    assert!(orchestrator.recovery().load_state(&result.session_id).await.is_none());
}
