//! Idempotence guarantees of the ingestion watcher

use chrono::Utc;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use warden_regression::{HistoryStore, RegressionEngine};
use warden_watcher::{
    BlockedSpecNotifier, BlockedSpecReport, IngestionWatcher, NullNotifier, WatcherConfig,
};

/// Notifier that records every call for assertions
#[derive(Debug, Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<BlockedSpecReport>>,
}

#[async_trait::async_trait]
impl BlockedSpecNotifier for RecordingNotifier {
    async fn on_spec_blocked(&self, report: BlockedSpecReport, _body: &str) {
        self.calls.lock().push(report);
    }
}

fn engine_for(data_dir: &Path) -> Arc<RegressionEngine> {
    Arc::new(RegressionEngine::new(HistoryStore::new(data_dir)))
}

#[tokio::test]
async fn replaying_the_same_artifact_folds_exactly_once() {
    let tmp = tempfile::tempdir().unwrap();
    let drop = tmp.path().join("drop");
    tokio::fs::create_dir_all(&drop).await.unwrap();

    let engine = engine_for(tmp.path());
    let watcher = IngestionWatcher::new(
        WatcherConfig::new(vec![drop.clone()]),
        Arc::clone(&engine),
        Arc::new(NullNotifier),
    );
    watcher.seed().await;

    tokio::fs::write(
        drop.join("svc-a.json"),
        r#"{"spec":"svc-a","reason":"tests failing"}"#,
    )
    .await
    .unwrap();

    watcher.tick().await;
    watcher.tick().await;
    watcher.tick().await;

    let record = engine.escalated_issues(0).await;
    assert_eq!(record.len(), 1);
    assert_eq!(record[0].total_checks, 1);
    assert_eq!(record[0].total_failures, 1);
}

#[tokio::test]
async fn preexisting_artifacts_are_seeded_not_replayed() {
    let tmp = tempfile::tempdir().unwrap();
    let drop = tmp.path().join("drop");
    tokio::fs::create_dir_all(&drop).await.unwrap();
    tokio::fs::write(drop.join("ancient.json"), r#"{"spec":"ancient"}"#)
        .await
        .unwrap();

    let engine = engine_for(tmp.path());
    let watcher = IngestionWatcher::new(
        WatcherConfig::new(vec![drop.clone()]),
        Arc::clone(&engine),
        Arc::new(NullNotifier),
    );

    // Simulates a process restart over a populated drop directory
    watcher.seed().await;
    watcher.tick().await;

    assert!(engine.escalated_issues(0).await.is_empty());
    assert_eq!(watcher.stats().await.processed_artifacts, 1);
}

#[tokio::test]
async fn start_twice_is_single_timer_and_stop_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_for(tmp.path());
    let watcher = IngestionWatcher::new(
        WatcherConfig::new(vec![tmp.path().join("drop")])
            .with_poll_interval(Duration::from_secs(3600)),
        engine,
        Arc::new(NullNotifier),
    );

    assert!(watcher.start().await);
    assert!(!watcher.start().await);
    assert!(watcher.is_running().await);

    assert!(watcher.stop().await);
    assert!(!watcher.stop().await);
    assert!(!watcher.is_running().await);
}

#[tokio::test]
async fn stop_start_preserves_processed_state() {
    let tmp = tempfile::tempdir().unwrap();
    let drop = tmp.path().join("drop");
    tokio::fs::create_dir_all(&drop).await.unwrap();
    tokio::fs::write(drop.join("seen.json"), r#"{"spec":"seen"}"#)
        .await
        .unwrap();

    let engine = engine_for(tmp.path());
    let watcher = IngestionWatcher::new(
        WatcherConfig::new(vec![drop.clone()]).with_poll_interval(Duration::from_secs(3600)),
        Arc::clone(&engine),
        Arc::new(NullNotifier),
    );

    watcher.start().await; // seeds: seen.json is known state
    watcher.stop().await;
    watcher.start().await; // restart continues, does not re-seed

    watcher.tick().await;
    assert!(engine.escalated_issues(0).await.is_empty());
    watcher.stop().await;
}

/// Notifier that signals entry and then blocks until released, pinning a
/// tick in flight at the exact point where the fold has already persisted
struct GatedNotifier {
    entered: Notify,
    release: Semaphore,
}

#[async_trait::async_trait]
impl BlockedSpecNotifier for GatedNotifier {
    async fn on_spec_blocked(&self, _report: BlockedSpecReport, _body: &str) {
        self.entered.notify_one();
        self.release.acquire().await.unwrap().forget();
    }
}

#[tokio::test]
async fn stop_during_in_flight_tick_never_refolds() {
    let tmp = tempfile::tempdir().unwrap();
    let drop = tmp.path().join("drop");
    tokio::fs::create_dir_all(&drop).await.unwrap();

    let engine = engine_for(tmp.path());
    let notifier = Arc::new(GatedNotifier {
        entered: Notify::new(),
        release: Semaphore::new(0),
    });
    let watcher = Arc::new(IngestionWatcher::new(
        WatcherConfig::new(vec![drop.clone()]).with_poll_interval(Duration::from_millis(10)),
        Arc::clone(&engine),
        Arc::clone(&notifier) as Arc<dyn BlockedSpecNotifier>,
    ));

    watcher.seed().await;
    tokio::fs::write(drop.join("a.json"), r#"{"spec":"svc-a"}"#)
        .await
        .unwrap();
    watcher.start().await;

    // Fold persisted, notifier still awaiting: the artifact is not yet in
    // the processed set.
    notifier.entered.notified().await;

    let stopper = tokio::spawn({
        let watcher = Arc::clone(&watcher);
        async move { watcher.stop().await }
    });
    notifier.release.add_permits(1);
    assert!(stopper.await.unwrap());
    assert!(!watcher.is_running().await);

    // A restart (or any further pass) must not see the artifact again
    notifier.release.add_permits(1);
    watcher.tick().await;

    let record = engine.escalated_issues(0).await;
    assert_eq!(record.len(), 1);
    assert_eq!(record[0].total_checks, 1);
    assert_eq!(watcher.stats().await.folded_artifacts, 1);
}

#[tokio::test]
async fn notifier_invoked_once_per_new_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let drop = tmp.path().join("drop");
    tokio::fs::create_dir_all(&drop).await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = IngestionWatcher::new(
        WatcherConfig::new(vec![drop.clone()]),
        engine_for(tmp.path()),
        Arc::clone(&notifier) as Arc<dyn BlockedSpecNotifier>,
    );
    watcher.seed().await;

    tokio::fs::write(
        drop.join("auth.json"),
        r#"{"spec":"auth-flow.md","status":"blocked","iterations":5}"#,
    )
    .await
    .unwrap();

    watcher.tick().await;
    watcher.tick().await;

    let calls = notifier.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target_id(), "auth-flow.md");
    assert_eq!(calls[0].iterations, Some(5));
}

#[tokio::test]
async fn daily_log_alerts_deduplicate_by_date_and_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let logs = tmp.path().join("logs");
    tokio::fs::create_dir_all(&logs).await.unwrap();

    let date = Utc::now().format("%Y-%m-%d");
    tokio::fs::write(
        logs.join(format!("progress-{date}.md")),
        "step 1 done\nBLOCKED: auth-flow.json after 5 attempts\n",
    )
    .await
    .unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let watcher = IngestionWatcher::new(
        WatcherConfig::new(vec![tmp.path().join("drop")]).with_log_dir(&logs),
        engine_for(tmp.path()),
        Arc::clone(&notifier) as Arc<dyn BlockedSpecNotifier>,
    );
    watcher.seed().await;

    watcher.tick().await;
    watcher.tick().await;

    let calls = notifier.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].spec.as_deref(), Some("auth-flow.json"));
    assert_eq!(calls[0].status.as_deref(), Some("blocked"));
}
