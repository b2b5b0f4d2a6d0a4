//! End-to-end escalation scenarios over a real store

use chrono::{Duration, Utc};
use warden_regression::{
    HistoryStore, ObservationEvent, ObservationStatus, RegressionEngine, EVENT_LOG_CAP,
};

fn failure_at(target: &str, minutes_ago: i64) -> ObservationEvent {
    ObservationEvent::failure(target, "integration", "healthcheck failed")
        .at(Utc::now() - Duration::minutes(minutes_ago))
}

#[tokio::test]
async fn three_fresh_consecutive_failures_score() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RegressionEngine::new(HistoryStore::new(dir.path()));

    // t0, t0+10m, t0+20m, all inside the first hour
    engine.fold(&failure_at("svc-a", 20)).await.unwrap();
    engine.fold(&failure_at("svc-a", 10)).await.unwrap();
    let record = engine.fold(&failure_at("svc-a", 0)).await.unwrap();

    assert_eq!(record.total_checks, 3);
    assert_eq!(record.total_failures, 3);
    assert_eq!(record.consecutive_failures, 3);
    // streak min(3*2, 10) = 6, rate round(3/3 * 5) = 5, age 0 (under 1h)
    assert_eq!(record.escalation_score, 11);
}

#[tokio::test]
async fn stale_unresolved_failure_earns_age_bonus() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RegressionEngine::new(HistoryStore::new(dir.path()));

    // First failure 25 hours ago, still failing now
    engine
        .fold(&failure_at("svc-old", 25 * 60))
        .await
        .unwrap();
    let record = engine.fold(&failure_at("svc-old", 0)).await.unwrap();

    // streak 4 + rate 5 + age 3
    assert_eq!(record.escalation_score, 12);
}

#[tokio::test]
async fn recovery_resets_streak_and_drops_score() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RegressionEngine::new(HistoryStore::new(dir.path()));

    for _ in 0..4 {
        engine.fold(&failure_at("svc-a", 0)).await.unwrap();
    }
    let failing = engine.escalated_issues(5).await;
    assert_eq!(failing.len(), 1);

    let record = engine
        .fold(&ObservationEvent::success("svc-a", "integration"))
        .await
        .unwrap();

    assert_eq!(record.consecutive_failures, 0);
    assert!(record.first_failed.is_some());
    // Only the rate term remains: round(4/5 * 5) = 4
    assert_eq!(record.escalation_score, 4);

    // Recovered targets never appear on the alerting surface
    assert!(engine.escalated_issues(1).await.is_empty());
}

#[tokio::test]
async fn history_is_a_ledger_across_recover_and_refail() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RegressionEngine::new(HistoryStore::new(dir.path()));

    engine.fold(&failure_at("svc-a", 120)).await.unwrap();
    let first_failed = engine
        .fold(&ObservationEvent::success("svc-a", "integration"))
        .await
        .unwrap()
        .first_failed;

    let refailed = engine.fold(&failure_at("svc-a", 0)).await.unwrap();
    // first_failed survives the recovery in between
    assert_eq!(refailed.first_failed, first_failed);
    assert_eq!(refailed.consecutive_failures, 1);
    assert_eq!(refailed.total_failures, 2);
    assert_eq!(refailed.total_checks, 3);
}

#[tokio::test]
async fn mixed_statuses_keep_event_log_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RegressionEngine::new(HistoryStore::new(dir.path()));

    let statuses = [
        ObservationStatus::Failed,
        ObservationStatus::Passed,
        ObservationStatus::Skipped,
        ObservationStatus::Unhealthy,
    ];
    let mut last = None;
    for i in 0..120 {
        let status = statuses[i % statuses.len()].clone();
        let event =
            ObservationEvent::new(Some("svc-a"), "integration", status, format!("obs {i}"));
        last = Some(engine.fold(&event).await.unwrap());
    }

    let record = last.unwrap();
    assert_eq!(record.events.len(), EVENT_LOG_CAP);
    assert_eq!(record.total_checks, 120);
    assert!(record.total_failures <= record.total_checks);
    assert!(record.escalation_score <= 15);
}
