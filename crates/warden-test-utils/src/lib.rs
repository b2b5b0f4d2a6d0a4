//! Testing utilities for the WARDEN workspace
//!
//! Shared fixtures: canned collaborators, temp data dirs, artifact
//! writers, and observation builders.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use warden_budget::{BudgetLimits, LedgerError, SpendLedger};
use warden_core::{IdentitySnapshot, IdentitySource};
use warden_regression::ObservationEvent;
use warden_watcher::{BlockedSpecNotifier, BlockedSpecReport};

/// Fresh temp directory for persisted state; dropped with the guard
pub fn temp_data_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// Install a test subscriber honoring `RUST_LOG`; repeated calls are no-ops
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ledger that always reports the same running total
#[derive(Debug, Clone, Copy)]
pub struct FixedLedger(pub f64);

#[async_trait::async_trait]
impl SpendLedger for FixedLedger {
    async fn total_spend(&self) -> Result<f64, LedgerError> {
        Ok(self.0)
    }
}

/// Ledger that always fails to read
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenLedger;

#[async_trait::async_trait]
impl SpendLedger for BrokenLedger {
    async fn total_spend(&self) -> Result<f64, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".into()))
    }
}

/// Identity source backed by fixed lists
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    pub snapshot: IdentitySnapshot,
}

impl StaticIdentity {
    pub fn new(
        safe_paths: &[&str],
        never_modify_paths: &[&str],
        budget_limits: Option<BudgetLimits>,
    ) -> Self {
        Self {
            snapshot: IdentitySnapshot {
                safe_paths: safe_paths.iter().map(ToString::to_string).collect(),
                never_modify_paths: never_modify_paths
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                budget_limits,
            },
        }
    }
}

#[async_trait::async_trait]
impl IdentitySource for StaticIdentity {
    async fn safe_paths(&self) -> Vec<String> {
        self.snapshot.safe_paths.clone()
    }

    async fn never_modify_paths(&self) -> Vec<String> {
        self.snapshot.never_modify_paths.clone()
    }

    async fn budget_limits(&self) -> Option<BudgetLimits> {
        self.snapshot.budget_limits
    }
}

/// Notifier that records every alert it receives
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(target_id, body)` pairs in arrival order
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().clone()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().len()
    }
}

#[async_trait::async_trait]
impl BlockedSpecNotifier for RecordingNotifier {
    async fn on_spec_blocked(&self, report: BlockedSpecReport, body: &str) {
        self.alerts
            .lock()
            .push((report.target_id().to_string(), body.to_string()));
    }
}

/// Write a status artifact into a drop directory, returning its path
pub fn write_artifact(dir: &Path, file_name: &str, json: serde_json::Value) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
    path
}

/// Blocked-spec artifact body with the usual fields populated
pub fn blocked_artifact(target_id: &str, reason: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": target_id,
        "status": "blocked",
        "reason": reason,
    })
}

pub fn failure_event(target_id: &str) -> ObservationEvent {
    ObservationEvent::failure(target_id, "check", "assertion failed")
}

pub fn success_event(target_id: &str) -> ObservationEvent {
    ObservationEvent::success(target_id, "check")
}
