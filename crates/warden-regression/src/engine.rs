//! The fold engine and its query surface

use crate::history::TargetHistory;
use crate::observation::ObservationEvent;
use crate::store::{HistoryStore, StoreError};
use chrono::Utc;
use tokio::sync::Mutex;

/// Score at or above which the summary counts a target as escalated
pub const DEFAULT_ESCALATION_THRESHOLD: u8 = 8;

/// Aggregate view over all tracked targets
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionSummary {
    /// Targets with any history
    pub total_tracked: usize,
    /// Targets in an active failure streak
    pub currently_failing: usize,
    /// Targets at or above [`DEFAULT_ESCALATION_THRESHOLD`]
    pub escalated: usize,
    /// The currently-failing target with the earliest unresolved first
    /// failure
    pub longest_unresolved: Option<TargetHistory>,
    /// Up to 5 most recently failed targets, most recent first
    pub recent_failures: Vec<TargetHistory>,
}

/// Per-target state machine over the persisted history store
///
/// Folds are serialized by an internal lock (single-writer within the
/// process; cross-process writers are out of scope).
#[derive(Debug)]
pub struct RegressionEngine {
    store: HistoryStore,
    fold_lock: Mutex<()>,
}

impl RegressionEngine {
    /// Engine over a history store
    #[must_use]
    pub fn new(store: HistoryStore) -> Self {
        Self {
            store,
            fold_lock: Mutex::new(()),
        }
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Fold one observation into persisted history.
    ///
    /// Load-modify-save: the whole document is re-read under the fold lock,
    /// the target record updated and rescored, and the document replaced
    /// atomically. Returns the post-fold record.
    ///
    /// # Errors
    /// Only save failures surface; a missing or corrupt store loads as
    /// empty (logged by the store), so persistence trouble never crashes
    /// the caller mid-ingest.
    pub async fn fold(&self, event: &ObservationEvent) -> Result<TargetHistory, StoreError> {
        let _guard = self.fold_lock.lock().await;
        let now = Utc::now();

        let mut history = self.store.load().await;
        let record = history.entry_mut(&event.target_id, &event.kind, event.observed_at);
        record.apply(event, now);
        let snapshot = record.clone();

        self.store.save(&mut history).await?;

        tracing::debug!(
            target = %snapshot.id,
            status = %snapshot.last_status,
            score = snapshot.escalation_score,
            streak = snapshot.consecutive_failures,
            "observation folded"
        );
        Ok(snapshot)
    }

    /// Targets warranting attention: score at or above `min_score` and a
    /// most recent status that is not success-class. Sorted by score
    /// descending.
    pub async fn escalated_issues(&self, min_score: u8) -> Vec<TargetHistory> {
        let history = self.store.load().await;
        let mut issues: Vec<TargetHistory> = history
            .entries
            .into_iter()
            .filter(|e| e.escalation_score >= min_score && !e.last_status.is_success())
            .collect();
        issues.sort_by(|a, b| b.escalation_score.cmp(&a.escalation_score));
        issues
    }

    /// Aggregate view for the operator surface
    pub async fn summary(&self) -> RegressionSummary {
        let history = self.store.load().await;

        let total_tracked = history.entries.len();
        let currently_failing = history.entries.iter().filter(|e| e.is_failing()).count();
        let escalated = history
            .entries
            .iter()
            .filter(|e| {
                e.escalation_score >= DEFAULT_ESCALATION_THRESHOLD && !e.last_status.is_success()
            })
            .count();

        let longest_unresolved = history
            .entries
            .iter()
            .filter(|e| e.is_failing() && e.first_failed.is_some())
            .min_by_key(|e| e.first_failed)
            .cloned();

        let mut failed: Vec<TargetHistory> = history
            .entries
            .into_iter()
            .filter(|e| e.last_failed.is_some())
            .collect();
        failed.sort_by(|a, b| b.last_failed.cmp(&a.last_failed));
        failed.truncate(5);

        RegressionSummary {
            total_tracked,
            currently_failing,
            escalated,
            longest_unresolved,
            recent_failures: failed,
        }
    }
}
