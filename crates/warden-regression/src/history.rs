//! Per-target history records and the aggregate store document

use crate::observation::{ObservationEvent, ObservationStatus, StatusClass};
use crate::score::escalation_score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum entries in a target's bounded event log (FIFO, oldest evicted)
pub const EVENT_LOG_CAP: usize = 50;

/// One entry of a target's bounded event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    /// Observed status
    pub status: ObservationStatus,
    /// Producer message
    pub message: String,
    /// Observation time
    pub timestamp: DateTime<Utc>,
}

/// Durable per-target failure ledger
///
/// Invariants maintained by [`TargetHistory::apply`]:
/// - `total_failures <= total_checks`
/// - `escalation_score` in `[0, 15]`
/// - `events.len() <= EVENT_LOG_CAP`
/// - `consecutive_failures` resets to 0 on any success and increments by
///   exactly 1 per failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHistory {
    /// Target identity
    pub id: String,
    /// Target kind
    #[serde(rename = "type")]
    pub kind: String,
    /// First observation of this target
    pub first_seen: DateTime<Utc>,
    /// Most recent observation of any class
    pub last_checked: DateTime<Utc>,
    /// First failure ever recorded; never cleared on recovery
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_failed: Option<DateTime<Utc>>,
    /// Most recent failure; never cleared on recovery
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_failed: Option<DateTime<Utc>>,
    /// Most recent success
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_passed: Option<DateTime<Utc>>,
    /// All observations counted
    pub total_checks: u32,
    /// Failure-class observations counted
    pub total_failures: u32,
    /// Current uninterrupted failure streak
    pub consecutive_failures: u32,
    /// Status of the most recent observation
    pub last_status: ObservationStatus,
    /// Bounded score, recomputed on every event
    pub escalation_score: u8,
    /// Last [`EVENT_LOG_CAP`] observations, oldest first
    #[serde(default)]
    pub events: Vec<LoggedEvent>,
}

impl TargetHistory {
    /// Fresh record for a target first seen at `first_seen`
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            first_seen,
            last_checked: first_seen,
            first_failed: None,
            last_failed: None,
            last_passed: None,
            total_checks: 0,
            total_failures: 0,
            consecutive_failures: 0,
            last_status: ObservationStatus::Skipped,
            escalation_score: 0,
            events: Vec::new(),
        }
    }

    /// Fold one observation into the record and recompute the score.
    ///
    /// `now` is the fold time used for the score's age term; the event's
    /// own `observed_at` drives the timestamp fields.
    pub fn apply(&mut self, event: &ObservationEvent, now: DateTime<Utc>) {
        let at = event.observed_at;
        self.total_checks = self.total_checks.saturating_add(1);
        self.last_checked = at;
        self.last_status = event.status.clone();

        match event.status.class() {
            StatusClass::Failure => {
                self.total_failures = self.total_failures.saturating_add(1);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.first_failed.is_none() {
                    self.first_failed = Some(at);
                }
                self.last_failed = Some(at);
            }
            StatusClass::Success => {
                self.consecutive_failures = 0;
                self.last_passed = Some(at);
                // first_failed / last_failed persist: the record is a
                // ledger, not a current-status flag.
            }
            StatusClass::Neutral => {}
        }

        self.events.push(LoggedEvent {
            status: event.status.clone(),
            message: event.message.clone(),
            timestamp: at,
        });
        while self.events.len() > EVENT_LOG_CAP {
            self.events.remove(0);
        }

        self.escalation_score = escalation_score(self, now);
    }

    /// Whether the target is in an active failure streak
    #[inline]
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// The aggregate persisted document: one entry per target, unique by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegressionHistory {
    /// Tracked targets
    #[serde(default)]
    pub entries: Vec<TargetHistory>,
    /// When the document was last saved
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl RegressionHistory {
    /// Empty store document
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a target by id
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&TargetHistory> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Get or create the record for a target
    pub fn entry_mut(
        &mut self,
        id: &str,
        kind: &str,
        first_seen: DateTime<Utc>,
    ) -> &mut TargetHistory {
        if let Some(idx) = self.entries.iter().position(|e| e.id == id) {
            return &mut self.entries[idx];
        }
        self.entries.push(TargetHistory::new(id, kind, first_seen));
        self.entries.last_mut().expect("entry just pushed")
    }
}
