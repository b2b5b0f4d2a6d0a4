//! Escalation score
//!
//! Deterministic, pure function of a post-update target record. Three
//! terms:
//!
//! - streak: `min(consecutive_failures * 2, 10)`; short bursts escalate
//!   quickly
//! - rate: `round(total_failures / total_checks * 5)`; chronic low-rate
//!   flakiness still accumulates
//! - age: 3/2/1 points for an unresolved first failure older than
//!   24h/6h/1h
//!
//! The sum is clamped to `[0, 15]` so the signal stays bounded and
//! comparable across targets.

use crate::history::TargetHistory;
use chrono::{DateTime, Duration, Utc};

/// Upper bound of the escalation score
pub(crate) const SCORE_MAX: i64 = 15;

/// Compute the bounded escalation score for a record as of `now`
#[must_use]
pub fn escalation_score(record: &TargetHistory, now: DateTime<Utc>) -> u8 {
    let streak = i64::from(record.consecutive_failures).saturating_mul(2).min(10);

    let rate = if record.total_checks == 0 {
        0
    } else {
        let ratio = f64::from(record.total_failures) / f64::from(record.total_checks);
        (ratio * 5.0).round() as i64
    };

    let age = record.first_failed.map_or(0, |first| {
        let elapsed = now.signed_duration_since(first);
        if elapsed > Duration::hours(24) {
            3
        } else if elapsed > Duration::hours(6) {
            2
        } else if elapsed > Duration::hours(1) {
            1
        } else {
            0
        }
    });

    (streak + rate + age).clamp(0, SCORE_MAX) as u8
}
