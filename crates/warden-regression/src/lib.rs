//! WARDEN Regression/Escalation Engine
//!
//! Folds discrete observation events into durable per-target history and
//! computes a bounded, explainable escalation score from failure streaks,
//! overall failure rate, and failure age. The record is a ledger, not a
//! current-status flag: recovery resets the streak but never erases the
//! history of past failure.
//!
//! Persistence is a single JSON document per data directory, replaced
//! whole on every fold (load-modify-save). A missing or corrupt store
//! degrades to empty; persistence trouble must never crash the caller.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod engine;
pub mod history;
pub mod observation;
pub mod score;
pub mod store;

pub use engine::{RegressionEngine, RegressionSummary, DEFAULT_ESCALATION_THRESHOLD};
pub use history::{LoggedEvent, RegressionHistory, TargetHistory, EVENT_LOG_CAP};
pub use observation::{ObservationEvent, ObservationStatus, StatusClass};
pub use score::escalation_score;
pub use store::{HistoryStore, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
