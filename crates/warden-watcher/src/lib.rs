//! WARDEN Ingestion Watcher
//!
//! A single periodic task that discovers observation artifacts dropped by
//! external producers, classifies each exactly once, and feeds them to the
//! regression engine and the blocked-spec notifier.
//!
//! Idempotence is the design center:
//! - the processed set is seeded from directory contents at first start, so
//!   pre-existing artifacts are known state, never replayed;
//! - artifacts older than the last-check cursor are marked processed
//!   without being folded, closing the listing-order race;
//! - one malformed artifact never aborts a tick or affects its siblings.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod artifact;
pub mod log_scan;
pub mod notifier;
pub mod watcher;

pub use artifact::BlockedSpecReport;
pub use notifier::{BlockedSpecNotifier, NullNotifier};
pub use watcher::{IngestionWatcher, WatcherConfig, WatcherStats, DEFAULT_POLL_INTERVAL};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
