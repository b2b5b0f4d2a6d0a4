//! Blocked-spec notifier collaborator

use crate::artifact::BlockedSpecReport;

/// Outbound seam for surfacing newly blocked specs
///
/// Invoked once per newly discovered blocked/failed artifact (and once per
/// new daily-log block alert). Implementations live outside this core
/// (changelog stamping, human alerts).
#[async_trait::async_trait]
pub trait BlockedSpecNotifier: Send + Sync {
    /// A blocked spec was discovered; `body` is the raw artifact text
    async fn on_spec_blocked(&self, report: BlockedSpecReport, body: &str);
}

/// No-op notifier for callers that only want history folding
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait::async_trait]
impl BlockedSpecNotifier for NullNotifier {
    async fn on_spec_blocked(&self, report: BlockedSpecReport, _body: &str) {
        tracing::debug!(target = report.target_id(), "blocked spec (no notifier)");
    }
}
