//! Configuration/identity collaborator and its process-scoped cache

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use warden_budget::BudgetLimits;

/// Read-only configuration collaborator
///
/// Backed outside this workspace (markdown identity files); this core only
/// reads. Refresh cadence is handled here by [`CachedIdentity`].
#[async_trait::async_trait]
pub trait IdentitySource: Send + Sync {
    /// Paths the agent may modify (allow list entries)
    async fn safe_paths(&self) -> Vec<String>;
    /// Paths that must never be modified (deny list entries)
    async fn never_modify_paths(&self) -> Vec<String>;
    /// Configured spend ceiling, if any
    async fn budget_limits(&self) -> Option<BudgetLimits>;
}

/// One coherent read of the identity source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentitySnapshot {
    /// Allow-list entries
    pub safe_paths: Vec<String>,
    /// Deny-list entries
    pub never_modify_paths: Vec<String>,
    /// Spend ceiling, if configured
    pub budget_limits: Option<BudgetLimits>,
}

struct CacheCell {
    taken_at: Instant,
    generation: u64,
    snapshot: IdentitySnapshot,
}

/// Explicit TTL cache over an [`IdentitySource`]
///
/// Lifecycle: constructed with a TTL, refreshed lazily on expiry, cleared
/// by [`reset`](Self::reset). Injected into components rather than held as
/// an ambient singleton, so tests construct isolated instances.
pub struct CachedIdentity {
    source: Arc<dyn IdentitySource>,
    ttl: Duration,
    cell: Mutex<Option<CacheCell>>,
}

impl CachedIdentity {
    /// Cache over `source`, refreshing after `ttl`
    #[must_use]
    pub fn new(source: Arc<dyn IdentitySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cell: Mutex::new(None),
        }
    }

    /// Current snapshot, refreshed from the source when the cached one has
    /// expired
    pub async fn snapshot(&self) -> IdentitySnapshot {
        let mut cell = self.cell.lock().await;
        if let Some(cached) = cell.as_ref() {
            if cached.taken_at.elapsed() < self.ttl {
                return cached.snapshot.clone();
            }
        }

        let snapshot = IdentitySnapshot {
            safe_paths: self.source.safe_paths().await,
            never_modify_paths: self.source.never_modify_paths().await,
            budget_limits: self.source.budget_limits().await,
        };
        let generation = cell.as_ref().map_or(1, |c| c.generation + 1);
        tracing::debug!(generation, "identity snapshot refreshed");
        *cell = Some(CacheCell {
            taken_at: Instant::now(),
            generation,
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    /// Generation counter of the cached snapshot (0 before the first read).
    /// Lets callers notice a refresh and rebuild derived state (the path
    /// policy) only when it actually changed.
    pub async fn generation(&self) -> u64 {
        self.cell.lock().await.as_ref().map_or(0, |c| c.generation)
    }

    /// Drop the cached snapshot; the next read refreshes
    pub async fn reset(&self) {
        *self.cell.lock().await = None;
    }
}

impl std::fmt::Debug for CachedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedIdentity")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
