//! The WARDEN facade
//!
//! Owns one of each component and exposes the surface the build
//! orchestration layer calls: guarded reads/writes, the budget gate,
//! observation folding, queries, and the watcher lifecycle. The path
//! policy is derived from the identity snapshot and rebuilt only when the
//! snapshot generation changes.

use crate::identity::{CachedIdentity, IdentitySource};
use crate::steps::StepTracker;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use warden_budget::{BudgetCheck, BudgetError, BudgetGovernor, SpendLedger};
use warden_guard::{GuardError, MutationPipeline, SourceRead, WriteOutcome};
use warden_policy::{PathPolicy, PatternError};
use warden_regression::{
    HistoryStore, ObservationEvent, RegressionEngine, RegressionSummary, StoreError, TargetHistory,
};
use warden_watcher::{BlockedSpecNotifier, IngestionWatcher, WatcherConfig};

/// Facade configuration
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Project root all target paths resolve against
    pub project_root: PathBuf,
    /// Directory for persisted state (history document, backup store)
    pub data_dir: PathBuf,
    /// Drop directories the watcher polls
    pub drop_dirs: Vec<PathBuf>,
    /// Daily-log directory for the block scan, if any
    pub log_dir: Option<PathBuf>,
    /// Watcher tick interval
    pub poll_interval: Duration,
    /// Identity snapshot TTL
    pub identity_ttl: Duration,
}

impl WardenConfig {
    /// Defaults rooted at a project directory: state under
    /// `<root>/.warden`, 10s watcher interval, 60s identity TTL
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let data_dir = project_root.join(".warden");
        Self {
            project_root,
            data_dir,
            drop_dirs: Vec::new(),
            log_dir: None,
            poll_interval: warden_watcher::DEFAULT_POLL_INTERVAL,
            identity_ttl: Duration::from_secs(60),
        }
    }

    /// Override the state directory
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Add a drop directory
    #[must_use]
    pub fn with_drop_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.drop_dirs.push(dir.into());
        self
    }

    /// Scan daily logs under `log_dir`
    #[must_use]
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }
}

/// Combined error for facade operations
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// Identity supplied an unusable policy entry
    #[error("policy error: {0}")]
    Policy(#[from] PatternError),

    /// Mutation pipeline failure
    #[error("guard error: {0}")]
    Guard(#[from] GuardError),

    /// Budget gate failure (including the ceiling)
    #[error("budget error: {0}")]
    Budget(#[from] BudgetError),

    /// History persistence failure
    #[error("history error: {0}")]
    Store(#[from] StoreError),
}

/// The assembled safety substrate
pub struct Warden {
    identity: CachedIdentity,
    governor: BudgetGovernor,
    engine: Arc<RegressionEngine>,
    watcher: IngestionWatcher,
    tracker: StepTracker,
    /// Pipeline plus the identity generation its policy was built from
    pipeline: Mutex<(u64, MutationPipeline)>,
}

impl Warden {
    /// Assemble the substrate from its collaborators.
    ///
    /// Takes an initial identity snapshot to build the path policy.
    ///
    /// # Errors
    /// [`WardenError::Policy`] if the identity's path lists do not parse.
    pub async fn new(
        config: WardenConfig,
        identity_source: Arc<dyn IdentitySource>,
        ledger: Arc<dyn SpendLedger>,
        notifier: Arc<dyn BlockedSpecNotifier>,
    ) -> Result<Self, WardenError> {
        let identity = CachedIdentity::new(identity_source, config.identity_ttl);
        let snapshot = identity.snapshot().await;
        let generation = identity.generation().await;

        let policy = PathPolicy::from_lists(&snapshot.safe_paths, &snapshot.never_modify_paths)?;
        let pipeline = MutationPipeline::new(&config.project_root, policy)
            .with_backup_dir(config.data_dir.join("backups"));

        let engine = Arc::new(RegressionEngine::new(HistoryStore::new(&config.data_dir)));
        let watcher_config = {
            let mut wc = WatcherConfig::new(config.drop_dirs.clone())
                .with_poll_interval(config.poll_interval);
            if let Some(log_dir) = &config.log_dir {
                wc = wc.with_log_dir(log_dir);
            }
            wc
        };
        let watcher = IngestionWatcher::new(watcher_config, Arc::clone(&engine), notifier);
        let tracker = StepTracker::new(Arc::clone(&engine));

        tracing::info!(
            root = %config.project_root.display(),
            data_dir = %config.data_dir.display(),
            "warden assembled"
        );
        Ok(Self {
            identity,
            governor: BudgetGovernor::new(ledger),
            engine,
            watcher,
            tracker,
            pipeline: Mutex::new((generation, pipeline)),
        })
    }

    /// Guarded read (see [`MutationPipeline::read_source`])
    ///
    /// # Errors
    /// Genuine I/O failures only; a missing file is a value.
    pub async fn read_source(&self, path: impl AsRef<Path>) -> Result<SourceRead, WardenError> {
        let pipeline = self.current_pipeline().await?;
        Ok(pipeline.read_source(path).await?)
    }

    /// Guarded write (see [`MutationPipeline::write_guarded`])
    ///
    /// # Errors
    /// Backup or destination I/O failures; a policy rejection is an
    /// outcome, not an error.
    pub async fn write_guarded(
        &self,
        path: impl AsRef<Path>,
        content: &str,
    ) -> Result<WriteOutcome, WardenError> {
        let pipeline = self.current_pipeline().await?;
        Ok(pipeline.write_guarded(path, content).await?)
    }

    /// Budget gate; call synchronously before any paid model call
    ///
    /// # Errors
    /// [`BudgetError::Exceeded`] at or beyond the configured ceiling;
    /// must propagate, it halts further spend.
    pub async fn check_budget(&self) -> Result<BudgetCheck, WardenError> {
        let snapshot = self.identity.snapshot().await;
        Ok(self
            .governor
            .check_budget(snapshot.budget_limits.as_ref())
            .await?)
    }

    /// Fold one observation into regression history
    ///
    /// # Errors
    /// Surfaces history save failures; loads degrade internally.
    pub async fn observe(&self, event: &ObservationEvent) -> Result<TargetHistory, WardenError> {
        Ok(self.engine.fold(event).await?)
    }

    /// Targets at or above `min_score` whose latest status is not a
    /// success
    pub async fn escalated_issues(&self, min_score: u8) -> Vec<TargetHistory> {
        self.engine.escalated_issues(min_score).await
    }

    /// Aggregate regression view
    pub async fn summary(&self) -> RegressionSummary {
        self.engine.summary().await
    }

    /// Start the ingestion watcher (no-op if running)
    pub async fn start_watcher(&self) -> bool {
        self.watcher.start().await
    }

    /// Stop the ingestion watcher (idempotent)
    pub async fn stop_watcher(&self) -> bool {
        self.watcher.stop().await
    }

    /// Step registry and outcome callbacks
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &StepTracker {
        &self.tracker
    }

    /// The regression engine (shared with the watcher)
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Arc<RegressionEngine> {
        &self.engine
    }

    /// The ingestion watcher
    #[inline]
    #[must_use]
    pub fn watcher(&self) -> &IngestionWatcher {
        &self.watcher
    }

    /// Pipeline with a policy no older than the identity TTL
    async fn current_pipeline(&self) -> Result<MutationPipeline, WardenError> {
        let snapshot = self.identity.snapshot().await;
        let generation = self.identity.generation().await;

        let mut guard = self.pipeline.lock().await;
        if guard.0 != generation {
            let policy =
                PathPolicy::from_lists(&snapshot.safe_paths, &snapshot.never_modify_paths)?;
            guard.1.set_policy(policy);
            guard.0 = generation;
            tracing::debug!(generation, "path policy rebuilt from refreshed identity");
        }
        Ok(guard.1.clone())
    }
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden").finish_non_exhaustive()
    }
}
