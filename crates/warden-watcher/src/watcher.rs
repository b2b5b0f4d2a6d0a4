//! The periodic ingestion task

use crate::artifact::BlockedSpecReport;
use crate::log_scan::scan_block_lines;
use crate::notifier::BlockedSpecNotifier;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use warden_regression::{ObservationEvent, ObservationStatus, RegressionEngine};

/// Default polling interval between ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where and how often the watcher looks
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Drop directories external producers write artifacts into
    pub drop_dirs: Vec<PathBuf>,
    /// Directory holding daily logs (`progress-YYYY-MM-DD.md`), if any
    pub log_dir: Option<PathBuf>,
    /// Tick interval
    pub poll_interval: Duration,
}

impl WatcherConfig {
    /// Config over a set of drop directories with the default interval
    #[must_use]
    pub fn new(drop_dirs: Vec<PathBuf>) -> Self {
        Self {
            drop_dirs,
            log_dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Also scan daily logs under `log_dir`
    #[must_use]
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Override the tick interval
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Counters for the operator surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatcherStats {
    /// Artifacts marked processed (including seeded and stale ones)
    pub processed_artifacts: usize,
    /// Daily-log alerts raised so far
    pub log_alerts: usize,
    /// Artifacts actually folded into history
    pub folded_artifacts: usize,
}

/// Mutable watcher state, preserved across stop/start
struct WatcherState {
    /// Artifacts already handled, keyed by (source directory, file name)
    processed: HashSet<(PathBuf, String)>,
    /// Daily-log alerts already raised, keyed by (date, artifact ref)
    alerted: HashSet<(String, String)>,
    /// End of the last completed scan; advances monotonically
    cursor: DateTime<Utc>,
    /// Whether the processed set has been seeded from directory contents
    seeded: bool,
    folded: usize,
}

struct WatcherInner {
    config: WatcherConfig,
    engine: Arc<RegressionEngine>,
    notifier: Arc<dyn BlockedSpecNotifier>,
    state: Mutex<WatcherState>,
    shutdown: Notify,
}

/// Polls drop directories and daily logs, feeding the regression engine
///
/// `Stopped -> Running` on [`start`](Self::start) (no-op when already
/// running); `Running -> Stopped` on [`stop`](Self::stop) (idempotent).
/// Stopping cancels the pending timer without losing the processed set, so
/// a restart continues rather than re-seeding. Shutdown is cooperative: an
/// in-flight tick runs to completion, so a folded artifact is always marked
/// processed before the task exits.
pub struct IngestionWatcher {
    inner: Arc<WatcherInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IngestionWatcher {
    /// Create a watcher over an engine and a notifier
    #[must_use]
    pub fn new(
        config: WatcherConfig,
        engine: Arc<RegressionEngine>,
        notifier: Arc<dyn BlockedSpecNotifier>,
    ) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                config,
                engine,
                notifier,
                state: Mutex::new(WatcherState {
                    processed: HashSet::new(),
                    alerted: HashSet::new(),
                    cursor: Utc::now(),
                    seeded: false,
                    folded: 0,
                }),
                shutdown: Notify::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the periodic task. Returns `false` (and does nothing) when
    /// already running; starting twice never creates two timers.
    ///
    /// The first start seeds the processed set from current directory
    /// contents: artifacts present at startup are already-known state, not
    /// new events.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!("ingestion watcher already running");
            return false;
        }

        self.inner.seed().await;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = inner.shutdown.notified() => break,
                    _ = ticker.tick() => inner.tick().await,
                }
            }
        });
        *task = Some(handle);
        tracing::info!(
            drop_dirs = self.inner.config.drop_dirs.len(),
            interval_ms = self.inner.config.poll_interval.as_millis() as u64,
            "ingestion watcher started"
        );
        true
    }

    /// Stop the periodic task, waiting for any in-flight tick to finish.
    /// Idempotent; returns `false` when already stopped. Processed-set
    /// state survives, so a later start continues.
    pub async fn stop(&self) -> bool {
        let mut task = self.task.lock().await;
        match task.take() {
            Some(handle) => {
                self.inner.shutdown.notify_one();
                // Cooperative: an artifact that was folded mid-tick gets
                // its processed-set insert before the task exits, so a
                // restart cannot re-fold it.
                let _ = handle.await;
                tracing::info!("ingestion watcher stopped");
                true
            }
            None => false,
        }
    }

    /// Whether the periodic task is currently running
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Seed the processed set from current directory contents (no-op after
    /// the first call, including via [`start`](Self::start))
    pub async fn seed(&self) {
        self.inner.seed().await;
    }

    /// Run one ingestion pass immediately (deterministic alternative to
    /// waiting for the timer)
    pub async fn tick(&self) {
        self.inner.tick().await;
    }

    /// Current counters
    pub async fn stats(&self) -> WatcherStats {
        let state = self.inner.state.lock().await;
        WatcherStats {
            processed_artifacts: state.processed.len(),
            log_alerts: state.alerted.len(),
            folded_artifacts: state.folded,
        }
    }
}

impl WatcherInner {
    async fn seed(&self) {
        let mut state = self.state.lock().await;
        if state.seeded {
            return;
        }
        for dir in &self.config.drop_dirs {
            for name in list_artifact_names(dir).await {
                state.processed.insert((dir.clone(), name));
            }
        }
        state.seeded = true;
        state.cursor = Utc::now();
        tracing::info!(
            known = state.processed.len(),
            "processed set seeded from drop directories"
        );
    }

    /// One full pass: every drop directory, then the daily log, then the
    /// cursor advance
    async fn tick(&self) {
        let tick_start = Utc::now();

        for dir in &self.config.drop_dirs {
            self.scan_drop_dir(dir).await;
        }
        if let Some(log_dir) = &self.config.log_dir {
            self.scan_daily_log(log_dir, tick_start).await;
        }

        let mut state = self.state.lock().await;
        if tick_start > state.cursor {
            state.cursor = tick_start;
        }
    }

    async fn scan_drop_dir(&self, dir: &Path) {
        // Missing directory is "nothing to do", not an error
        let entries = match list_artifacts(dir).await {
            Some(entries) => entries,
            None => return,
        };

        let mut state = self.state.lock().await;
        for (name, modified) in entries {
            let key = (dir.to_path_buf(), name.clone());
            if state.processed.contains(&key) {
                continue;
            }

            if modified < state.cursor {
                // Existed before the last completed scan but was missed by
                // listing order: already-seen, do not fold.
                tracing::debug!(artifact = %name, "stale artifact marked processed");
                state.processed.insert(key);
                continue;
            }

            self.process_artifact(dir, &name, &mut state).await;
            state.processed.insert(key);
        }
    }

    /// Parse and fold one fresh artifact. Every failure in here is
    /// swallowed at artifact granularity so siblings and the tick survive.
    async fn process_artifact(&self, dir: &Path, name: &str, state: &mut WatcherState) {
        let path = dir.join(name);
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(artifact = %path.display(), error = %e, "unreadable artifact skipped");
                return;
            }
        };

        let report = match BlockedSpecReport::parse(&body) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(artifact = %path.display(), error = %e, "malformed artifact skipped");
                return;
            }
        };

        let event = ObservationEvent::new(
            Some(report.target_id()),
            "spec",
            ObservationStatus::Failed,
            report.reason_or_default(),
        )
        .with_details(serde_json::json!({
            "artifact": name,
            "iterations": report.iterations,
        }));

        match self.engine.fold(&event).await {
            Ok(record) => {
                state.folded += 1;
                tracing::info!(
                    target = %record.id,
                    score = record.escalation_score,
                    artifact = %name,
                    "blocked artifact folded into history"
                );
            }
            Err(e) => {
                tracing::warn!(artifact = %name, error = %e, "fold failed for artifact");
            }
        }

        self.notifier.on_spec_blocked(report, &body).await;
    }

    async fn scan_daily_log(&self, log_dir: &Path, now: DateTime<Utc>) {
        let date = now.format("%Y-%m-%d").to_string();
        let path = log_dir.join(format!("progress-{date}.md"));
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            // No log today: nothing to do
            Err(_) => return,
        };

        let hits = scan_block_lines(&body);
        if hits.is_empty() {
            return;
        }

        let mut state = self.state.lock().await;
        for hit in hits {
            let key = (date.clone(), hit.dedup_ref().to_string());
            if state.alerted.contains(&key) {
                continue;
            }
            state.alerted.insert(key);

            let report = BlockedSpecReport {
                spec: hit.artifact.clone(),
                status: Some("blocked".to_string()),
                reason: Some(hit.line.clone()),
                artifact_path: hit.artifact.clone(),
                ..BlockedSpecReport::default()
            };
            tracing::info!(line = %hit.line, "daily log block indicator");
            self.notifier.on_spec_blocked(report, &hit.line).await;
        }
    }
}

impl std::fmt::Debug for IngestionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionWatcher")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// List regular files in a directory with their modification times.
/// `None` when the directory does not exist or cannot be listed.
async fn list_artifacts(dir: &Path) -> Option<Vec<(String, DateTime<Utc>)>> {
    let mut rd = tokio::fs::read_dir(dir).await.ok()?;
    let mut entries = Vec::new();
    while let Ok(Some(entry)) = rd.next_entry().await {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let modified = entry
            .metadata()
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map_or_else(Utc::now, DateTime::<Utc>::from);
        entries.push((entry.file_name().to_string_lossy().into_owned(), modified));
    }
    // Deterministic discovery order within one directory
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Some(entries)
}

async fn list_artifact_names(dir: &Path) -> Vec<String> {
    list_artifacts(dir)
        .await
        .map(|entries| entries.into_iter().map(|(name, _)| name).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NullNotifier;
    use chrono::Duration as ChronoDuration;
    use warden_regression::HistoryStore;

    fn watcher_over(dir: &Path) -> IngestionWatcher {
        let engine = Arc::new(RegressionEngine::new(HistoryStore::new(dir)));
        IngestionWatcher::new(
            WatcherConfig::new(vec![dir.join("drop")]),
            engine,
            Arc::new(NullNotifier),
        )
    }

    #[tokio::test]
    async fn missing_drop_dir_is_nothing_to_do() {
        let tmp = tempfile::tempdir().unwrap();
        let watcher = watcher_over(tmp.path());
        // drop/ was never created
        watcher.tick().await;
        assert_eq!(watcher.stats().await.processed_artifacts, 0);
    }

    #[tokio::test]
    async fn stale_artifact_marked_processed_without_folding() {
        let tmp = tempfile::tempdir().unwrap();
        let drop = tmp.path().join("drop");
        tokio::fs::create_dir_all(&drop).await.unwrap();
        let watcher = watcher_over(tmp.path());
        watcher.seed().await;

        tokio::fs::write(drop.join("old.json"), r#"{"spec":"old"}"#)
            .await
            .unwrap();
        // Push the cursor past the artifact's mtime
        {
            let mut state = watcher.inner.state.lock().await;
            state.cursor = Utc::now() + ChronoDuration::hours(1);
        }

        watcher.tick().await;

        let stats = watcher.stats().await;
        assert_eq!(stats.processed_artifacts, 1);
        assert_eq!(stats.folded_artifacts, 0);
    }

    #[tokio::test]
    async fn cursor_advances_monotonically() {
        let tmp = tempfile::tempdir().unwrap();
        let watcher = watcher_over(tmp.path());
        watcher.seed().await;

        let forced = Utc::now() + ChronoDuration::hours(1);
        {
            let mut state = watcher.inner.state.lock().await;
            state.cursor = forced;
        }
        watcher.tick().await;

        let state = watcher.inner.state.lock().await;
        // An earlier tick never moves the cursor backwards
        assert_eq!(state.cursor, forced);
    }

    #[tokio::test]
    async fn malformed_artifact_does_not_abort_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let drop = tmp.path().join("drop");
        tokio::fs::create_dir_all(&drop).await.unwrap();
        let watcher = watcher_over(tmp.path());
        watcher.seed().await;

        tokio::fs::write(drop.join("a-bad.json"), "not json")
            .await
            .unwrap();
        tokio::fs::write(drop.join("b-good.json"), r#"{"spec":"svc-b"}"#)
            .await
            .unwrap();

        watcher.tick().await;

        let stats = watcher.stats().await;
        assert_eq!(stats.processed_artifacts, 2);
        assert_eq!(stats.folded_artifacts, 1);
    }
}
