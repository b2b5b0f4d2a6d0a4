//! JSON-backed history store
//!
//! One document per data directory, replaced whole on save (temp file +
//! rename) so readers never observe a partial write. Load degrades: a
//! missing or corrupt document is an empty store, logged for the operator
//! and never surfaced to the caller.

use crate::history::RegressionHistory;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Default file name for the regression history document
pub const HISTORY_FILE_NAME: &str = "regression-history.json";

/// Errors saving the history document
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error touching the document
    #[error("history store io error on {path}: {source}")]
    Io {
        /// Document or temp-file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document failed to serialize
    #[error("history store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Load-modify-save store for [`RegressionHistory`]
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store backed by the default document name under `data_dir`
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(HISTORY_FILE_NAME),
        }
    }

    /// Store backed by an explicit document path
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Document path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, degrading to empty on absence or corruption.
    ///
    /// Created empty on first access if absent; a corrupt document is
    /// logged at warn and replaced by the next save.
    pub async fn load(&self) -> RegressionHistory {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return RegressionHistory::empty();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "history store unreadable; treating as empty"
                );
                return RegressionHistory::empty();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "history store corrupt; treating as empty"
                );
                RegressionHistory::empty()
            }
        }
    }

    /// Persist the whole document atomically.
    ///
    /// Stamps `last_updated`, writes a sibling temp file, then renames it
    /// over the document.
    ///
    /// # Errors
    /// Returns [`StoreError`] on serialization or I/O failure.
    pub async fn save(&self, history: &mut RegressionHistory) -> Result<(), StoreError> {
        history.last_updated = Some(Utc::now());
        let raw = serde_json::to_string_pretty(history)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| StoreError::Io {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationEvent;

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        let history = store.load().await;
        assert!(history.entries.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        let now = Utc::now();
        let mut history = RegressionHistory::empty();
        history
            .entry_mut("svc-a", "integration", now)
            .apply(&ObservationEvent::failure("svc-a", "integration", "down"), now);
        store.save(&mut history).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entry("svc-a").unwrap().total_failures, 1);
        assert!(loaded.last_updated.is_some());
    }

    #[tokio::test]
    async fn corrupt_document_loads_empty_and_next_save_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        tokio::fs::write(store.path(), "{not json").await.unwrap();

        let mut history = store.load().await;
        assert!(history.entries.is_empty());

        let now = Utc::now();
        history
            .entry_mut("svc-a", "integration", now)
            .apply(&ObservationEvent::failure("svc-a", "integration", "down"), now);
        store.save(&mut history).await.unwrap();

        let reloaded = store.load().await;
        assert_eq!(reloaded.entries.len(), 1);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.save(&mut RegressionHistory::empty()).await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![HISTORY_FILE_NAME.to_string()]);
    }
}
