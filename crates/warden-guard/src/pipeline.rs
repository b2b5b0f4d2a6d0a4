//! Guarded read/write pipeline for a single target file

use crate::backup::{backup_file_name, Backup};
use crate::error::GuardError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use warden_policy::{PathClassification, PathPolicy};

/// Maximum characters returned by a guarded read before truncation kicks in
pub const MAX_READ_CHARS: usize = 15_000;

/// Result of a guarded read
///
/// Missing files are a value, not an error: the caller (build orchestration)
/// routinely probes paths that do not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRead {
    /// File does not exist at the target path
    Missing {
        /// The probed path
        path: PathBuf,
    },
    /// Full content, within the size threshold
    Complete {
        /// Entire file content
        content: String,
    },
    /// Oversized file: only the first [`MAX_READ_CHARS`] characters
    Truncated {
        /// Exactly the first threshold's worth of content
        content: String,
        /// Lines contained in the shown region
        shown_lines: usize,
        /// Lines in the whole file
        total_lines: usize,
    },
}

impl SourceRead {
    /// Render the read for a downstream consumer.
    ///
    /// Truncated reads carry an explicit continuation marker: the consumer
    /// must preserve the unshown lines byte-for-byte and may only change
    /// the shown region. That contract is enforced on the consumer, not
    /// here.
    #[must_use]
    pub fn rendered(&self) -> String {
        match self {
            Self::Missing { path } => {
                format!("[file does not exist: {}]", path.display())
            }
            Self::Complete { content } => content.clone(),
            Self::Truncated {
                content,
                shown_lines,
                total_lines,
            } => {
                format!(
                    "{content}\n\n[TRUNCATED: showing lines 1-{shown_lines} of {total_lines}. \
                     The remaining {} lines exist but are not shown; they must be preserved \
                     byte-for-byte. Only the region shown above may be changed.]",
                    total_lines.saturating_sub(*shown_lines)
                )
            }
        }
    }

    /// Whether the read found a file
    #[inline]
    #[must_use]
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Missing { .. })
    }
}

/// Result of a guarded write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content written; `backup` is `Some` iff a file existed beforehand
    Written {
        /// Snapshot of the prior content, if any
        backup: Option<Backup>,
    },
    /// Path is not mutable under the current policy; nothing was touched.
    ///
    /// Reported, not thrown, so orchestration can record a step failure
    /// without crashing.
    RejectedByPolicy {
        /// The rejected path (project-relative)
        path: PathBuf,
        /// Why the gate closed
        classification: PathClassification,
    },
}

impl WriteOutcome {
    /// Whether the write landed
    #[inline]
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Policy-checked read/write pipeline rooted at a project directory
///
/// Callers must serialize writes per path; the pipeline does not implement
/// path-level locking.
#[derive(Debug, Clone)]
pub struct MutationPipeline {
    root: PathBuf,
    backup_dir: PathBuf,
    policy: PathPolicy,
}

impl MutationPipeline {
    /// Create a pipeline rooted at `root` with the default backup store
    /// (`<root>/.warden/backups`)
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, policy: PathPolicy) -> Self {
        let root = root.into();
        let backup_dir = root.join(".warden").join("backups");
        Self {
            root,
            backup_dir,
            policy,
        }
    }

    /// Use a custom backup store location
    #[must_use]
    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    /// Replace the policy (identity refresh)
    pub fn set_policy(&mut self, policy: PathPolicy) {
        self.policy = policy;
    }

    /// Current policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    /// Project root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a source file, relative to the project root.
    ///
    /// Missing files yield [`SourceRead::Missing`]. Files over
    /// [`MAX_READ_CHARS`] characters are truncated to exactly the first
    /// threshold's worth of content with line counts for the continuation
    /// marker.
    ///
    /// # Errors
    /// Only genuine I/O failures (permissions, encoding), never absence.
    pub async fn read_source(&self, path: impl AsRef<Path>) -> Result<SourceRead, GuardError> {
        let rel = path.as_ref();
        let abs = self.root.join(rel);

        let content = match tokio::fs::read_to_string(&abs).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SourceRead::Missing {
                    path: rel.to_path_buf(),
                });
            }
            Err(e) => return Err(GuardError::io(abs, e)),
        };

        Ok(truncate_read(content))
    }

    /// Write a file through the policy gate, backing up prior content.
    ///
    /// Sequence: classify → create destination directory → capture backup
    /// of any existing file → temp-file + rename overwrite. A backup
    /// capture failure aborts the write and leaves the target untouched.
    ///
    /// # Errors
    /// - [`GuardError::BackupFailed`] if prior content could not be captured
    /// - [`GuardError::Io`] for destination I/O failures
    pub async fn write_guarded(
        &self,
        path: impl AsRef<Path>,
        content: &str,
    ) -> Result<WriteOutcome, GuardError> {
        let rel = path.as_ref();
        let rel_str = rel.to_string_lossy();

        let classification = self.policy.classify(&rel_str);
        if !classification.is_mutable() {
            tracing::warn!(path = %rel.display(), ?classification, "write rejected by policy");
            return Ok(WriteOutcome::RejectedByPolicy {
                path: rel.to_path_buf(),
                classification,
            });
        }

        let abs = self.root.join(rel);
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GuardError::io(parent.to_path_buf(), e))?;
        }

        // Existing content is captured before it becomes unreachable; a
        // capture failure aborts the whole write rather than risking the
        // only prior copy.
        let backup = if tokio::fs::try_exists(&abs)
            .await
            .map_err(|e| GuardError::io(abs.clone(), e))?
        {
            Some(self.capture_backup(rel, &abs).await?)
        } else {
            None
        };

        self.replace_atomically(&abs, content).await?;

        tracing::debug!(
            path = %rel.display(),
            backed_up = backup.is_some(),
            bytes = content.len(),
            "guarded write complete"
        );
        Ok(WriteOutcome::Written { backup })
    }

    /// Snapshot the current content of `abs` into the backup store
    async fn capture_backup(&self, rel: &Path, abs: &Path) -> Result<Backup, GuardError> {
        let captured_at = Utc::now();

        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| GuardError::backup(rel.to_path_buf(), e))?;

        let storage_path = self.backup_dir.join(backup_file_name(rel, captured_at));
        tokio::fs::copy(abs, &storage_path)
            .await
            .map_err(|e| GuardError::backup(rel.to_path_buf(), e))?;

        tracing::info!(
            original = %rel.display(),
            backup = %storage_path.display(),
            "captured pre-overwrite backup"
        );
        Ok(Backup {
            original_path: rel.to_path_buf(),
            captured_at,
            storage_path,
        })
    }

    /// Write `content` next to the target, then rename over it, so a
    /// concurrent in-process reader of the same path never observes a
    /// partial write
    async fn replace_atomically(&self, abs: &Path, content: &str) -> Result<(), GuardError> {
        let file_name = abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "target".to_string());
        let tmp = abs.with_file_name(format!(
            ".{file_name}.{}.warden-tmp",
            Utc::now().timestamp_millis()
        ));

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| GuardError::io(tmp.clone(), e))?;
        tokio::fs::rename(&tmp, abs)
            .await
            .map_err(|e| GuardError::io(abs.to_path_buf(), e))?;
        Ok(())
    }
}

/// Apply the size threshold to freshly read content
fn truncate_read(content: String) -> SourceRead {
    let total_chars = content.chars().count();
    if total_chars <= MAX_READ_CHARS {
        return SourceRead::Complete { content };
    }

    let cut = content
        .char_indices()
        .nth(MAX_READ_CHARS)
        .map_or(content.len(), |(i, _)| i);
    let shown = content[..cut].to_string();
    let shown_lines = shown.lines().count();
    let total_lines = content.lines().count();

    SourceRead::Truncated {
        content: shown,
        shown_lines,
        total_lines,
    }
}
