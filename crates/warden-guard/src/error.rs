//! Error types for the mutation pipeline

use std::path::PathBuf;

/// Errors during guarded reads and writes
///
/// A path that fails the policy check is NOT an error (see
/// [`WriteOutcome::RejectedByPolicy`](crate::WriteOutcome)); these variants
/// cover genuine I/O failures only.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// IO error touching the target path
    #[error("io error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backup capture failed before an overwrite; the write was aborted and
    /// the target left untouched
    #[error("backup capture failed for {path} (write aborted): {source}")]
    BackupFailed {
        /// Path whose prior content could not be captured
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl GuardError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create backup-capture error for path
    pub fn backup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::BackupFailed {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_error_display() {
        let err = GuardError::io("src/main.rs", std::io::Error::other("disk gone"));
        assert!(err.to_string().contains("src/main.rs"));
    }

    #[test]
    fn backup_error_mentions_abort() {
        let err = GuardError::backup("src/main.rs", std::io::Error::other("denied"));
        assert!(err.to_string().contains("write aborted"));
    }
}
