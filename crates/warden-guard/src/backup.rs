//! Pre-overwrite backups
//!
//! A [`Backup`] is an immutable snapshot of a file's prior content, created
//! exclusively by the mutation pipeline before an overwrite. Backups are
//! never created for new files and never deleted automatically; retention
//! is operator-managed.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// An immutable pre-overwrite snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Path of the file whose content was captured (project-relative)
    pub original_path: PathBuf,
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
    /// Where the snapshot lives in the backup store
    pub storage_path: PathBuf,
}

/// Derive the backup file name for an original path at a capture time.
///
/// Encodes the escaped original path plus a millisecond timestamp, so the
/// name is derivable from its inputs and collision-resistant across rapid
/// successive writes to the same path.
#[must_use]
pub fn backup_file_name(original: &Path, captured_at: DateTime<Utc>) -> String {
    let escaped = escape_path(original);
    format!(
        "{}.{}.bak",
        escaped,
        captured_at.format("%Y%m%dT%H%M%S%.3f")
    )
}

/// Escape a path for use as a single file name segment
fn escape_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace(['/', '\\'], "__")
        .replace(':', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn backup_name_encodes_path_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 45).unwrap();
        let name = backup_file_name(Path::new("src/main.rs"), at);
        assert_eq!(name, "src__main.rs.20260301T123045.000.bak");
    }

    #[test]
    fn backup_names_differ_across_writes() {
        let a = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 45).unwrap();
        let b = a + chrono::Duration::milliseconds(1);
        let path = Path::new("src/main.rs");
        assert_ne!(backup_file_name(path, a), backup_file_name(path, b));
    }

    #[test]
    fn escape_handles_nested_paths() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let name = backup_file_name(Path::new("a/b/c.txt"), at);
        assert!(name.starts_with("a__b__c.txt."));
        assert!(!name.contains('/'));
    }
}
