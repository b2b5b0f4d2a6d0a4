//! Daily-log block scan
//!
//! Inspects the most recent lines of an append-only daily log for a small
//! fixed set of block indicators. Alerts are deduplicated by a composite
//! key of date and referenced artifact name, so repeated scans of the same
//! log never re-alert.

use once_cell::sync::Lazy;
use regex::Regex;

/// How many trailing log lines each scan inspects
pub(crate) const SCAN_WINDOW_LINES: usize = 20;

static BLOCK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bblocked\b",
        r"(?i)needs[- ]human",
        r"(?i)manual intervention",
        r"(?i)\bescalat(e|ed|ing|ion)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static ARTIFACT_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9_][A-Za-z0-9_./-]*\.(?:json|md|ya?ml))").expect("static pattern"));

/// One block indication found in the log window
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockLine {
    /// The matching line, verbatim
    pub(crate) line: String,
    /// Referenced artifact name, if the line names one
    pub(crate) artifact: Option<String>,
}

impl BlockLine {
    /// Dedup key component: the artifact name when present, otherwise the
    /// whole line
    pub(crate) fn dedup_ref(&self) -> &str {
        self.artifact.as_deref().unwrap_or(&self.line)
    }
}

/// Scan the last [`SCAN_WINDOW_LINES`] lines for block indicators
pub(crate) fn scan_block_lines(log_body: &str) -> Vec<BlockLine> {
    let lines: Vec<&str> = log_body.lines().collect();
    let start = lines.len().saturating_sub(SCAN_WINDOW_LINES);

    lines[start..]
        .iter()
        .filter(|line| BLOCK_PATTERNS.iter().any(|p| p.is_match(line)))
        .map(|line| BlockLine {
            line: (*line).to_string(),
            artifact: ARTIFACT_REF
                .captures(line)
                .map(|c| c[1].to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_blocked_line_with_artifact() {
        let log = "step done\nBLOCKED: auth-flow.json needs review\n";
        let hits = scan_block_lines(log);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].artifact.as_deref(), Some("auth-flow.json"));
    }

    #[test]
    fn detects_needs_human_without_artifact() {
        let log = "iteration 5 failed; needs human attention\n";
        let hits = scan_block_lines(log);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].artifact.is_none());
        assert_eq!(hits[0].dedup_ref(), hits[0].line);
    }

    #[test]
    fn only_the_recent_window_is_scanned() {
        let mut log = String::new();
        log.push_str("BLOCKED: ancient.json\n");
        for i in 0..SCAN_WINDOW_LINES {
            log.push_str(&format!("routine line {i}\n"));
        }
        log.push_str("BLOCKED: fresh.json\n");

        let hits = scan_block_lines(&log);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].artifact.as_deref(), Some("fresh.json"));
    }

    #[test]
    fn case_insensitive_indicators() {
        let log = "spec escalated to operator\nManual Intervention required for db.yaml\n";
        let hits = scan_block_lines(log);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].artifact.as_deref(), Some("db.yaml"));
    }

    #[test]
    fn quiet_log_yields_nothing() {
        assert!(scan_block_lines("all green\nstep 3 done\n").is_empty());
    }
}
