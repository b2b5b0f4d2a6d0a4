//! Observation artifacts dropped by external producers

use serde::{Deserialize, Serialize};

/// A blocked/failed spec artifact as dropped by the build layer
///
/// Parsing is tolerant: producers vary, so every field is optional and
/// defaults apply. The target id falls back to `"unknown"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockedSpecReport {
    /// Spec or integration the artifact is about
    pub spec: Option<String>,
    /// Producer-reported status (`blocked`, `failed`, ...)
    pub status: Option<String>,
    /// Why the producer gave up
    pub reason: Option<String>,
    /// How many attempts were made before blocking
    pub iterations: Option<u32>,
    /// Where the artifact body lives
    pub artifact_path: Option<String>,
    /// Producer-side failure trail
    pub failure_history: Vec<String>,
}

impl BlockedSpecReport {
    /// Target id, falling back to `"unknown"`
    #[must_use]
    pub fn target_id(&self) -> &str {
        self.spec.as_deref().unwrap_or("unknown")
    }

    /// Status string, defaulting to `"blocked"`
    #[must_use]
    pub fn status_or_blocked(&self) -> &str {
        self.status.as_deref().unwrap_or("blocked")
    }

    /// Reason string, defaulting to a generic marker
    #[must_use]
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("no reason recorded")
    }

    /// Parse an artifact body
    ///
    /// # Errors
    /// Returns the underlying JSON error; callers swallow it at artifact
    /// granularity.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
