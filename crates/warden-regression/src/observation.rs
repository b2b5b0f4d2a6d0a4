//! Observation events and the status vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a status is classified by the fold state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Counts as a pass; resets the failure streak
    Success,
    /// Counts as a failure; extends the streak
    Failure,
    /// Counted as a check only (e.g. skipped)
    Neutral,
}

/// Closed status vocabulary for observations
///
/// Parsed case-insensitively from artifact/producer strings; anything
/// outside the known set is carried through as `Other` and treated as
/// neutral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObservationStatus {
    /// Check passed
    Passed,
    /// Integration reported healthy
    Healthy,
    /// Check failed
    Failed,
    /// Integration reported unhealthy
    Unhealthy,
    /// Integration misconfigured
    Misconfigured,
    /// Producer-side error
    Error,
    /// Check was skipped
    Skipped,
    /// Unrecognized status, preserved verbatim
    Other(String),
}

impl ObservationStatus {
    /// Classify for fold transitions
    #[must_use]
    pub fn class(&self) -> StatusClass {
        match self {
            Self::Passed | Self::Healthy => StatusClass::Success,
            Self::Failed | Self::Unhealthy | Self::Misconfigured | Self::Error => {
                StatusClass::Failure
            }
            Self::Skipped | Self::Other(_) => StatusClass::Neutral,
        }
    }

    /// Whether this is a success-class status
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.class() == StatusClass::Success
    }

    /// Whether this is a failure-class status
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.class() == StatusClass::Failure
    }

    /// Canonical lowercase form
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "passed",
            Self::Healthy => "healthy",
            Self::Failed => "failed",
            Self::Unhealthy => "unhealthy",
            Self::Misconfigured => "misconfigured",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ObservationStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "passed" => Self::Passed,
            "healthy" => Self::Healthy,
            "failed" => Self::Failed,
            "unhealthy" => Self::Unhealthy,
            "misconfigured" => Self::Misconfigured,
            "error" => Self::Error,
            "skipped" => Self::Skipped,
            _ => Self::Other(s),
        }
    }
}

impl From<ObservationStatus> for String {
    fn from(status: ObservationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One discrete signal about a monitored target
///
/// Arrives from direct orchestration calls or from artifacts discovered by
/// the ingestion watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationEvent {
    /// Monitored unit: integration name, spec file, or `"unknown"`
    pub target_id: String,
    /// Target kind (integration, spec, step, ...)
    pub kind: String,
    /// Outcome reported by the producer
    pub status: ObservationStatus,
    /// Human-readable detail
    pub message: String,
    /// Optional structured payload from the producer
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
    /// When the producer observed the outcome
    pub observed_at: DateTime<Utc>,
}

impl ObservationEvent {
    /// Create an event; a missing target id falls back to `"unknown"`
    #[must_use]
    pub fn new(
        target_id: Option<&str>,
        kind: impl Into<String>,
        status: ObservationStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.unwrap_or("unknown").to_string(),
            kind: kind.into(),
            status,
            message: message.into(),
            details: None,
            observed_at: Utc::now(),
        }
    }

    /// Failure observation for a target
    #[must_use]
    pub fn failure(
        target_id: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            kind: kind.into(),
            status: ObservationStatus::Failed,
            message: message.into(),
            details: None,
            observed_at: Utc::now(),
        }
    }

    /// Success observation for a target
    #[must_use]
    pub fn success(target_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            kind: kind.into(),
            status: ObservationStatus::Passed,
            message: String::new(),
            details: None,
            observed_at: Utc::now(),
        }
    }

    /// Attach a structured payload
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Pin the observation time (tests, replayed artifacts)
    #[must_use]
    pub fn at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary_classes() {
        assert_eq!(ObservationStatus::Passed.class(), StatusClass::Success);
        assert_eq!(ObservationStatus::Healthy.class(), StatusClass::Success);
        assert_eq!(ObservationStatus::Failed.class(), StatusClass::Failure);
        assert_eq!(ObservationStatus::Unhealthy.class(), StatusClass::Failure);
        assert_eq!(
            ObservationStatus::Misconfigured.class(),
            StatusClass::Failure
        );
        assert_eq!(ObservationStatus::Error.class(), StatusClass::Failure);
        assert_eq!(ObservationStatus::Skipped.class(), StatusClass::Neutral);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(
            ObservationStatus::from("FAILED".to_string()),
            ObservationStatus::Failed
        );
        assert_eq!(
            ObservationStatus::from("Passed".to_string()),
            ObservationStatus::Passed
        );
    }

    #[test]
    fn unknown_status_is_neutral_and_preserved() {
        let status = ObservationStatus::from("degraded".to_string());
        assert_eq!(status, ObservationStatus::Other("degraded".to_string()));
        assert_eq!(status.class(), StatusClass::Neutral);
        assert_eq!(status.as_str(), "degraded");
    }

    #[test]
    fn missing_target_falls_back_to_unknown() {
        let event = ObservationEvent::new(None, "spec", ObservationStatus::Failed, "boom");
        assert_eq!(event.target_id, "unknown");
    }

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&ObservationStatus::Misconfigured).unwrap();
        assert_eq!(json, "\"misconfigured\"");
        let back: ObservationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ObservationStatus::Misconfigured);
    }
}
