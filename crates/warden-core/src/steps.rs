//! Build-step records and outcome callbacks
//!
//! The planning layer (out of scope here) registers steps and reports
//! outcomes through these callbacks. A failed step also folds a failure
//! observation for its target into the regression engine, so step failures
//! participate in escalation like any other signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use ulid::Ulid;
use warden_regression::{ObservationEvent, RegressionEngine};

/// Unique step identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId(pub Ulid);

impl StepId {
    /// Generate new step ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a build step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    /// Registered, not started
    Pending,
    /// Currently being executed
    InProgress,
    /// Completed successfully
    Done,
    /// Failed with a reason
    Failed {
        /// Why the step failed
        reason: String,
    },
}

/// One build step as registered by orchestration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Step identity
    pub id: StepId,
    /// What kind of change the step makes
    pub action: String,
    /// File the step targets (project-relative)
    pub target_path: String,
    /// Human-readable intent
    pub description: String,
    /// Current lifecycle state
    pub status: StepStatus,
    /// When the step was registered
    pub created_at: DateTime<Utc>,
}

/// Errors from the step callbacks
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// No step registered under the given id
    #[error("unknown step: {0}")]
    UnknownStep(StepId),
}

/// Registry of steps plus the outcome callbacks
#[derive(Debug)]
pub struct StepTracker {
    steps: Mutex<HashMap<StepId, StepRecord>>,
    engine: Arc<RegressionEngine>,
}

impl StepTracker {
    /// Tracker folding step failures into `engine`
    #[must_use]
    pub fn new(engine: Arc<RegressionEngine>) -> Self {
        Self {
            steps: Mutex::new(HashMap::new()),
            engine,
        }
    }

    /// Register a step; returns its id
    pub async fn add_step(
        &self,
        action: impl Into<String>,
        target_path: impl Into<String>,
        description: impl Into<String>,
    ) -> StepId {
        let id = StepId::new();
        let record = StepRecord {
            id,
            action: action.into(),
            target_path: target_path.into(),
            description: description.into(),
            status: StepStatus::Pending,
            created_at: Utc::now(),
        };
        self.steps.lock().await.insert(id, record);
        id
    }

    /// Mark a step as started
    ///
    /// # Errors
    /// [`StepError::UnknownStep`] if the id was never registered.
    pub async fn mark_step_in_progress(&self, id: StepId) -> Result<(), StepError> {
        self.set_status(id, StepStatus::InProgress).await
    }

    /// Mark a step as completed
    ///
    /// # Errors
    /// [`StepError::UnknownStep`] if the id was never registered.
    pub async fn mark_step_done(&self, id: StepId) -> Result<(), StepError> {
        self.set_status(id, StepStatus::Done).await
    }

    /// Mark a step as failed and fold the failure into regression history
    /// under the step's target path
    ///
    /// # Errors
    /// [`StepError::UnknownStep`] if the id was never registered.
    pub async fn mark_step_failed(
        &self,
        id: StepId,
        reason: impl Into<String>,
    ) -> Result<(), StepError> {
        let reason = reason.into();
        let target_path = {
            let mut steps = self.steps.lock().await;
            let record = steps.get_mut(&id).ok_or(StepError::UnknownStep(id))?;
            record.status = StepStatus::Failed {
                reason: reason.clone(),
            };
            record.target_path.clone()
        };

        let event = ObservationEvent::failure(target_path, "step", reason);
        if let Err(e) = self.engine.fold(&event).await {
            tracing::warn!(step = %id, error = %e, "step failure not persisted to history");
        }
        Ok(())
    }

    /// Look up a step
    pub async fn step(&self, id: StepId) -> Option<StepRecord> {
        self.steps.lock().await.get(&id).cloned()
    }

    /// All registered steps
    pub async fn steps(&self) -> Vec<StepRecord> {
        self.steps.lock().await.values().cloned().collect()
    }

    async fn set_status(&self, id: StepId, status: StepStatus) -> Result<(), StepError> {
        let mut steps = self.steps.lock().await;
        let record = steps.get_mut(&id).ok_or(StepError::UnknownStep(id))?;
        record.status = status;
        Ok(())
    }
}
