//! WARDEN Budget Governor
//!
//! Gates every paid generative-model call against a configured spend
//! ceiling. The governor is a gate, not a rate limiter: it never decrements
//! or reserves budget (the ledger append happens after the call, in the
//! cost-ledger collaborator). The spend total is read fresh on every check
//! so a stale figure can never allow an over-budget call.
//!
//! Fail direction: open on missing configuration, closed on a configured
//! and reached ceiling, closed on an unreadable ledger.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configured spend ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimits {
    /// Hard ceiling; a total at or beyond this halts further spend
    pub max: f64,
    /// Soft threshold; crossing it is allowed but logged
    pub warning: f64,
}

impl BudgetLimits {
    /// Create limits with a given ceiling and warning threshold
    #[inline]
    #[must_use]
    pub fn new(max: f64, warning: f64) -> Self {
        Self { max, warning }
    }
}

/// Read side of the cost-ledger collaborator
///
/// Implementations return the running all-time spend total. The governor
/// never caches it.
#[async_trait::async_trait]
pub trait SpendLedger: Send + Sync {
    /// Current running spend total
    ///
    /// # Errors
    /// Returns [`LedgerError`] if the total cannot be read.
    async fn total_spend(&self) -> Result<f64, LedgerError>;
}

/// Errors reading the cost ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Ledger backing store unreachable or unreadable
    #[error("spend ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the budget gate
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// Spend total is at or beyond the configured ceiling.
    ///
    /// Must propagate to the caller; it halts further spend.
    #[error("budget exceeded: spent {spent:.2} of max {max:.2}")]
    Exceeded {
        /// Running total at check time
        spent: f64,
        /// Configured ceiling
        max: f64,
    },

    /// Ledger could not be read while limits are configured; fails closed
    #[error("budget check failed: {0}")]
    LedgerUnavailable(#[from] LedgerError),
}

/// Outcome of a passing budget check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetCheck {
    /// No limits configured; the gate does not block
    Unlimited,
    /// Under the warning threshold
    Ok {
        /// Running total at check time
        spent: f64,
        /// Configured ceiling
        max: f64,
    },
    /// At or over the warning threshold but under the ceiling
    Warning {
        /// Running total at check time
        spent: f64,
        /// Configured ceiling
        max: f64,
    },
}

/// The spend-ceiling gate
///
/// Runs synchronously (from the caller's perspective) before any paid
/// external call.
pub struct BudgetGovernor {
    ledger: Arc<dyn SpendLedger>,
}

impl BudgetGovernor {
    /// Create a governor over a cost ledger
    #[must_use]
    pub fn new(ledger: Arc<dyn SpendLedger>) -> Self {
        Self { ledger }
    }

    /// Check the current spend against the configured limits.
    ///
    /// # Errors
    /// - [`BudgetError::Exceeded`] when the total is at or beyond `max`
    /// - [`BudgetError::LedgerUnavailable`] when limits are configured but
    ///   the ledger cannot be read
    pub async fn check_budget(
        &self,
        limits: Option<&BudgetLimits>,
    ) -> Result<BudgetCheck, BudgetError> {
        let Some(limits) = limits else {
            tracing::debug!("no budget limits configured; gate open");
            return Ok(BudgetCheck::Unlimited);
        };

        let spent = self.ledger.total_spend().await?;

        if spent >= limits.max {
            tracing::error!(spent, max = limits.max, "budget ceiling reached");
            return Err(BudgetError::Exceeded {
                spent,
                max: limits.max,
            });
        }

        if spent >= limits.warning {
            tracing::warn!(spent, max = limits.max, "budget warning threshold crossed");
            return Ok(BudgetCheck::Warning {
                spent,
                max: limits.max,
            });
        }

        Ok(BudgetCheck::Ok {
            spent,
            max: limits.max,
        })
    }
}

impl std::fmt::Debug for BudgetGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetGovernor").finish_non_exhaustive()
    }
}
