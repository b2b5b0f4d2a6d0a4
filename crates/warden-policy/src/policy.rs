//! Path classification
//!
//! [`PathPolicy`] holds the two ordered pattern lists and classifies
//! candidate paths. Deny always wins; absence from both lists is
//! `Unspecified`, which the write gate treats as protected.

use crate::pattern::{normalize, PathPattern, PatternError};
use serde::{Deserialize, Serialize};

/// Result of classifying a candidate path
///
/// Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathClassification {
    /// Path is on the allow list and not on the deny list
    Mutable,
    /// Path is on the deny list (hard veto, regardless of allow)
    Protected,
    /// Path is on neither list; fails closed when gating writes
    Unspecified,
}

impl PathClassification {
    /// Whether a write to a path with this classification may proceed
    #[inline]
    #[must_use]
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::Mutable)
    }
}

/// Mutation policy built from an allow list and a deny list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathPolicy {
    allow: Vec<PathPattern>,
    deny: Vec<PathPattern>,
}

impl PathPolicy {
    /// Build a policy from raw configuration entries
    ///
    /// # Errors
    /// Returns the first [`PatternError`] encountered in either list.
    pub fn from_lists(allow: &[String], deny: &[String]) -> Result<Self, PatternError> {
        let allow = allow
            .iter()
            .map(|e| PathPattern::parse(e))
            .collect::<Result<Vec<_>, _>>()?;
        let deny = deny
            .iter()
            .map(|e| PathPattern::parse(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { allow, deny })
    }

    /// Classify a candidate path
    ///
    /// Pure function of the path and the two lists; no side effects.
    #[must_use]
    pub fn classify(&self, path: &str) -> PathClassification {
        let normalized = normalize(path);
        if self.deny.iter().any(|p| p.matches(&normalized)) {
            return PathClassification::Protected;
        }
        if self.allow.iter().any(|p| p.matches(&normalized)) {
            return PathClassification::Mutable;
        }
        PathClassification::Unspecified
    }

    /// Whether a write to `path` is allowed (fail closed on `Unspecified`)
    #[inline]
    #[must_use]
    pub fn is_write_allowed(&self, path: &str) -> bool {
        self.classify(path).is_mutable()
    }

    /// The deny entry that vetoes `path`, if any
    #[must_use]
    pub fn denied_by(&self, path: &str) -> Option<&PathPattern> {
        let normalized = normalize(path);
        self.deny.iter().find(|p| p.matches(&normalized))
    }

    /// Allow-list patterns
    #[inline]
    #[must_use]
    pub fn allow_patterns(&self) -> &[PathPattern] {
        &self.allow
    }

    /// Deny-list patterns
    #[inline]
    #[must_use]
    pub fn deny_patterns(&self) -> &[PathPattern] {
        &self.deny
    }
}
