//! Exact-match attribute filters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::traits::Attributes;

// ============================================================================
// AttributeFilter
// ============================================================================

/// Filter criteria for vector queries and scans.
///
/// Every constraint is an exact JSON equality on one attribute. Constraints
/// are combined with AND logic; an empty filter matches everything. A
/// missing attribute never matches a constraint on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeFilter {
    constraints: BTreeMap<String, serde_json::Value>,
}

impl AttributeFilter {
    /// Create an empty filter (matches all).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality constraint.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Add an equality constraint in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.constraints.insert(key.into(), value.into());
    }

    /// Check if the filter is empty (matches all).
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Iterate over `(attribute, expected value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.constraints.iter()
    }

    /// Check whether an attribute object satisfies every constraint.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.constraints
            .iter()
            .all(|(key, expected)| attributes.get(key) == Some(expected))
    }
}

impl FromIterator<(String, serde_json::Value)> for AttributeFilter {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
