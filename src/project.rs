//! Project-level types owned by the external project service.
//!
//! The replay engine only reads these; creating and editing them happens
//! elsewhere.

use serde::{Deserialize, Serialize};

use crate::ids::{GoalId, PointId, VariantId};

/// A page element under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPoint {
    /// Point identifier.
    pub id: PointId,
    /// Human-readable name.
    pub name: String,
    /// CSS selector of the element on the page.
    pub css_selector: String,
}

/// A candidate copy for one point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Variant identifier.
    pub id: VariantId,
    /// Owning point.
    pub point_id: PointId,
    /// Copy text.
    pub text: String,
}

/// A conversion objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Goal identifier.
    pub id: GoalId,
    /// Goal type, e.g. `"click"` or `"form_submit"`.
    #[serde(rename = "type")]
    pub goal_type: String,
    /// Whether this goal is the default filter selection.
    #[serde(default)]
    pub is_primary: bool,
}

impl Goal {
    /// Returns the primary goal, or the first goal when none is flagged.
    #[must_use]
    pub fn primary(goals: &[Self]) -> Option<&Self> {
        goals.iter().find(|g| g.is_primary).or_else(|| goals.first())
    }
}
