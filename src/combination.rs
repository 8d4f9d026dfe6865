//! Combinations and their metrics.
//!
//! A combination assigns exactly one variant to every optimization point and is
//! evaluated as a unit by the upstream simulation. Its metrics are the *current*
//! snapshot, which a replay overwrites frame by frame.

use serde::{Deserialize, Serialize};

use crate::ids::{ComboId, PointId, VariantId};

/// One point's assignment inside a combination.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationPoint {
    pub point_id: PointId,
    pub point_name: String,
    pub variant_id: VariantId,
    pub variant_name: String,
    pub variant_text: String,
    #[serde(default)]
    pub css_selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_uplift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_win_probability: Option<f64>,
}

/// Metrics snapshot for a combination.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationMetrics {
    pub users: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub uplift: f64,
    pub win_probability: f64,
}

impl CombinationMetrics {
    /// Builds metrics from raw counts, deriving the conversion rate.
    #[must_use]
    pub fn from_counts(users: u64, conversions: u64, uplift: f64, win_probability: f64) -> Self {
        Self {
            users,
            conversions,
            conversion_rate: rate(conversions, users),
            uplift,
            win_probability,
        }
    }

    /// True for the zero-uplift baseline.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_control(&self) -> bool {
        self.uplift == 0.0
    }
}

/// `conversions / users`, or 0 when there are no users.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rate(conversions: u64, users: u64) -> f64 {
    if users == 0 {
        0.0
    } else {
        conversions as f64 / users as f64
    }
}

/// A combination with its current metrics.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combination {
    pub combo_id: ComboId,
    pub points: Vec<CombinationPoint>,
    pub metrics: CombinationMetrics,
}

impl Combination {
    /// The assignment for `point_id`, if this combination covers it.
    #[must_use]
    pub fn point(&self, point_id: &PointId) -> Option<&CombinationPoint> {
        self.points.iter().find(|p| &p.point_id == point_id)
    }

    /// The variant assigned to `point_id`.
    #[must_use]
    pub fn variant_for(&self, point_id: &PointId) -> Option<&VariantId> {
        self.point(point_id).map(|p| &p.variant_id)
    }
}
