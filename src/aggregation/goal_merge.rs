//! Goal-type filtering and the merged "all goal types" view used by the
//! metrics panel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combination::rate;
use crate::ids::{PointId, VariantId};

/// Goal type label used for merged rows.
pub const ALL_GOAL_TYPES: &str = "all";

/// Raw metric row for one variant under one goal type.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantGoalMetric {
    pub variant_id: VariantId,
    pub point_id: PointId,
    pub goal_type: String,
    pub users: u64,
    pub conversions: u64,
    pub confidence: f64,
}

/// Output row of the metric filter.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMetricSummary {
    pub variant_id: VariantId,
    pub point_id: PointId,
    pub goal_type: String,
    pub users: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub confidence: f64,
}

/// Goal-type selection for the metrics panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalTypeFilter {
    /// Merge every goal type per variant.
    All,
    /// Keep rows of this goal type only.
    Only(String),
}

impl GoalTypeFilter {
    /// `"all"` (or empty) merges, anything else filters.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | ALL_GOAL_TYPES => Self::All,
            other => Self::Only(other.to_string()),
        }
    }
}

/// Applies `filter` to raw per-goal-type rows.
///
/// A specific goal type is a plain filter preserving input order. `All`
/// aggregates per variant; the output is sorted by variant id and does not
/// depend on input order.
#[must_use]
pub fn filter_metrics(rows: &[VariantGoalMetric], filter: &GoalTypeFilter) -> Vec<VariantMetricSummary> {
    match filter {
        GoalTypeFilter::Only(goal_type) => rows
            .iter()
            .filter(|r| &r.goal_type == goal_type)
            .map(|r| VariantMetricSummary {
                variant_id: r.variant_id.clone(),
                point_id: r.point_id.clone(),
                goal_type: r.goal_type.clone(),
                users: r.users,
                conversions: r.conversions,
                conversion_rate: rate(r.conversions, r.users),
                confidence: r.confidence,
            })
            .collect(),
        GoalTypeFilter::All => merge_all_goal_types(rows),
    }
}

/// Merges all goal types per variant.
///
/// `confidence` is the users-weighted mean (weight `max(1, users)`), rounded.
#[must_use]
pub fn merge_all_goal_types(rows: &[VariantGoalMetric]) -> Vec<VariantMetricSummary> {
    let mut groups: BTreeMap<&VariantId, Vec<&VariantGoalMetric>> = BTreeMap::new();
    for row in rows {
        groups.entry(&row.variant_id).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(variant_id, mut members)| {
            // Canonical member order keeps the float sums identical under permutation.
            members.sort_by(|a, b| {
                a.point_id
                    .cmp(&b.point_id)
                    .then_with(|| a.goal_type.cmp(&b.goal_type))
                    .then_with(|| a.users.cmp(&b.users))
                    .then_with(|| a.conversions.cmp(&b.conversions))
                    .then_with(|| a.confidence.total_cmp(&b.confidence))
            });

            let users: u64 = members.iter().map(|m| m.users).sum();
            let conversions: u64 = members.iter().map(|m| m.conversions).sum();

            let mut weighted = 0.0;
            let mut weights = 0.0;
            for m in &members {
                #[allow(clippy::cast_precision_loss)]
                let w = m.users.max(1) as f64;
                weighted += m.confidence * w;
                weights += w;
            }
            let confidence = if weights > 0.0 { (weighted / weights).round() } else { 0.0 };

            VariantMetricSummary {
                variant_id: variant_id.clone(),
                point_id: members[0].point_id.clone(),
                goal_type: ALL_GOAL_TYPES.to_string(),
                users,
                conversions,
                conversion_rate: rate(conversions, users),
                confidence,
            }
        })
        .collect()
}
