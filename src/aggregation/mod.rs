//! Aggregation of combination metrics into the by-goal and by-point views.
//!
//! Everything here is pure: the engine takes a snapshot of combinations plus a
//! filter selection and returns freshly computed rows and KPIs. It is called
//! once after a load and again after every replayed frame.

pub mod control;
pub mod display;
pub mod goal_merge;
pub mod kpi;
pub mod rows;
pub mod view;

pub use control::{identify_control, ControlIdentification};
pub use display::{rate_figure, uplift_figure, Figure, UNAVAILABLE};
pub use goal_merge::{filter_metrics, merge_all_goal_types, GoalTypeFilter, VariantGoalMetric, VariantMetricSummary};
pub use kpi::{by_goal_kpis, by_point_kpis, Kpis};
pub use rows::{by_goal_rows, by_point_rows, ByGoalRows, CombinationRow, PointVariantRow};
pub use view::{PointFilter, ViewMode, ViewSelection};

use serde::{Deserialize, Serialize};

use crate::combination::{Combination, CombinationMetrics};
use crate::config::DashboardConfig;
use crate::ids::PointId;

/// Rows of the active view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewRows {
    /// Combination rows.
    ByGoal(ByGoalRows),
    /// Variant rows of one point.
    ByPoint {
        /// The filtered point.
        point_id: PointId,
        /// Variant rows, best conversion rate first.
        rows: Vec<PointVariantRow>,
    },
}

/// Everything derived from one snapshot of combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedView {
    /// Selection this view was computed for.
    pub selection: ViewSelection,
    /// Control lookup outcome.
    pub control: ControlIdentification,
    /// Current metrics of the control combination.
    pub control_metrics: Option<CombinationMetrics>,
    /// Rows of the active view.
    pub rows: ViewRows,
    /// Headline figures.
    pub kpis: Kpis,
}

impl AggregatedView {
    /// Mode of the active view.
    #[must_use]
    pub const fn mode(&self) -> ViewMode {
        match self.rows {
            ViewRows::ByGoal(_) => ViewMode::ByGoal,
            ViewRows::ByPoint { .. } => ViewMode::ByPoint,
        }
    }

    /// Number of rows in table order.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.rows {
            ViewRows::ByGoal(rows) => rows.by_conversion_rate.len(),
            ViewRows::ByPoint { rows, .. } => rows.len(),
        }
    }

    /// True when the view has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stateless aggregation engine.
#[derive(Debug, Clone, Copy)]
pub struct AggregationEngine {
    min_display_users: u64,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

impl AggregationEngine {
    /// Creates an engine using the configured display threshold.
    #[must_use]
    pub const fn new(config: &DashboardConfig) -> Self {
        Self {
            min_display_users: config.min_display_users,
        }
    }

    /// Computes the view for `selection` over `combinations`.
    #[must_use]
    pub fn compute(&self, combinations: &[Combination], selection: &ViewSelection) -> AggregatedView {
        let control = identify_control(combinations);
        let control_combo = control.resolve(combinations);

        let (rows, kpis) = match &selection.point {
            PointFilter::All => {
                let rows = by_goal_rows(combinations, &control);
                let kpis = by_goal_kpis(&rows, control_combo, self.min_display_users);
                (ViewRows::ByGoal(rows), kpis)
            }
            PointFilter::Point(point_id) => {
                let rows = by_point_rows(combinations, point_id, &control);
                let kpis = by_point_kpis(&rows, control_combo, self.min_display_users);
                (
                    ViewRows::ByPoint {
                        point_id: point_id.clone(),
                        rows,
                    },
                    kpis,
                )
            }
        };

        tracing::trace!(
            mode = ?selection.view_mode(),
            combinations = combinations.len(),
            control = ?control.combo_id(),
            "aggregated view"
        );

        AggregatedView {
            selection: selection.clone(),
            control_metrics: control_combo.map(|c| c.metrics),
            control,
            rows,
            kpis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_result;

    #[test]
    fn compute_by_goal() {
        let result = sample_result();
        let view = AggregationEngine::default().compute(&result.combinations, &ViewSelection::default());
        assert_eq!(view.mode(), ViewMode::ByGoal);
        assert_eq!(view.len(), 3);
        assert_eq!(view.control.combo_id().unwrap().as_str(), "A");
        assert_eq!(view.control_metrics.unwrap().users, 100);
        assert_eq!(view.kpis.users_for_uplift, 40);
    }

    #[test]
    fn compute_by_point() {
        let result = sample_result();
        let sel = ViewSelection::default().with_point("cta");
        let view = AggregationEngine::default().compute(&result.combinations, &sel);
        assert_eq!(view.mode(), ViewMode::ByPoint);
        let ViewRows::ByPoint { point_id, rows } = &view.rows else {
            panic!("expected by-point rows");
        };
        assert_eq!(point_id.as_str(), "cta");
        // c2 only in C (0.20), c1 in A and B (best 0.15)
        assert_eq!(rows[0].variant_id.as_str(), "c2");
        assert_eq!(rows[1].variant_id.as_str(), "c1");
        assert!(rows[1].is_control);
    }

    #[test]
    fn compute_over_nothing() {
        let view = AggregationEngine::default().compute(&[], &ViewSelection::default());
        assert!(view.is_empty());
        assert!(view.control_metrics.is_none());
        assert_eq!(view.kpis, Kpis::default());
    }
}
