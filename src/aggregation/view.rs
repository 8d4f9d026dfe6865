//! Filter selection and the view mode it implies.

use serde::{Deserialize, Serialize};

use crate::ids::{GoalId, PointId};
use crate::project::Goal;

/// Which aggregation the host is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Combination-level rows.
    ByGoal,
    /// Variant-level rows for one point.
    ByPoint,
}

/// Point filter as selected in the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointFilter {
    /// No point filter (`"all"` or unset).
    #[default]
    All,
    /// A single point.
    Point(PointId),
}

impl PointFilter {
    /// Interprets the raw UI value: `"all"`, empty, or `None` mean no filter.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("" | "all") => Self::All,
            Some(id) => Self::Point(PointId::new(id)),
        }
    }

    /// The filtered point, if any.
    #[must_use]
    pub const fn point_id(&self) -> Option<&PointId> {
        match self {
            Self::All => None,
            Self::Point(id) => Some(id),
        }
    }
}

/// Goal and point filter selection.
///
/// The goal only decides which simulation is loaded upstream; it never filters
/// rows here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSelection {
    /// Selected goal.
    pub goal_id: Option<GoalId>,
    /// Selected point filter.
    pub point: PointFilter,
}

impl ViewSelection {
    /// Selection with the primary goal and no point filter.
    #[must_use]
    pub fn default_for(goals: &[Goal]) -> Self {
        Self {
            goal_id: Goal::primary(goals).map(|g| g.id.clone()),
            point: PointFilter::All,
        }
    }

    /// Same selection restricted to one point.
    #[must_use]
    pub fn with_point(mut self, point_id: impl Into<PointId>) -> Self {
        self.point = PointFilter::Point(point_id.into());
        self
    }

    /// `ByGoal` without a point filter, `ByPoint` otherwise.
    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        match self.point {
            PointFilter::All => ViewMode::ByGoal,
            PointFilter::Point(_) => ViewMode::ByPoint,
        }
    }
}
