//! Headline KPI computation.

use serde::{Deserialize, Serialize};

use crate::combination::Combination;

use super::display::{rate_figure, uplift_figure, Figure};
use super::rows::{ByGoalRows, PointVariantRow};

/// KPI scalars exposed to the host, each with its unavailable sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kpis {
    /// Control conversion rate.
    pub control_cr: Figure,
    /// Conversion rate of the top row in the active view.
    pub best_cr: Figure,
    /// Uplift of the top row over control.
    pub uplift: Figure,
    /// Users backing `best_cr`.
    pub users_for_uplift: u64,
}

fn control_cr(control: Option<&Combination>, min_users: u64) -> Figure {
    control.map_or(Figure::Unavailable, |c| {
        rate_figure(c.metrics.conversion_rate, c.metrics.users, min_users)
    })
}

/// KPIs for the by-goal view.
///
/// The top row is the first in table order (conversion rate descending); its
/// uplift is taken as supplied by the simulation.
#[must_use]
pub fn by_goal_kpis(rows: &ByGoalRows, control: Option<&Combination>, min_users: u64) -> Kpis {
    let control_cr = control_cr(control, min_users);
    let Some(top) = rows.by_conversion_rate.first() else {
        return Kpis {
            control_cr,
            ..Kpis::default()
        };
    };

    let users = top.metrics.users;
    let uplift = if control.is_some() {
        uplift_figure(top.metrics.uplift, users, top.is_control, min_users)
    } else {
        Figure::Unavailable
    };

    Kpis {
        control_cr,
        best_cr: rate_figure(top.metrics.conversion_rate, users, min_users),
        uplift,
        users_for_uplift: users,
    }
}

/// KPIs for the by-point view.
///
/// Uplift is recomputed from the best variant's rate relative to the control
/// combination's rate, and is 0 when the control rate is 0.
#[must_use]
pub fn by_point_kpis(rows: &[PointVariantRow], control: Option<&Combination>, min_users: u64) -> Kpis {
    let control_cr_figure = control_cr(control, min_users);
    let Some(top) = rows.first() else {
        return Kpis {
            control_cr: control_cr_figure,
            ..Kpis::default()
        };
    };

    let users = top.total_users;
    let best = top.best_conversion_rate;
    let uplift = match control {
        Some(c) => {
            let base = c.metrics.conversion_rate;
            let raw = if base > 0.0 { (best - base) / base } else { 0.0 };
            uplift_figure(raw, users, top.is_control, min_users)
        }
        None => Figure::Unavailable,
    };

    Kpis {
        control_cr: control_cr_figure,
        best_cr: rate_figure(best, users, min_users),
        uplift,
        users_for_uplift: users,
    }
}
