//! Row derivation for the by-goal and by-point views.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::combination::{rate, Combination, CombinationMetrics, CombinationPoint};
use crate::ids::{ComboId, PointId, VariantId};

use super::control::ControlIdentification;

/// One combination in the by-goal view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRow {
    /// Combination id.
    pub combo_id: ComboId,
    /// Per-point assignments, used for labels and tooltips.
    pub points: Vec<CombinationPoint>,
    /// Current metrics.
    pub metrics: CombinationMetrics,
    /// The identified control combination.
    pub is_control: bool,
}

impl CombinationRow {
    fn new(c: &Combination, control_id: Option<&ComboId>) -> Self {
        Self {
            combo_id: c.combo_id.clone(),
            points: c.points.clone(),
            metrics: c.metrics,
            is_control: control_id == Some(&c.combo_id),
        }
    }
}

/// One variant of the filtered point, aggregated over every combination that
/// assigns it.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointVariantRow {
    pub variant_id: VariantId,
    pub variant_name: String,
    pub variant_text: String,
    pub combos_count: usize,
    pub best_conversion_rate: f64,
    pub avg_conversion_rate: f64,
    pub best_win_probability: f64,
    pub best_uplift: f64,
    pub total_users: u64,
    pub total_conversions: u64,
    pub is_control: bool,
}

/// By-goal rows in both orders the host needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ByGoalRows {
    /// Win probability descending; chart and label indices follow this order.
    pub by_win_probability: Vec<CombinationRow>,
    /// Conversion rate descending; default table order.
    pub by_conversion_rate: Vec<CombinationRow>,
}

fn desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Derives the by-goal rows. Every combination is included; only the
/// combination `control` identifies is flagged as control.
#[must_use]
pub fn by_goal_rows(combinations: &[Combination], control: &ControlIdentification) -> ByGoalRows {
    let control_id = control.combo_id();
    let rows: Vec<CombinationRow> = combinations
        .iter()
        .map(|c| CombinationRow::new(c, control_id))
        .collect();

    let mut by_win_probability = rows.clone();
    by_win_probability.sort_by(|a, b| {
        desc(a.metrics.win_probability, b.metrics.win_probability)
            .then_with(|| a.combo_id.cmp(&b.combo_id))
    });

    let mut by_conversion_rate = rows;
    by_conversion_rate.sort_by(|a, b| {
        desc(a.metrics.conversion_rate, b.metrics.conversion_rate)
            .then_with(|| a.combo_id.cmp(&b.combo_id))
    });

    ByGoalRows {
        by_win_probability,
        by_conversion_rate,
    }
}

/// Groups combinations by the variant they assign to `point_id`.
///
/// Combinations that do not cover the point are skipped. Rows are sorted by
/// best conversion rate descending.
#[must_use]
pub fn by_point_rows(
    combinations: &[Combination],
    point_id: &PointId,
    control: &ControlIdentification,
) -> Vec<PointVariantRow> {
    let control_id = control.combo_id();
    let mut index: HashMap<&VariantId, usize> = HashMap::new();
    let mut rows: Vec<PointVariantRow> = Vec::new();

    for combo in combinations {
        let Some(point) = combo.point(point_id) else {
            continue;
        };
        let m = &combo.metrics;
        let is_control = control_id == Some(&combo.combo_id);

        if let Some(&i) = index.get(&point.variant_id) {
            let row = &mut rows[i];
            row.combos_count += 1;
            row.best_conversion_rate = row.best_conversion_rate.max(m.conversion_rate);
            row.best_win_probability = row.best_win_probability.max(m.win_probability);
            row.best_uplift = row.best_uplift.max(m.uplift);
            row.total_users += m.users;
            row.total_conversions += m.conversions;
            row.is_control |= is_control;
        } else {
            index.insert(&point.variant_id, rows.len());
            rows.push(PointVariantRow {
                variant_id: point.variant_id.clone(),
                variant_name: point.variant_name.clone(),
                variant_text: point.variant_text.clone(),
                combos_count: 1,
                best_conversion_rate: m.conversion_rate,
                avg_conversion_rate: 0.0,
                best_win_probability: m.win_probability,
                best_uplift: m.uplift,
                total_users: m.users,
                total_conversions: m.conversions,
                is_control,
            });
        }
    }

    for row in &mut rows {
        row.avg_conversion_rate = rate(row.total_conversions, row.total_users);
    }

    rows.sort_by(|a, b| {
        desc(a.best_conversion_rate, b.best_conversion_rate)
            .then_with(|| a.variant_id.cmp(&b.variant_id))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::control::identify_control;
    use crate::testing::{combo, sample_result};

    fn ids(rows: &[CombinationRow]) -> Vec<&str> {
        rows.iter().map(|r| r.combo_id.as_str()).collect()
    }

    #[test]
    fn by_goal_orders() {
        let result = sample_result();
        let control = identify_control(&result.combinations);
        let rows = by_goal_rows(&result.combinations, &control);
        assert_eq!(ids(&rows.by_conversion_rate), vec!["C", "B", "A"]);
        assert_eq!(ids(&rows.by_win_probability), vec!["C", "B", "A"]);
        assert!(rows.by_conversion_rate[2].is_control);
    }

    #[test]
    fn by_goal_orders_can_differ() {
        let combos = vec![
            combo("A", &[("hero", "h1")], 100, 10, 0.0, 0.7),
            combo("B", &[("hero", "h2")], 100, 30, 2.0, 0.3),
        ];
        let rows = by_goal_rows(&combos, &identify_control(&combos));
        assert_eq!(ids(&rows.by_conversion_rate), vec!["B", "A"]);
        assert_eq!(ids(&rows.by_win_probability), vec!["A", "B"]);
    }

    #[test]
    fn ties_break_by_id() {
        let combos = vec![
            combo("Z", &[("hero", "h1")], 10, 1, 0.1, 0.5),
            combo("M", &[("hero", "h2")], 10, 1, 0.1, 0.5),
        ];
        let rows = by_goal_rows(&combos, &identify_control(&combos));
        assert_eq!(ids(&rows.by_conversion_rate), vec!["M", "Z"]);
        assert_eq!(ids(&rows.by_win_probability), vec!["M", "Z"]);
    }

    #[test]
    fn by_point_groups_variants() {
        let result = sample_result();
        let control = identify_control(&result.combinations);
        let rows = by_point_rows(&result.combinations, &PointId::new("hero"), &control);

        assert_eq!(rows.len(), 2);
        let h2 = &rows[0];
        assert_eq!(h2.variant_id.as_str(), "h2");
        assert_eq!(h2.combos_count, 2);
        assert_eq!(h2.total_users, 160);
        assert_eq!(h2.total_conversions, 26);
        assert!((h2.best_conversion_rate - 0.20).abs() < 1e-12);
        assert!((h2.avg_conversion_rate - 26.0 / 160.0).abs() < 1e-12);
        assert!((h2.best_win_probability - 0.60).abs() < 1e-12);
        assert!((h2.best_uplift - 1.0).abs() < 1e-12);
        assert!(!h2.is_control);

        let h1 = &rows[1];
        assert_eq!(h1.variant_id.as_str(), "h1");
        assert!(h1.is_control);
    }

    #[test]
    fn exactly_one_row_is_control() {
        let result = sample_result();
        let control = identify_control(&result.combinations);
        for point in ["hero", "cta"] {
            let rows = by_point_rows(&result.combinations, &PointId::new(point), &control);
            assert_eq!(rows.iter().filter(|r| r.is_control).count(), 1, "point {point}");
        }
    }

    #[test]
    fn avg_rate_is_zero_without_users() {
        let combos = vec![
            combo("A", &[("hero", "h1")], 0, 0, 0.0, 0.0),
            combo("B", &[("hero", "h1")], 0, 0, 0.3, 0.0),
        ];
        let control = identify_control(&combos);
        let rows = by_point_rows(&combos, &PointId::new("hero"), &control);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_conversion_rate, 0.0);
        assert!(rows[0].is_control);
    }

    #[test]
    fn unknown_point_yields_no_rows() {
        let result = sample_result();
        let control = identify_control(&result.combinations);
        assert!(by_point_rows(&result.combinations, &PointId::new("footer"), &control).is_empty());
    }

    #[test]
    fn no_control_row_without_identified_control() {
        let combos = vec![
            combo("A", &[("hero", "h1")], 10, 1, 0.0, 0.2),
            combo("B", &[("hero", "h2")], 10, 2, 0.0, 0.8),
        ];
        let control = identify_control(&combos);
        let rows = by_point_rows(&combos, &PointId::new("hero"), &control);
        assert!(rows.iter().all(|r| !r.is_control));
    }

    #[test]
    fn by_goal_flags_no_control_when_ambiguous() {
        let combos = vec![
            combo("A", &[("hero", "h1")], 100, 10, 0.0, 0.2),
            combo("B", &[("hero", "h2")], 100, 20, 0.0, 0.8),
            combo("C", &[("hero", "h3")], 100, 15, 0.5, 0.4),
        ];
        let control = identify_control(&combos);
        assert!(control.combo_id().is_none());

        let rows = by_goal_rows(&combos, &control);
        assert!(rows.by_conversion_rate.iter().all(|r| !r.is_control));
        assert!(rows.by_win_probability.iter().all(|r| !r.is_control));
    }
}
