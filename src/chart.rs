//! Chart series payloads for the external charting surface.
//!
//! Two payloads are produced from a view: a time-indexed line chart (one point
//! per replayed day) and a ranked bar chart of the top rows by win probability.
//! Values are fractions; the charting surface formats them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregation::{AggregatedView, CombinationRow, PointVariantRow, ViewRows};
use crate::combination::{rate, Combination};
use crate::config::DashboardConfig;
use crate::frame::SimulationFrame;
use crate::ids::{ComboId, PointId, VariantId};

/// Name of the control line.
pub const CONTROL_SERIES: &str = "Control";
/// Name of the best-combination line in the by-goal view.
pub const BEST_SERIES: &str = "Best combination";

/// What a line represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesKind {
    /// The control combination or the control's variant.
    Control,
    /// The best non-control combination.
    BestCombination {
        /// Combination tracked by the line.
        combo_id: ComboId,
    },
    /// One non-control variant of the filtered point.
    Variant {
        /// Variant tracked by the line.
        variant_id: VariantId,
    },
}

/// A line of conversion rates, one value per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    /// Legend label.
    pub name: String,
    /// What the line tracks.
    pub kind: SeriesKind,
    /// One value per entry of `LineChart::days`; `None` where no data exists.
    pub values: Vec<Option<f64>>,
}

/// Time-indexed conversion-rate chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineChart {
    /// X axis. Day 0 stands for the loaded snapshot when no frames exist.
    pub days: Vec<u32>,
    /// Lines, control first.
    pub series: Vec<LineSeries>,
}

/// One tooltip line: which copy a bar uses for one point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLine {
    /// Point name.
    pub point_name: String,
    /// Variant name.
    pub variant_name: String,
    /// Full variant text.
    pub variant_text: String,
}

/// One ranked bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Short axis label.
    pub label: String,
    /// Win probability.
    pub value: f64,
    /// Whether the bar is the control.
    pub is_control: bool,
    /// Tooltip metadata.
    pub details: Vec<LabelLine>,
}

/// Top rows by win probability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarChart {
    /// Bars, highest win probability first.
    pub bars: Vec<Bar>,
}

/// Both chart payloads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartPayload {
    /// Line chart.
    pub line: LineChart,
    /// Bar chart.
    pub bars: BarChart,
}

/// Stateless series builder.
#[derive(Debug, Clone, Copy)]
pub struct ChartSeriesBuilder {
    bar_limit: usize,
}

impl Default for ChartSeriesBuilder {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

impl ChartSeriesBuilder {
    /// Creates a builder from configuration.
    #[must_use]
    pub const fn new(config: &DashboardConfig) -> Self {
        Self {
            bar_limit: config.bar_chart_limit,
        }
    }

    /// Builds both payloads.
    ///
    /// `frames` is the history to plot: every frame for a static view, the
    /// frames applied so far during a replay.
    #[must_use]
    pub fn build(
        &self,
        view: &AggregatedView,
        combinations: &[Combination],
        frames: &[SimulationFrame],
    ) -> ChartPayload {
        ChartPayload {
            line: self.line_chart(view, combinations, frames),
            bars: self.bar_chart(view, combinations),
        }
    }

    /// Builds the line chart.
    #[must_use]
    pub fn line_chart(
        &self,
        view: &AggregatedView,
        combinations: &[Combination],
        frames: &[SimulationFrame],
    ) -> LineChart {
        let points = history(combinations, frames);
        let days = points.iter().map(|p| p.day).collect();

        let series = match &view.rows {
            ViewRows::ByGoal(rows) => {
                goal_lines(view.control.combo_id(), &rows.by_win_probability, &points)
            }
            ViewRows::ByPoint { point_id, rows } => point_lines(point_id, rows, combinations, &points),
        };

        LineChart { days, series }
    }

    /// Builds the ranked bar chart. `combinations` supply the point name for
    /// by-point tooltips.
    #[must_use]
    pub fn bar_chart(&self, view: &AggregatedView, combinations: &[Combination]) -> BarChart {
        let bars = match &view.rows {
            ViewRows::ByGoal(rows) => rows
                .by_win_probability
                .iter()
                .take(self.bar_limit)
                .map(combination_bar)
                .collect(),
            ViewRows::ByPoint { point_id, rows } => {
                let point_name = combinations
                    .iter()
                    .find_map(|c| c.point(point_id))
                    .map(|p| p.point_name.as_str())
                    .unwrap_or_default();
                let mut ranked: Vec<&PointVariantRow> = rows.iter().collect();
                ranked.sort_by(|a, b| {
                    b.best_win_probability
                        .total_cmp(&a.best_win_probability)
                        .then_with(|| a.variant_id.cmp(&b.variant_id))
                });
                ranked
                    .into_iter()
                    .take(self.bar_limit)
                    .map(|row| variant_bar(point_name, row))
                    .collect()
            }
        };
        BarChart { bars }
    }
}

/// Per-day `(users, conversions)` by combination.
struct DayPoint {
    day: u32,
    counts: HashMap<ComboId, (u64, u64)>,
}

fn history(combinations: &[Combination], frames: &[SimulationFrame]) -> Vec<DayPoint> {
    if frames.is_empty() {
        if combinations.is_empty() {
            return Vec::new();
        }
        let counts = combinations
            .iter()
            .map(|c| (c.combo_id.clone(), (c.metrics.users, c.metrics.conversions)))
            .collect();
        return vec![DayPoint { day: 0, counts }];
    }

    frames
        .iter()
        .map(|f| DayPoint {
            day: f.day,
            counts: f
                .combos
                .iter()
                .map(|c| (c.combo_id.clone(), (c.users, c.conversions)))
                .collect(),
        })
        .collect()
}

fn combo_line(points: &[DayPoint], combo_id: &ComboId) -> Vec<Option<f64>> {
    points
        .iter()
        .map(|p| p.counts.get(combo_id).map(|&(users, conv)| rate(conv, users)))
        .collect()
}

fn goal_lines(
    control_id: Option<&ComboId>,
    by_win_probability: &[CombinationRow],
    points: &[DayPoint],
) -> Vec<LineSeries> {
    let mut out = Vec::with_capacity(2);

    if let Some(id) = control_id {
        out.push(LineSeries {
            name: CONTROL_SERIES.to_string(),
            kind: SeriesKind::Control,
            values: combo_line(points, id),
        });
    }

    if let Some(best) = by_win_probability
        .iter()
        .find(|r| Some(&r.combo_id) != control_id)
    {
        out.push(LineSeries {
            name: BEST_SERIES.to_string(),
            kind: SeriesKind::BestCombination {
                combo_id: best.combo_id.clone(),
            },
            values: combo_line(points, &best.combo_id),
        });
    }

    out
}

fn point_lines(
    point_id: &PointId,
    rows: &[PointVariantRow],
    combinations: &[Combination],
    points: &[DayPoint],
) -> Vec<LineSeries> {
    let mut members: HashMap<&VariantId, Vec<&ComboId>> = HashMap::new();
    for combo in combinations {
        if let Some(variant) = combo.variant_for(point_id) {
            members.entry(variant).or_default().push(&combo.combo_id);
        }
    }

    let variant_line = |variant_id: &VariantId| -> Vec<Option<f64>> {
        let ids = members.get(variant_id).map(Vec::as_slice).unwrap_or_default();
        points
            .iter()
            .map(|p| {
                let mut users = 0u64;
                let mut conv = 0u64;
                let mut seen = false;
                for id in ids {
                    if let Some(&(u, c)) = p.counts.get(*id) {
                        users += u;
                        conv += c;
                        seen = true;
                    }
                }
                seen.then(|| rate(conv, users))
            })
            .collect()
    };

    let mut out = Vec::with_capacity(rows.len());
    if let Some(control) = rows.iter().find(|r| r.is_control) {
        out.push(LineSeries {
            name: CONTROL_SERIES.to_string(),
            kind: SeriesKind::Control,
            values: variant_line(&control.variant_id),
        });
    }
    for row in rows.iter().filter(|r| !r.is_control) {
        out.push(LineSeries {
            name: row.variant_name.clone(),
            kind: SeriesKind::Variant {
                variant_id: row.variant_id.clone(),
            },
            values: variant_line(&row.variant_id),
        });
    }
    out
}

fn combination_bar(row: &CombinationRow) -> Bar {
    Bar {
        label: row.combo_id.to_string(),
        value: row.metrics.win_probability,
        is_control: row.is_control,
        details: row
            .points
            .iter()
            .map(|p| LabelLine {
                point_name: p.point_name.clone(),
                variant_name: p.variant_name.clone(),
                variant_text: p.variant_text.clone(),
            })
            .collect(),
    }
}

fn variant_bar(point_name: &str, row: &PointVariantRow) -> Bar {
    Bar {
        label: row.variant_name.clone(),
        value: row.best_win_probability,
        is_control: row.is_control,
        details: vec![LabelLine {
            point_name: point_name.to_string(),
            variant_name: row.variant_name.clone(),
            variant_text: row.variant_text.clone(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{AggregationEngine, ViewSelection};
    use crate::testing::{combo, sample_result};

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-12)
    }

    #[test]
    fn by_goal_lines_track_control_and_best() {
        let result = sample_result();
        let view = AggregationEngine::default().compute(&result.combinations, &ViewSelection::default());
        let chart = ChartSeriesBuilder::default().line_chart(&view, &result.combinations, &result.frames);

        assert_eq!(chart.days, vec![1, 2, 3]);
        assert_eq!(chart.series.len(), 2);

        let control = &chart.series[0];
        assert_eq!(control.name, CONTROL_SERIES);
        assert!(approx(control.values[0], 2.0 / 30.0));
        assert!(approx(control.values[2], 0.10));

        let best = &chart.series[1];
        assert_eq!(best.name, BEST_SERIES);
        assert_eq!(best.kind, SeriesKind::BestCombination { combo_id: ComboId::new("C") });
        assert!(approx(best.values[2], 0.20));
    }

    #[test]
    fn partial_history_plots_applied_days_only() {
        let result = sample_result();
        let view = AggregationEngine::default().compute(&result.combinations, &ViewSelection::default());
        let chart = ChartSeriesBuilder::default().line_chart(&view, &result.combinations, &result.frames[..1]);
        assert_eq!(chart.days, vec![1]);
        assert!(chart.series.iter().all(|s| s.values.len() == 1));
    }

    #[test]
    fn by_point_lines_one_per_non_control_variant() {
        let result = sample_result();
        let sel = ViewSelection::default().with_point("hero");
        let view = AggregationEngine::default().compute(&result.combinations, &sel);
        let chart = ChartSeriesBuilder::default().line_chart(&view, &result.combinations, &result.frames);

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].kind, SeriesKind::Control);
        assert_eq!(
            chart.series[1].kind,
            SeriesKind::Variant { variant_id: VariantId::new("h2") }
        );
        // h2 on day 1: B (35 users, 4 conv) + C (12 users, 2 conv)
        assert!(approx(chart.series[1].values[0], 6.0 / 47.0));
    }

    #[test]
    fn no_frames_plots_snapshot_as_day_zero() {
        let result = sample_result();
        let view = AggregationEngine::default().compute(&result.combinations, &ViewSelection::default());
        let chart = ChartSeriesBuilder::default().line_chart(&view, &result.combinations, &[]);
        assert_eq!(chart.days, vec![0]);
        assert!(approx(chart.series[0].values[0], 0.10));

        let empty = ChartSeriesBuilder::default().line_chart(&view, &[], &[]);
        assert!(empty.days.is_empty());
    }

    #[test]
    fn bars_are_capped_and_ranked() {
        let combos: Vec<_> = (0..12u32)
            .map(|i| {
                let uplift = if i == 0 { 0.0 } else { 0.05 };
                combo(&format!("K{i:02}"), &[("hero", "h1")], 100, 10, uplift, f64::from(i) / 100.0)
            })
            .collect();
        let view = AggregationEngine::default().compute(&combos, &ViewSelection::default());
        let bars = ChartSeriesBuilder::default().bar_chart(&view, &combos);
        assert_eq!(bars.bars.len(), 8);
        assert_eq!(bars.bars[0].label, "K11");
        assert!(bars.bars.windows(2).all(|w| w[0].value >= w[1].value));
        assert_eq!(bars.bars[0].details[0].variant_text, "hero copy h1");
    }

    #[test]
    fn by_point_bars_rank_by_best_win_probability() {
        let result = sample_result();
        let sel = ViewSelection::default().with_point("cta");
        let view = AggregationEngine::default().compute(&result.combinations, &sel);
        let bars = ChartSeriesBuilder::default().bar_chart(&view, &result.combinations);
        assert_eq!(bars.bars.len(), 2);
        assert_eq!(bars.bars[0].label, "Variant c2");
        assert!(bars.bars[1].is_control);
    }

    #[test]
    fn by_point_bar_details_name_the_point() {
        let result = sample_result();
        let sel = ViewSelection::default().with_point("hero");
        let view = AggregationEngine::default().compute(&result.combinations, &sel);
        let bars = ChartSeriesBuilder::default().bar_chart(&view, &result.combinations);

        assert!(bars.bars.iter().all(|b| b.details.len() == 1));
        let details = &bars.bars[0].details[0];
        assert_eq!(details.point_name, "hero element");
        assert_eq!(details.variant_name, "Variant h2");
        assert_eq!(details.variant_text, "hero copy h2");
    }
}
