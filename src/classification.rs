//! Winner, loser and control badges over a ranked table.
//!
//! Badges track *position* in the list as the host currently orders it; nothing
//! here re-sorts. The first row is the winner and the bottom
//! `floor(len * loser_fraction)` rows are losers.

use serde::{Deserialize, Serialize};

use crate::aggregation::{uplift_figure, rate_figure, AggregatedView, CombinationRow, Figure, PointVariantRow, ViewRows};
use crate::config::DashboardConfig;

/// A row that can be badged and displayed.
pub trait RankedRow {
    /// Whether the row is the control (by-goal: zero uplift; by-point: flag).
    fn is_control_row(&self) -> bool;
    /// Users backing the row's figures.
    fn backing_users(&self) -> u64;
    /// Conversion rate shown in the table.
    fn display_conversion_rate(&self) -> f64;
    /// Win probability shown in the table.
    fn display_win_probability(&self) -> f64;
    /// Uplift shown in the table.
    fn display_uplift(&self) -> f64;
}

impl RankedRow for CombinationRow {
    fn is_control_row(&self) -> bool {
        self.is_control
    }

    fn backing_users(&self) -> u64 {
        self.metrics.users
    }

    fn display_conversion_rate(&self) -> f64 {
        self.metrics.conversion_rate
    }

    fn display_win_probability(&self) -> f64 {
        self.metrics.win_probability
    }

    fn display_uplift(&self) -> f64 {
        self.metrics.uplift
    }
}

impl RankedRow for PointVariantRow {
    fn is_control_row(&self) -> bool {
        self.is_control
    }

    fn backing_users(&self) -> u64 {
        self.total_users
    }

    fn display_conversion_rate(&self) -> f64 {
        self.best_conversion_rate
    }

    fn display_win_probability(&self) -> f64 {
        self.best_win_probability
    }

    fn display_uplift(&self) -> f64 {
        self.best_uplift
    }
}

/// Number of rows flagged as losers in a list of `len` rows.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn loser_count(len: usize, loser_fraction: f64) -> usize {
    ((len as f64) * loser_fraction).floor().max(0.0) as usize
}

/// True for the first row of a non-empty list.
#[must_use]
pub const fn is_winner(index: usize, len: usize) -> bool {
    len > 0 && index == 0
}

/// True when 1-based `rank` falls in the bottom `loser_fraction` of the list.
#[must_use]
pub fn is_loser(rank: usize, len: usize, loser_fraction: f64) -> bool {
    rank >= 1 && rank <= len && rank > len.saturating_sub(loser_count(len, loser_fraction))
}

/// Control badge.
#[must_use]
pub fn is_control<R: RankedRow>(row: &R) -> bool {
    row.is_control_row()
}

/// Badges for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFlags {
    /// 1-based position.
    pub rank: usize,
    /// First row.
    pub is_winner: bool,
    /// In the bottom share.
    pub is_loser: bool,
    /// Control row.
    pub is_control: bool,
}

/// Display-ready figures for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowDisplay {
    /// Conversion rate, if enough users.
    pub conversion_rate: Figure,
    /// Win probability, if enough users.
    pub win_probability: Figure,
    /// Uplift, if enough users and not the control.
    pub uplift: Figure,
}

/// A row with its badges and display figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRow<R> {
    /// The underlying row.
    pub row: R,
    /// Badges.
    pub flags: RowFlags,
    /// Display figures.
    pub display: RowDisplay,
}

/// Classified table for the active view, in table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "rows", rename_all = "snake_case")]
pub enum ClassifiedTable {
    /// By-goal table (conversion rate descending).
    ByGoal(Vec<ClassifiedRow<CombinationRow>>),
    /// By-point table (best conversion rate descending).
    ByPoint(Vec<ClassifiedRow<PointVariantRow>>),
}

impl ClassifiedTable {
    /// Flags in table order.
    #[must_use]
    pub fn flags(&self) -> Vec<RowFlags> {
        match self {
            Self::ByGoal(rows) => rows.iter().map(|r| r.flags).collect(),
            Self::ByPoint(rows) => rows.iter().map(|r| r.flags).collect(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::ByGoal(rows) => rows.len(),
            Self::ByPoint(rows) => rows.len(),
        }
    }

    /// True when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stateless classifier.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationEngine {
    loser_fraction: f64,
    min_display_users: u64,
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::new(&DashboardConfig::default())
    }
}

impl ClassificationEngine {
    /// Creates a classifier from configuration.
    #[must_use]
    pub const fn new(config: &DashboardConfig) -> Self {
        Self {
            loser_fraction: config.loser_fraction,
            min_display_users: config.min_display_users,
        }
    }

    /// Badges `rows` in the order given.
    #[must_use]
    pub fn classify<R: RankedRow + Clone>(&self, rows: &[R]) -> Vec<ClassifiedRow<R>> {
        let len = rows.len();
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let rank = index + 1;
                let control = is_control(row);
                let users = row.backing_users();
                ClassifiedRow {
                    row: row.clone(),
                    flags: RowFlags {
                        rank,
                        is_winner: is_winner(index, len),
                        is_loser: is_loser(rank, len, self.loser_fraction),
                        is_control: control,
                    },
                    display: RowDisplay {
                        conversion_rate: rate_figure(row.display_conversion_rate(), users, self.min_display_users),
                        win_probability: rate_figure(row.display_win_probability(), users, self.min_display_users),
                        uplift: uplift_figure(row.display_uplift(), users, control, self.min_display_users),
                    },
                }
            })
            .collect()
    }

    /// Classifies the view's rows in table order.
    #[must_use]
    pub fn classify_view(&self, view: &AggregatedView) -> ClassifiedTable {
        match &view.rows {
            ViewRows::ByGoal(rows) => ClassifiedTable::ByGoal(self.classify(&rows.by_conversion_rate)),
            ViewRows::ByPoint { rows, .. } => ClassifiedTable::ByPoint(self.classify(rows)),
        }
    }
}
