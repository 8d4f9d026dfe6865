//! Daily simulation frames.
//!
//! A frame is one simulated day's metric snapshot for every combination. Frames
//! are what a replay plays back into the store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::combination::CombinationMetrics;
use crate::ids::ComboId;

/// One combination's metrics on a given day.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCombo {
    pub combo_id: ComboId,
    pub users: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub uplift: f64,
    pub win_probability: f64,
}

impl FrameCombo {
    /// Builds a frame entry from raw counts, deriving the conversion rate.
    #[must_use]
    pub fn from_counts(
        combo_id: impl Into<ComboId>,
        users: u64,
        conversions: u64,
        uplift: f64,
        win_probability: f64,
    ) -> Self {
        let m = CombinationMetrics::from_counts(users, conversions, uplift, win_probability);
        Self {
            combo_id: combo_id.into(),
            users,
            conversions,
            conversion_rate: m.conversion_rate,
            uplift,
            win_probability,
        }
    }

    /// The entry's values as a metrics snapshot.
    #[must_use]
    pub const fn metrics(&self) -> CombinationMetrics {
        CombinationMetrics {
            users: self.users,
            conversions: self.conversions,
            conversion_rate: self.conversion_rate,
            uplift: self.uplift,
            win_probability: self.win_probability,
        }
    }
}

/// One simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationFrame {
    /// Simulated day, starting at 1.
    pub day: u32,
    /// Per-combination metrics for this day.
    pub combos: Vec<FrameCombo>,
}

impl SimulationFrame {
    /// Set of combination ids this frame covers.
    #[must_use]
    pub fn combo_ids(&self) -> BTreeSet<&ComboId> {
        self.combos.iter().map(|c| &c.combo_id).collect()
    }

    /// Entry for `combo_id`, if present.
    #[must_use]
    pub fn combo(&self, combo_id: &ComboId) -> Option<&FrameCombo> {
        self.combos.iter().find(|c| &c.combo_id == combo_id)
    }
}

/// Returns the frames sorted by ascending day.
///
/// The sort is stable so frames sharing a day keep their input order.
#[must_use]
pub fn in_day_order(frames: &[SimulationFrame]) -> Vec<SimulationFrame> {
    let mut out = frames.to_vec();
    out.sort_by_key(|f| f.day);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_combo_derives_rate() {
        let c = FrameCombo::from_counts("a", 200, 30, 0.0, 0.4);
        assert!((c.conversion_rate - 0.15).abs() < 1e-12);
        assert_eq!(c.metrics().users, 200);
    }

    #[test]
    fn in_day_order_sorts_ascending() {
        let frames = vec![
            SimulationFrame { day: 3, combos: vec![] },
            SimulationFrame { day: 1, combos: vec![] },
            SimulationFrame { day: 2, combos: vec![] },
        ];
        let days: Vec<u32> = in_day_order(&frames).iter().map(|f| f.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }

    #[test]
    fn frame_lookup_by_combo() {
        let frame = SimulationFrame {
            day: 1,
            combos: vec![FrameCombo::from_counts("a", 10, 1, 0.0, 0.5)],
        };
        assert!(frame.combo(&ComboId::new("a")).is_some());
        assert!(frame.combo(&ComboId::new("b")).is_none());
        assert_eq!(frame.combo_ids().len(), 1);
    }
}
