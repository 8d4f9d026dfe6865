#![allow(dead_code)]

use std::time::Duration;

use uplift_replay::{
    Combination, CombinationMetrics, CombinationPoint, ComboId, FrameCombo, PointId, ReplayEvent, ReplayStream,
    SimulationFrame, SimulationResult, VariantId,
};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn combo(id: &str, assignments: &[(&str, &str)], users: u64, conversions: u64, uplift: f64, win: f64) -> Combination {
    Combination {
        combo_id: ComboId::new(id),
        points: assignments
            .iter()
            .map(|(point, variant)| CombinationPoint {
                point_id: PointId::new(*point),
                point_name: format!("{point} block"),
                variant_id: VariantId::new(*variant),
                variant_name: format!("Variant {variant}"),
                variant_text: format!("{point} text {variant}"),
                css_selector: format!(".{point}"),
                point_uplift: None,
                point_win_probability: None,
            })
            .collect(),
        metrics: CombinationMetrics::from_counts(users, conversions, uplift, win),
    }
}

/// Result with `days` frames ramping linearly up to the final metrics.
pub fn ramped_result(combinations: Vec<Combination>, days: u32) -> SimulationResult {
    let frames = (1..=days)
        .map(|day| SimulationFrame {
            day,
            combos: combinations
                .iter()
                .map(|c| {
                    let m = c.metrics;
                    FrameCombo::from_counts(
                        c.combo_id.clone(),
                        m.users * u64::from(day) / u64::from(days),
                        m.conversions * u64::from(day) / u64::from(days),
                        m.uplift,
                        m.win_probability,
                    )
                })
                .collect(),
        })
        .collect();
    let control_metrics = combinations
        .iter()
        .find(|c| c.metrics.uplift == 0.0)
        .map(|c| c.metrics)
        .unwrap_or_default();
    SimulationResult {
        id: None,
        combinations,
        frames,
        control_metrics,
    }
}

/// The three-combination scenario: A control, B +50%, C low traffic.
pub fn scenario() -> SimulationResult {
    ramped_result(
        vec![
            combo("A", &[("headline", "h1"), ("button", "b1")], 100, 10, 0.0, 0.05),
            combo("B", &[("headline", "h2"), ("button", "b1")], 120, 18, 0.5, 0.35),
            combo("C", &[("headline", "h2"), ("button", "b2")], 40, 8, 1.0, 0.60),
        ],
        4,
    )
}

/// Collects events until a terminal one arrives.
pub fn drain_until_terminal(stream: &ReplayStream) -> Vec<ReplayEvent> {
    let mut out = Vec::new();
    loop {
        let event = stream.recv_timeout(WAIT).expect("replay event");
        let done = event.is_terminal();
        out.push(event);
        if done {
            return out;
        }
    }
}

pub fn metrics_by_id(combinations: &[Combination], id: &str) -> CombinationMetrics {
    combinations
        .iter()
        .find(|c| c.combo_id.as_str() == id)
        .map(|c| c.metrics)
        .expect("combination present")
}
