//! Shared fixtures for unit tests.

use crate::combination::{Combination, CombinationMetrics, CombinationPoint};
use crate::frame::{FrameCombo, SimulationFrame};
use crate::ids::{ComboId, PointId, VariantId};
use crate::result::SimulationResult;

/// Builds a combination from `(point_id, variant_id)` assignments.
pub fn combo(
    id: &str,
    assignments: &[(&str, &str)],
    users: u64,
    conversions: u64,
    uplift: f64,
    win_probability: f64,
) -> Combination {
    Combination {
        combo_id: ComboId::new(id),
        points: assignments
            .iter()
            .map(|(point, variant)| CombinationPoint {
                point_id: PointId::new(*point),
                point_name: format!("{point} element"),
                variant_id: VariantId::new(*variant),
                variant_name: format!("Variant {variant}"),
                variant_text: format!("{point} copy {variant}"),
                css_selector: format!("#{point}"),
                point_uplift: None,
                point_win_probability: None,
            })
            .collect(),
        metrics: CombinationMetrics::from_counts(users, conversions, uplift, win_probability),
    }
}

/// Three combinations over two points, A being the control:
///
/// | combo | hero | cta | users | conv | cr   | uplift | win p |
/// |-------|------|-----|-------|------|------|--------|-------|
/// | A     | h1   | c1  | 100   | 10   | 0.10 | 0.0    | 0.05  |
/// | B     | h2   | c1  | 120   | 18   | 0.15 | 0.5    | 0.35  |
/// | C     | h2   | c2  | 40    | 8    | 0.20 | 1.0    | 0.60  |
///
/// The last of the three frames equals the final metrics.
pub fn sample_result() -> SimulationResult {
    let combinations = vec![
        combo("A", &[("hero", "h1"), ("cta", "c1")], 100, 10, 0.0, 0.05),
        combo("B", &[("hero", "h2"), ("cta", "c1")], 120, 18, 0.5, 0.35),
        combo("C", &[("hero", "h2"), ("cta", "c2")], 40, 8, 1.0, 0.60),
    ];
    let frames = vec![
        SimulationFrame {
            day: 1,
            combos: vec![
                FrameCombo::from_counts("A", 30, 2, 0.0, 0.30),
                FrameCombo::from_counts("B", 35, 4, 0.4, 0.35),
                FrameCombo::from_counts("C", 12, 2, 0.8, 0.35),
            ],
        },
        SimulationFrame {
            day: 2,
            combos: vec![
                FrameCombo::from_counts("A", 65, 6, 0.0, 0.15),
                FrameCombo::from_counts("B", 80, 11, 0.45, 0.40),
                FrameCombo::from_counts("C", 26, 5, 0.9, 0.45),
            ],
        },
        SimulationFrame {
            day: 3,
            combos: vec![
                FrameCombo::from_counts("A", 100, 10, 0.0, 0.05),
                FrameCombo::from_counts("B", 120, 18, 0.5, 0.35),
                FrameCombo::from_counts("C", 40, 8, 1.0, 0.60),
            ],
        },
    ];
    let control_metrics = combinations[0].metrics;
    SimulationResult {
        id: None,
        combinations,
        frames,
        control_metrics,
    }
}
