use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use uplift_replay::{
    AggregationEngine, ChartSeriesBuilder, ClassificationEngine, Combination, CombinationMetrics, CombinationPoint,
    ComboId, FrameCombo, PointId, SimulationFrame, VariantId, ViewSelection,
};

const POINTS: usize = 3;
const VARIANTS: usize = 4;
const DAYS: u32 = 30;

/// Every assignment of `VARIANTS` variants to `POINTS` points.
fn combinations() -> Vec<Combination> {
    let total = VARIANTS.pow(POINTS as u32);
    (0..total)
        .map(|n| {
            let points = (0..POINTS)
                .map(|p| {
                    let v = (n / VARIANTS.pow(p as u32)) % VARIANTS;
                    CombinationPoint {
                        point_id: PointId::new(format!("p{p}")),
                        point_name: format!("Point {p}"),
                        variant_id: VariantId::new(format!("p{p}v{v}")),
                        variant_name: format!("Variant {v}"),
                        variant_text: format!("copy {p}/{v}"),
                        css_selector: format!("#p{p}"),
                        point_uplift: None,
                        point_win_probability: None,
                    }
                })
                .collect();
            let users = 500 + (n as u64 * 37) % 400;
            let conversions = users / 10 + (n as u64 % 17);
            let uplift = if n == 0 { 0.0 } else { n as f64 / 100.0 };
            Combination {
                combo_id: ComboId::new(format!("combo-{n}")),
                points,
                metrics: CombinationMetrics::from_counts(users, conversions, uplift, (n % 10) as f64 / 10.0),
            }
        })
        .collect()
}

fn frames(combos: &[Combination]) -> Vec<SimulationFrame> {
    (1..=DAYS)
        .map(|day| SimulationFrame {
            day,
            combos: combos
                .iter()
                .map(|c| {
                    let m = c.metrics;
                    FrameCombo::from_counts(
                        c.combo_id.clone(),
                        m.users * u64::from(day) / u64::from(DAYS),
                        m.conversions * u64::from(day) / u64::from(DAYS),
                        m.uplift,
                        m.win_probability,
                    )
                })
                .collect(),
        })
        .collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let combos = combinations();
    let frames = frames(&combos);
    let aggregation = AggregationEngine::default();
    let classification = ClassificationEngine::default();
    let charts = ChartSeriesBuilder::default();

    let selections = [
        ("by_goal", ViewSelection::default()),
        ("by_point", ViewSelection::default().with_point("p1")),
    ];

    let mut group = c.benchmark_group("aggregation");
    group.throughput(Throughput::Elements(combos.len() as u64));

    for (name, selection) in &selections {
        group.bench_with_input(BenchmarkId::new("compute", name), selection, |b, sel| {
            b.iter(|| aggregation.compute(black_box(&combos), black_box(sel)));
        });

        group.bench_with_input(BenchmarkId::new("frame_update", name), selection, |b, sel| {
            b.iter(|| {
                let view = aggregation.compute(black_box(&combos), sel);
                let payload = charts.build(&view, &combos, &frames);
                black_box(payload)
            });
        });

        group.bench_with_input(BenchmarkId::new("classify", name), selection, |b, sel| {
            let view = aggregation.compute(&combos, sel);
            b.iter(|| classification.classify_view(black_box(&view)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
