//! Benchmark turn synthesis on straight and curved passes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uturn_core::geometry::inward_offset_polygon;
use uturn_core::*;

fn square_field(opts: &TurnOptions) -> FieldGeometry {
    let b = Boundary::new(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(400.0, 0.0),
        Vec2::new(400.0, 400.0),
        Vec2::new(0.0, 400.0),
    ]);
    FieldGeometry::build(b, opts).expect("square field")
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    for tool_width in [3.0, 6.0, 18.0] {
        let opts = TurnOptions { tool_width, turn_radius: 7.0, headland_width: 24.0, ..TurnOptions::default() };
        let field = square_field(&opts);
        let track = Track::ab_line("ab", Vec2::new(200.0, 0.0), Vec2::new(200.0, 400.0));
        let next = next_track(&track, 0, false, true, &opts).expect("next track");
        group.bench_with_input(BenchmarkId::new("ab_line", tool_width), &tool_width, |b, _| {
            b.iter(|| {
                let req = TurnRequest {
                    pose: Vec3::new(200.0, 330.0, 0.0),
                    track: &track,
                    field: &field,
                    next: &next,
                    is_turn_left: false,
                    is_heading_same_way: true,
                    options: &opts,
                };
                black_box(synthesize(black_box(&req)).ok())
            })
        });
    }

    let opts = TurnOptions { headland_width: 24.0, ..TurnOptions::default() };
    let field = square_field(&opts);
    let points: Vec<Vec3> = (0..=80)
        .map(|k| {
            let n = 5.0 * k as f64;
            Vec3::new(200.0 + 15.0 * (n / 60.0).sin(), n, 0.0)
        })
        .collect();
    let curve = Track::curve("wave", points);
    let next = next_track(&curve, 0, true, true, &opts).expect("next track");
    group.bench_function("curve", |b| {
        b.iter(|| {
            let req = TurnRequest {
                pose: Vec3::new(200.0 + 15.0 * (300.0f64 / 60.0).sin(), 300.0, 0.0),
                track: &curve,
                field: &field,
                next: &next,
                is_turn_left: true,
                is_heading_same_way: true,
                options: &opts,
            };
            black_box(synthesize(black_box(&req)).ok())
        })
    });
    group.finish();
}

fn bench_headland(c: &mut Criterion) {
    let ring: Vec<Vec2> = (0..360)
        .map(|k| {
            let a = (k as f64).to_radians();
            Vec2::new(500.0 + 300.0 * a.sin(), 500.0 + 220.0 * a.cos())
        })
        .collect();
    c.bench_function("headland_offset_360", |b| b.iter(|| black_box(inward_offset_polygon(black_box(&ring), 18.0))));
}

criterion_group!(benches, bench_synthesize, bench_headland);
criterion_main!(benches);
