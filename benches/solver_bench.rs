//! Benchmarks for SPM solver

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spm_solver::prelude::*;

fn create_tie_model() -> SpmModel {
    let mut builder = ModelBuilder::new();
    builder
        .add_stringer(Point::new(0.0, 0.0), Point::new(1000.0, 0.0), CrossSection::rectangular(150.0, 150.0), None)
        .add_constraint(Point::new(0.0, 0.0), Constraint::XY)
        .add_constraint(Point::new(1000.0, 0.0), Constraint::Y)
        .add_force(Point::new(1000.0, 0.0), Force::fx(10_000.0));
    builder.build().unwrap()
}

/// Wall of `columns` x `rows` square panels bordered by stringers, fixed at the base
fn create_wall_model(columns: usize, rows: usize) -> SpmModel {
    let size = 500.0;
    let section = CrossSection::rectangular(100.0, 150.0);
    let bars = UniaxialReinforcement::new(2, 10.0, Steel::ca50());
    let web = WebReinforcement::orthogonal(WebDirection::new(8.0, 200.0, Steel::ca50()));
    let point = |i: usize, j: usize| Point::new(i as f64 * size, j as f64 * size);

    let mut builder = ModelBuilder::new();

    for j in 0..=rows {
        for i in 0..columns {
            builder.add_stringer(point(i, j), point(i + 1, j), section, Some(bars));
        }
    }
    for j in 0..rows {
        for i in 0..=columns {
            builder.add_stringer(point(i, j), point(i, j + 1), section, Some(bars));
        }
        for i in 0..columns {
            builder.add_panel([point(i, j), point(i + 1, j), point(i + 1, j + 1), point(i, j + 1)], 100.0, web);
        }
    }

    for i in 0..=columns {
        builder.add_constraint(point(i, 0), Constraint::XY);
    }
    builder.add_force(point(0, rows), Force::fx(20_000.0 * columns as f64));

    builder.build().unwrap()
}

fn benchmark_tie(c: &mut Criterion) {
    let model = create_tie_model();
    c.bench_function("tie_linear", |b| {
        b.iter(|| {
            let output = analyze(&model, Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();
            black_box(output);
        })
    });
}

fn benchmark_small_wall(c: &mut Criterion) {
    let model = create_wall_model(2, 3);
    c.bench_function("wall_2x3_linear", |b| {
        b.iter(|| {
            let output = analyze(&model, Concrete::mcft(30.0), &AnalysisSettings::linear()).unwrap();
            black_box(output);
        })
    });
}

fn benchmark_skyline(c: &mut Criterion) {
    let model = create_wall_model(4, 8);
    let settings = AnalysisSettings::linear().with_solver(SolverKind::Skyline);
    c.bench_function("wall_4x8_linear_skyline", |b| {
        b.iter(|| {
            let output = analyze(&model, Concrete::mcft(30.0), &settings).unwrap();
            black_box(output);
        })
    });
}

fn benchmark_nonlinear(c: &mut Criterion) {
    let model = create_wall_model(2, 2);
    let settings = AnalysisSettings::nonlinear().with_load_steps(10);
    c.bench_function("wall_2x2_nonlinear", |b| {
        b.iter(|| {
            let output = analyze(&model, Concrete::mcft(30.0), &settings).unwrap();
            black_box(output);
        })
    });
}

criterion_group!(
    benches,
    benchmark_tie,
    benchmark_small_wall,
    benchmark_skyline,
    benchmark_nonlinear,
);

criterion_main!(benches);
