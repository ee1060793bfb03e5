use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use dimsolve::prelude::*;

fn build_triangle(registry: &Arc<UnitRegistry>) -> Problem {
    let mut problem = Problem::new("resultant", registry.clone());
    let f1 = problem.known("F_1", 450.0, StandardUnit::Newton).unwrap();
    let f2 = problem.known("F_2", 700.0, StandardUnit::Newton).unwrap();
    let f_r = problem.unknown("F_R", StandardUnit::Newton).unwrap();
    let theta = problem.unknown("theta", StandardUnit::Degree).unwrap();
    let gap = Quantity::with_unit(registry, StandardUnit::Degree, 45.0).unwrap();
    let heading = Quantity::with_unit(registry, StandardUnit::Degree, 195.0).unwrap();
    problem
        .add_equation(
            "magnitude",
            &f_r,
            sqrt(f1.powf(2.0) + f2.powf(2.0) - 2.0 * &f1 * &f2 * cos(&gap)),
        )
        .unwrap();
    problem
        .add_equation("direction", &f1 * sin(&gap), &f_r * sin(Expression::from(heading) - &theta))
        .unwrap();
    problem
}

/// `x_i = x_{i-1} + 1 m`: a chain solved strictly in dependency order.
fn build_chain(registry: &Arc<UnitRegistry>, len: usize) -> Problem {
    let mut problem = Problem::new("chain", registry.clone());
    let step = Quantity::with_unit(registry, StandardUnit::Meter, 1.0).unwrap();
    let mut previous = problem.known("x_0", 0.0, StandardUnit::Meter).unwrap();
    for i in 1..=len {
        let current = problem.unknown(&format!("x_{i}"), StandardUnit::Meter).unwrap();
        problem
            .add_equation(format!("e_{i}"), &current, &previous + &step)
            .unwrap();
        previous = current;
    }
    problem
}

fn bench_solve(c: &mut Criterion) {
    let registry = initialize_registry(standard_catalog()).unwrap();
    let mut group = c.benchmark_group("problem_solve");

    group.bench_function("triangle", |b| {
        b.iter_batched(
            || build_triangle(&registry),
            |mut problem| {
                let _ = problem.solve();
            },
            BatchSize::SmallInput,
        )
    });

    for len in [16, 64] {
        group.bench_function(BenchmarkId::new("chain", len), |b| {
            b.iter_batched(
                || build_chain(&registry, len),
                |mut problem| {
                    let _ = problem.solve();
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_conversion(c: &mut Criterion) {
    let registry = initialize_registry(standard_catalog()).unwrap();
    let psi = Quantity::with_unit(&registry, StandardUnit::Psi, 1_000.0).unwrap();
    let kpa = registry.unit("kPa").unwrap();
    c.bench_function("convert_psi_kpa", |b| b.iter(|| psi.to(&registry, &kpa)));
}

criterion_group!(benches, bench_solve, bench_conversion);
criterion_main!(benches);
