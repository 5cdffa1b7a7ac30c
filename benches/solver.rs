use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sca_nnls::{
    solve, KktTolerance, NormalEquations, ObjectiveGap, Parallelism, SolverOptions, SweepLimit,
};

const HEIGHTS: [f64; 15] = [
    1.47, 1.50, 1.52, 1.55, 1.57, 1.60, 1.63, 1.65, 1.68, 1.70, 1.73, 1.75, 1.78, 1.80, 1.83,
];
const WEIGHTS: [f64; 15] = [
    52.21, 53.12, 54.48, 55.84, 57.20, 58.57, 59.93, 61.29, 63.11, 64.47, 66.28, 68.10, 69.92,
    72.19, 74.46,
];

fn solver_options(verbose: bool) -> SolverOptions {
    SolverOptions {
        verbose,
        report_every: 1000,
        ..SolverOptions::default()
    }
}

fn random_problem(seed: u64, m: usize, n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let a: Vec<Vec<f64>> = (0..m)
        .map(|_| (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    let b: Vec<f64> = (0..m).map(|_| rng.gen_range(-1.0..1.0)).collect();
    (a, b)
}

fn bench_height_weight(c: &mut Criterion) {
    let a: Vec<[f64; 3]> = HEIGHTS.iter().map(|&h| [h * h, h, 1.0]).collect();
    let opts_verbose = solver_options(true);
    let opts_quiet = solver_options(false);
    let mut first = true;
    c.bench_function("height_weight_limit", |b| {
        b.iter(|| {
            let opts = if first {
                first = false;
                &opts_verbose
            } else {
                &opts_quiet
            };
            let solution = solve(&a, &WEIGHTS, &mut SweepLimit::default(), opts, None).unwrap();
            black_box(&solution.x);
        });
    });
}

fn bench_rules(c: &mut Criterion) {
    let (a, b) = random_problem(1, 200, 40);
    let opts = solver_options(false);
    c.bench_function("random_200x40_objective_gap", |bench| {
        bench.iter(|| {
            let solution = solve(&a, &b, &mut ObjectiveGap::new(1e-9), &opts, None).unwrap();
            black_box(&solution.x);
        });
    });
    c.bench_function("random_200x40_kkt", |bench| {
        bench.iter(|| {
            let solution = solve(&a, &b, &mut KktTolerance::new(1e-9), &opts, None).unwrap();
            black_box(&solution.x);
        });
    });
    c.bench_function("random_200x40_limit", |bench| {
        bench.iter(|| {
            let solution = solve(&a, &b, &mut SweepLimit::new(Some(50)), &opts, None).unwrap();
            black_box(&solution.x);
        });
    });
}

fn bench_setup(c: &mut Criterion) {
    let (a, b) = random_problem(2, 2000, 200);
    c.bench_function("setup_2000x200", |bench| {
        bench.iter(|| {
            let eq = NormalEquations::new(&a, &b, Parallelism::None).unwrap();
            black_box(eq.diag()[0]);
        });
    });
    c.bench_function("setup_2000x200_rayon", |bench| {
        bench.iter(|| {
            let eq = NormalEquations::new(&a, &b, Parallelism::Rayon(0)).unwrap();
            black_box(eq.diag()[0]);
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_millis(1000));
    targets =
        bench_height_weight,
        bench_rules,
        bench_setup
}
criterion_main!(benches);
