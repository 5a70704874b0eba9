use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use p2d_rs::config::CellConfig;
use p2d_rs::models::p2d::{P2dCell, Simulation, Step};
use p2d_rs::numerics::bandwidth::JacobianPattern;
use p2d_rs::numerics::newton::{NewtonStats, fd_jacobian};
use p2d_rs::physics::control::ControlMode;

fn problem_sizes() -> Vec<usize> {
    vec![5, 10, 20]
}

fn build(size: usize) -> P2dCell {
    P2dCell::build(&CellConfig::default().with_discretization(size, size)).unwrap()
}

fn bench_residual(c: &mut Criterion) {
    let mut group = c.benchmark_group("residual");
    for &size in &problem_sizes() {
        let cell = build(size);
        let model = cell.assembler(ControlMode::c_rate(-1.0));
        let mut res = vec![0.0; cell.len()];
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &_| {
            b.iter(|| {
                model.residual(0.0, &cell.y0, &cell.yp0, &mut res);
                std::hint::black_box(&res);
            });
        });
    }
    group.finish();
}

fn bench_bandwidth(c: &mut Criterion) {
    let mut group = c.benchmark_group("bandwidth");
    for &size in &problem_sizes() {
        let cell = build(size);
        let model = cell.assembler(ControlMode::rest());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &_| {
            b.iter(|| {
                let pattern = JacobianPattern::analyze(&model, 0.0, &cell.y0, &cell.yp0);
                std::hint::black_box(pattern.nnz());
            });
        });
    }
    group.finish();
}

fn bench_banded_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("banded_jacobian");
    for &size in &problem_sizes() {
        let cell = build(size);
        let model = cell.assembler(ControlMode::c_rate(-1.0));
        let mut g0 = vec![0.0; cell.len()];
        model.residual(0.0, &cell.y0, &cell.yp0, &mut g0);
        let band = Some((cell.lband(), cell.uband()));
        let mut g = |y: &[f64], r: &mut [f64]| model.residual(0.0, y, &cell.yp0, r);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &_| {
            b.iter(|| {
                let jac = fd_jacobian(&mut g, &cell.y0, &g0, band, &mut NewtonStats::default());
                std::hint::black_box(jac);
            });
        });
    }
    group.finish();
}

fn bench_short_discharge(c: &mut Criterion) {
    let mut group = c.benchmark_group("discharge_60s");
    group.sample_size(10);
    for &size in &[5usize, 10] {
        let cell = build(size);
        let step = Step::new(ControlMode::c_rate(-1.0), 60.0).points(7);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &_| {
            b.iter_batched(
                || Simulation::new(&cell),
                |mut sim| {
                    let sol = sim.run_step(&step);
                    std::hint::black_box(sol.success);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_residual,
    bench_bandwidth,
    bench_banded_jacobian,
    bench_short_discharge
);
criterion_main!(benches);
