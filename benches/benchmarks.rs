use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stockflow::prelude::*;

fn synthetic(n: usize) -> Forcing {
    let p = (0..n).map(|i| if i % 7 == 0 { 12.0 } else { 0.5 }).collect();
    let pet = (0..n)
        .map(|i| 3.0 + 2.0 * (i as f64 / 365.0 * std::f64::consts::TAU).sin())
        .collect();
    Forcing::new(p, pet, vec![1.0; n]).unwrap()
}

pub fn discrete_benchmark(c: &mut Criterion) {
    let res = LinearReservoir::new(synthetic(365)).coefficient(0.3);
    c.bench_function("discrete_365", |b| {
        b.iter(|| res.simulate(black_box(utils::arange(0.0, 365.0, 1.0)), Mode::Discrete))
    });
}

pub fn continuous_benchmark(c: &mut Criterion) {
    let res = LinearReservoir::new(synthetic(365)).coefficient(0.3);
    c.bench_function("continuous_365", |b| {
        b.iter(|| res.simulate(black_box(utils::arange(0.0, 365.0, 1.0)), Mode::default()))
    });
}

pub fn sweep_benchmark(c: &mut Criterion) {
    let sweep = Sweep::new(synthetic(365)).members(8).mode(Mode::Discrete);
    c.bench_function("sweep_8_discrete", |b| b.iter(|| sweep.run()));
}

criterion_group!(
    benches,
    discrete_benchmark,
    continuous_benchmark,
    sweep_benchmark
);
criterion_main!(benches);
