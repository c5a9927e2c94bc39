//! Benchmarks for the sky matcher and one full nightly cycle.
//!
//!   cargo bench --bench separation_association
//!   cargo bench separation_association -- night_to_night

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use nightlink::associations::candidates::separation_association;
use nightlink::{night_to_night_association, AssociationParams, Observation, Separation, TrajectorySet};

/// Alerts of one night over a 5x5 degrees field.
fn make_night(rng: &mut StdRng, nid: u32, n: usize) -> Vec<Observation> {
    (0..n)
        .map(|k| {
            Observation::new(
                200.0 + rng.random::<f64>() * 5.0,
                -20.0 + rng.random::<f64>() * 5.0,
                2459000.5 + nid as f64 + rng.random::<f64>() * 0.3,
                if rng.random::<bool>() { 1 } else { 2 },
                17.0 + rng.random::<f64>() * 3.0,
                (nid as usize * n + k) as i64,
                nid,
            )
        })
        .collect()
}

fn bench_separation(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut group = c.benchmark_group("separation_association");

    for size in [1_000usize, 10_000, 50_000] {
        let left = make_night(&mut rng, 1, size);
        let right = make_night(&mut rng, 2, size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(separation_association(
                    black_box(&left),
                    black_box(&right),
                    Separation::Degree(0.24),
                ))
            })
        });
    }
    group.finish();
}

fn bench_night_to_night(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let params = AssociationParams::default();

    let first = night_to_night_association(
        TrajectorySet::new(),
        vec![],
        make_night(&mut rng, 1, 5_000),
        0,
        1,
        &params,
    );
    let next = make_night(&mut rng, 2, 5_000);

    c.bench_function("night_to_night/5000", |b| {
        b.iter_batched(
            || (first.trajectories.clone(), first.old_observations.clone(), next.clone()),
            |(trajectories, old, new)| {
                black_box(night_to_night_association(trajectories, old, new, 1, 2, &params))
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_separation, bench_night_to_night);
criterion_main!(benches);
