//! Generation benchmarks for mapgen_core.
//!
//! Run with: `cargo bench -p mapgen_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mapgen_core::accessibility::make_cities_accessible;
use mapgen_core::prelude::*;
use mapgen_test_utils::fixtures::mountain_band;

/// Full pipeline on the small and normal presets.
pub fn generation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(10);
    for (name, config) in [("small", MapConfig::small()), ("normal", MapConfig::normal())] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| {
                let mut generator = MapGenerator::new(config.clone()).unwrap();
                generator.generate(|_| {});
                black_box(generator.map_hash())
            });
        });
    }
    group.finish();
}

/// Shortest-path search across a normal-sized open map.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let grid = MapGrid::new(112, 156);
    c.bench_function("land_pathfinder_112x156", |b| {
        b.iter(|| {
            let pf = GridPathfinder::new(black_box(&grid), Pos::new(56, 78), Movement::Land);
            black_box(pf.reachable_count())
        });
    });
}

/// Repair of a map split by a mountain band.
pub fn accessibility_benchmark(c: &mut Criterion) {
    let (grid, _, _) = mountain_band(60, 60, 6);
    c.bench_function("mountain_band_repair", |b| {
        b.iter(|| {
            let mut grid = grid.clone();
            black_box(make_cities_accessible(&mut grid))
        });
    });
}

criterion_group!(
    benches,
    generation_benchmark,
    pathfinding_benchmark,
    accessibility_benchmark
);
criterion_main!(benches);
