//! Benchmarks for the neighbourhood filter and temporal reductions.
//!
//! Run with: cargo bench --package grid-processor --bench neighbourhood_benchmarks

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_processor::{
    neighbourhood_max_naive, rolling, NeighbourhoodMax, ReduceOp, SpatialFilter,
};
use hazard_common::{Grid, NeighbourhoodSpec, TimeSeriesGrid};
use rand::Rng;

/// Random gust field on a 0.11° grid over the Sydney region.
fn generate_gust_grid(rows: usize, cols: usize) -> Grid {
    let mut rng = rand::thread_rng();
    let lats = (0..rows).map(|r| -31.5 - 0.11 * r as f64).collect();
    let lons = (0..cols).map(|c| 150.5 + 0.11 * c as f64).collect();
    let data = (0..rows * cols).map(|_| rng.gen_range(0.0..40.0)).collect();
    Grid::new(lats, lons, data).unwrap()
}

// =============================================================================
// NEIGHBOURHOOD FILTER BENCHMARKS
// =============================================================================

fn bench_neighbourhood(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbourhood_max");
    let spec = NeighbourhoodSpec::default();

    for size in [32usize, 64, 128, 256] {
        let grid = generate_gust_grid(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));

        let serial = NeighbourhoodMax::new(spec).parallel(false);
        group.bench_with_input(BenchmarkId::new("serial", size), &grid, |b, grid| {
            b.iter(|| black_box(serial.apply(grid).unwrap()));
        });

        let parallel = NeighbourhoodMax::new(spec);
        group.bench_with_input(BenchmarkId::new("parallel", size), &grid, |b, grid| {
            b.iter(|| black_box(parallel.apply(grid).unwrap()));
        });

        // Quadratic in cell count; keep to small grids.
        if size <= 64 {
            group.bench_with_input(BenchmarkId::new("naive", size), &grid, |b, grid| {
                b.iter(|| black_box(neighbourhood_max_naive(grid, &spec).unwrap()));
            });
        }
    }

    group.finish();
}

// =============================================================================
// ROLLING WINDOW BENCHMARKS
// =============================================================================

fn bench_rolling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_sum");
    let t0 = Utc.with_ymd_and_hms(2015, 4, 19, 23, 0, 0).unwrap();

    // Two days of 10-minute steps
    let steps = 288;
    let times = (0..steps).map(|i| t0 + Duration::minutes(10 * i as i64)).collect();
    let grids = (0..steps).map(|_| generate_gust_grid(64, 64)).collect();
    let series = TimeSeriesGrid::new(times, grids).unwrap();

    for window in [6usize, 36] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &w| {
            b.iter(|| black_box(rolling(&series, w, ReduceOp::Sum).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_neighbourhood, bench_rolling);
criterion_main!(benches);
