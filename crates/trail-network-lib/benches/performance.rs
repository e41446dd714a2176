//! Performance benchmarks for trail-network-lib
//!
//! Run with: cargo bench --package trail-network-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use trail_network_lib::{Config, PathAttributes, PathNetwork, Polyline, TopologyId};

/// A slightly wavy line from `(x0, y0)` to `(x1, y1)` with `points` vertices
fn wavy_line(x0: f64, y0: f64, x1: f64, y1: f64, points: usize) -> Polyline {
    let length = (x1 - x0).hypot(y1 - y0);
    let (nx, ny) = (-(y1 - y0) / length, (x1 - x0) / length);
    let coords: Vec<(f64, f64, f64)> = (0..points)
        .map(|i| {
            let t = i as f64 / (points - 1) as f64;
            let wobble = (t * 40.0).sin() * 0.01;
            let x = x0 + (x1 - x0) * t + nx * wobble;
            let y = y0 + (y1 - y0) * t + ny * wobble;
            (x, y, 100.0 + (t * 10.0).cos() * 20.0)
        })
        .collect();
    Polyline::from_xyz(&coords).unwrap()
}

/// Build an `n` by `n` grid: horizontal lines first, then vertical lines that
/// split every one of them
fn build_grid(n: usize, points_per_line: usize) -> PathNetwork {
    let mut network = PathNetwork::new(Config::default());
    let extent = n as f64 + 1.0;
    for i in 1..=n {
        let y = i as f64;
        network
            .create_path(
                wavy_line(0.0, y, extent, y, points_per_line),
                PathAttributes::named(format!("H{i}")),
            )
            .unwrap();
    }
    for i in 1..=n {
        let x = i as f64;
        network
            .create_path(
                wavy_line(x, 0.0, x, extent, points_per_line),
                PathAttributes::named(format!("V{i}")),
            )
            .unwrap();
    }
    network
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_grid_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(10);

    for n in [5usize, 10, 20] {
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("grid", n), &n, |b, &n| {
            b.iter(|| build_grid(n, 50));
        });
    }

    group.finish();
}

fn bench_topology_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology");

    // A topology along the whole first row, cut by every vertical line
    let mut network = PathNetwork::new(Config::default());
    let row = network
        .create_path(wavy_line(0.0, 1.0, 21.0, 1.0, 500), PathAttributes::named("row"))
        .unwrap()
        .id();
    let topology: TopologyId = network.create_topology(&[(row, 0.0, 1.0)]).unwrap().id();
    for i in 1..=20 {
        let x = i as f64;
        network
            .create_path(wavy_line(x, 0.0, x, 2.0, 10), PathAttributes::named(format!("V{i}")))
            .unwrap();
    }

    group.bench_function("resolve_cold_21_pieces", |b| {
        b.iter(|| {
            // Never resolved on `network`, so every clone starts cold
            let copy = network.clone();
            copy.topology_geometry(topology).unwrap()
        });
    });

    network.topology_geometry(topology).unwrap();
    group.bench_function("resolve_cached", |b| {
        b.iter(|| network.topology_geometry(topology).unwrap());
    });

    group.finish();
}

fn bench_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("audit");
    group.sample_size(20);

    let network = build_grid(10, 50);
    group.bench_function("grid_10", |b| {
        b.iter(|| network.audit());
    });
    group.bench_function("info_grid_10", |b| {
        b.iter(|| network.info());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_grid_construction,
    bench_topology_resolution,
    bench_audit
);
criterion_main!(benches);
