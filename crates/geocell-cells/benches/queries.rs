#![allow(missing_docs)]
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geocell_cells::{CellRef, GeomCell};
use geocell_math::{Quad, Scalar, Transform, Vec3};

/// A row of `n` cylinders along X, each rotated a little about Z.
fn build_row<S: Scalar>(n: usize) -> GeomCell<S> {
    let children: Vec<CellRef<S>> = (0..n)
        .map(|i| {
            let x = S::from_f64(3.0 * i as f64);
            let t = Transform::translation(x, S::zero(), S::zero())
                .then(&Transform::rotation_z(S::from_f64(0.1 * i as f64)));
            GeomCell::cylinder(2, S::one(), S::from_f64(2.0), t)
                .expect("valid cylinder")
                .into_ref()
        })
        .collect();
    GeomCell::composite(children, Transform::identity())
}

fn query_point<S: Scalar>() -> Vec3<S> {
    Vec3::new(S::from_f64(7.3), S::from_f64(1.9), S::from_f64(0.4))
}

fn bench_dist(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_dist");
    for &n in &[1usize, 16, 256] {
        group.throughput(Throughput::Elements(n as u64));
        let row = build_row::<f64>(n);
        group.bench_with_input(BenchmarkId::new("f64", n), &n, |b, _| {
            b.iter(|| black_box(row.dist(black_box(&query_point()))))
        });
        let row = build_row::<Quad>(n);
        group.bench_with_input(BenchmarkId::new("quad", n), &n, |b, _| {
            b.iter(|| black_box(row.dist(black_box(&query_point()))))
        });
    }
    group.finish();
}

fn bench_ray(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_ray");
    for &n in &[1usize, 16, 256] {
        group.throughput(Throughput::Elements(n as u64));
        let row = build_row::<f64>(n);
        let origin = Vec3::new(-10.0, 0.2, 0.1);
        let dir = Vec3::new(1.0, 0.0, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(row.ray_query(black_box(&origin), black_box(&dir))))
        });
    }
    group.finish();
}

fn bench_mesh(c: &mut Criterion) {
    let row = build_row::<f64>(16);
    c.bench_function("composite_mesh_16x32", |b| b.iter(|| black_box(row.mesh())));
}

criterion_group!(benches, bench_dist, bench_ray, bench_mesh);
criterion_main!(benches);
