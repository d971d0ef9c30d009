//! Benchmarks for WGSL assembly.
//!
//! Run with: `cargo bench --bench shader_gen`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use flowfield::kernels::{position, velocity};
use flowfield::shader_utils;
use flowfield::visuals;

fn bench_kernel_sources(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_source");

    group.bench_function("velocity", |b| b.iter(|| black_box(velocity::shader_source())));
    group.bench_function("position", |b| b.iter(|| black_box(position::shader_source())));
    group.bench_function("render", |b| b.iter(|| black_box(visuals::render_shader_source())));

    group.finish();
}

fn bench_utils(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils");

    group.bench_function("constants", |b| b.iter(|| black_box(shader_utils::constants_wgsl())));
    group.bench_function("all_utils", |b| b.iter(|| black_box(shader_utils::all_utils_wgsl())));

    group.finish();
}

criterion_group!(benches, bench_kernel_sources, bench_utils);
criterion_main!(benches);
