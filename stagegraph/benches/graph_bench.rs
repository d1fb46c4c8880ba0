//! Benchmarks for graph construction and failure propagation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stagegraph::core::StageStatus;
use stagegraph::propagation::{propagate, ready_stages, StatusTable};
use stagegraph::testing::TestPipeline;

fn build_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for size in [16, 128, 512] {
        let linear = TestPipeline::linear("linear", size);
        group.bench_with_input(BenchmarkId::new("linear", size), &linear, |b, p| {
            b.iter(|| black_box(p.build()));
        });
        let fan = TestPipeline::fan_out("fan", size);
        group.bench_with_input(BenchmarkId::new("fan_out", size), &fan, |b, p| {
            b.iter(|| black_box(p.build()));
        });
    }
    group.finish();
}

fn propagate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate_root_failure");
    for size in [16, 128, 512] {
        for (shape, pipeline) in [
            ("linear", TestPipeline::linear("linear", size)),
            ("fan_out", TestPipeline::fan_out("fan", size)),
        ] {
            let Ok(graph) = pipeline.build() else {
                continue;
            };
            let Some(&root) = graph.roots().first() else {
                continue;
            };
            let mut statuses = StatusTable::new(&graph);
            statuses.set(root, StageStatus::Failed);

            group.bench_function(BenchmarkId::new(shape, size), |b| {
                b.iter(|| black_box(propagate(&graph, &statuses, root)));
            });
        }
    }
    group.finish();
}

fn ready_benchmark(c: &mut Criterion) {
    let Ok(graph) = TestPipeline::fan_out("fan", 512).build() else {
        return;
    };
    let statuses = StatusTable::new(&graph);
    c.bench_function("ready_stages_fan_out_512", |b| {
        b.iter(|| black_box(ready_stages(&graph, &statuses)));
    });
}

criterion_group!(benches, build_benchmark, propagate_benchmark, ready_benchmark);
criterion_main!(benches);
