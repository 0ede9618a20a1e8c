use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use split_community::{
    BreadthFirstSplitter, DepthFirstSplitter, GraphSnapshot, LabelPropagationSplitter,
    SplitScratch, Splitter,
};

fn bench_splitters(c: &mut Criterion) {
    let (graph, vdom) = GraphSnapshot::generate_random(200_000, 300_000, 64, 7);
    let workers = num_cpus::get().max(1);
    let mut scratch = SplitScratch::new();
    let mut group = c.benchmark_group("split");
    group.sample_size(10);

    for pruning in [false, true] {
        let splitter = LabelPropagationSplitter::new(pruning);
        group.bench_function(BenchmarkId::new("lpa", pruning), |b| {
            b.iter(|| splitter.split(black_box(&graph), black_box(&vdom), &mut scratch).unwrap())
        });
    }
    for threads in [1usize, workers] {
        let dfs = DepthFirstSplitter::new(threads);
        group.bench_function(BenchmarkId::new("dfs", threads), |b| {
            b.iter(|| dfs.split(black_box(&graph), black_box(&vdom), &mut scratch).unwrap())
        });
        let bfs = BreadthFirstSplitter::new(threads);
        group.bench_function(BenchmarkId::new("bfs", threads), |b| {
            b.iter(|| bfs.split(black_box(&graph), black_box(&vdom), &mut scratch).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_splitters);
criterion_main!(benches);
