use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pointbatch::spatial::batch_neighbors;
use pointbatch::KdTree;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_points(n: usize, extent: f32, seed: u64) -> Vec<[f32; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            [
                rng.gen_range(0.0f32..extent),
                rng.gen_range(0.0f32..extent),
                rng.gen_range(0.0f32..extent),
            ]
        })
        .collect()
}

fn bench_radius_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_radius_search");
    for size in [100_000, 1_000_000] {
        let points = random_points(size, 100.0, 42);
        let tree = KdTree::build(&points);
        let query = [50.0f32, 50.0, 50.0];
        group.bench_with_input(BenchmarkId::new("radius_5", size), &size, |b, _| {
            b.iter(|| tree.radius_search_with_sq_dist(&query, 5.0))
        });
    }
    group.finish();
}

fn bench_batch_neighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_neighbors");
    group.sample_size(20);
    for regions in [2usize, 8] {
        let points = random_points(regions * 5_000, 4.0, 7);
        let lengths = vec![5_000; regions];
        group.bench_with_input(BenchmarkId::new("r_0.25_limit_40", regions), &regions, |b, _| {
            b.iter(|| batch_neighbors(&points, &points, &lengths, &lengths, 0.25, 40))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_radius_search, bench_batch_neighbors);
criterion_main!(benches);
