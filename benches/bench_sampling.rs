use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pointbatch::sampling::{BatchGenerator, RegionSampler};
use pointbatch::{Cloud, CloudSet, LabelMap, Split};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn terrain(n: usize, seed: u64) -> Cloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let points: Vec<[f32; 3]> = (0..n)
        .map(|_| {
            let x = rng.gen_range(0.0f32..200.0);
            let y = rng.gen_range(0.0f32..200.0);
            [x, y, (x * 0.05).sin() * 3.0 + rng.gen_range(0.0f32..0.2)]
        })
        .collect();
    Cloud::new("terrain", Split::Test, points, vec![[0.5; 3]; n], None).unwrap()
}

fn bench_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_sampling");
    for size in [100_000, 1_000_000] {
        let set = CloudSet::new(vec![terrain(size, 1)], &LabelMap::identity(1)).unwrap();
        let sampler = RegionSampler::new(set.split(Split::Test).clone(), Split::Test, 10.0).unwrap();
        let mut state = sampler.new_state(0);
        group.bench_with_input(BenchmarkId::new("radius_10", size), &size, |b, _| {
            b.iter(|| sampler.sample(&mut state, 40_000))
        });
    }
    group.finish();
}

fn bench_pass(c: &mut Criterion) {
    let set = CloudSet::new(vec![terrain(200_000, 2)], &LabelMap::identity(1)).unwrap();
    let sampler = RegionSampler::new(set.split(Split::Test).clone(), Split::Test, 10.0).unwrap();
    let mut group = c.benchmark_group("batch_generation");
    group.sample_size(10);
    group.bench_function("60_draws", |b| {
        b.iter(|| {
            let state = sampler.new_state(0);
            BatchGenerator::new(sampler.clone(), state, 20_000.0, 60)
                .unwrap()
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_regions, bench_pass);
criterion_main!(benches);
