//! Coverage balance of potential-driven sampling.

use pointbatch::sampling::{CloudSet, RegionSampler, INITIAL_POTENTIAL_SCALE};
use pointbatch::{Cloud, LabelMap, Split};

fn strip(n: usize, spacing: f32) -> RegionSampler {
    // Tiny perturbations on y and z to avoid kiddo bucket panic.
    let points = (0..n)
        .map(|i| [i as f32 * spacing, i as f32 * 1e-7, i as f32 * 2e-7])
        .collect();
    let cloud = Cloud::new("strip", Split::Test, points, vec![[0.0; 3]; n], None).unwrap();
    let set = CloudSet::new(vec![cloud], &LabelMap::identity(1)).unwrap();
    RegionSampler::new(set.split(Split::Test).clone(), Split::Test, 1.0).unwrap()
}

#[test]
fn one_covering_draw_touches_every_point() {
    let points: Vec<[f32; 3]> = (0..25)
        .map(|i| [(i % 5) as f32 * 0.1, (i / 5) as f32 * 0.1, i as f32 * 1e-6])
        .collect();
    let cloud = Cloud::new("plate", Split::Test, points, vec![[0.0; 3]; 25], None).unwrap();
    let set = CloudSet::new(vec![cloud], &LabelMap::identity(1)).unwrap();
    let sampler = RegionSampler::new(set.split(Split::Test).clone(), Split::Test, 10.0).unwrap();

    let mut state = sampler.new_state(0);
    let region = sampler.sample(&mut state, usize::MAX);
    assert_eq!(region.len(), 25);
    assert!(state
        .field(0)
        .values()
        .iter()
        .all(|&v| v > INITIAL_POTENTIAL_SCALE));
}

#[test]
fn strip_is_fully_covered_before_anything_is_revisited_heavily() {
    // 2000 points, about 20 per region: 100 regions tile the strip once.
    let n = 2000;
    let sampler = strip(n, 0.1);
    let mut state = sampler.new_state(42);

    for _ in 0..300 {
        sampler.sample(&mut state, usize::MAX);
    }

    let values = state.field(0).values();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(0.0, f64::max);
    assert!(min > 0.5, "least covered point only reached {min}");
    assert!(max < 4.0, "most covered point reached {max}");
}

#[test]
fn least_sampled_point_is_always_chosen_next() {
    let sampler = strip(500, 0.1);
    let mut state = sampler.new_state(3);
    for _ in 0..50 {
        let expected = state.field(0).argmin();
        let anchor = sampler.clouds()[0].points()[expected];
        let region = sampler.sample(&mut state, usize::MAX);
        // Jitter is a tenth of the radius, the anchor is well inside.
        let offset = (anchor[0] - region.center[0]).abs();
        assert!(offset < 0.6, "center {offset} away from the least sampled point");
    }
}
