use crate::cloud_set::IndexedCloud;
use crate::potential::SamplingState;
use pointbatch_core::{PointBatchError, Result, Split};
use rand::seq::index;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

/// One spherical extraction of points around a sampled center.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Index of the owning cloud within its split.
    pub cloud_index: usize,
    /// Jittered query center.
    pub center: [f32; 3],
    pub radius: f32,
    /// Indices into the owning cloud.
    pub point_indices: Vec<usize>,
    /// Coordinates relative to `center`.
    pub points: Vec<[f32; 3]>,
    /// Absolute coordinates.
    pub absolute: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    /// Contiguous class ids, zeros for test clouds.
    pub labels: Vec<i32>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.point_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point_indices.is_empty()
    }
}

/// Tukey biweight `(1 - d²/r²)²` inside the radius, zero outside.
#[inline]
pub fn tukey_weight(dist_sq: f64, radius_sq: f64) -> f64 {
    if dist_sq > radius_sq {
        return 0.0;
    }
    let t = 1.0 - dist_sq / radius_sq;
    t * t
}

/// Draws regions from the clouds of one split, steered by the potentials of
/// a [`SamplingState`].
#[derive(Debug, Clone)]
pub struct RegionSampler {
    clouds: Arc<[IndexedCloud]>,
    split: Split,
    radius: f32,
    jitter: Normal<f32>,
}

impl RegionSampler {
    /// Center jitter std as a fraction of the region radius.
    pub const JITTER_RATIO: f32 = 0.1;

    pub fn new(clouds: Arc<[IndexedCloud]>, split: Split, radius: f32) -> Result<Self> {
        if clouds.is_empty() {
            return Err(PointBatchError::EmptySplit(split));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PointBatchError::Config(format!(
                "region radius must be > 0 and finite, got {radius}"
            )));
        }
        let jitter = Normal::new(0.0, radius * Self::JITTER_RATIO)
            .map_err(|e| PointBatchError::Config(format!("invalid jitter: {e}")))?;

        Ok(Self {
            clouds,
            split,
            radius,
            jitter,
        })
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn clouds(&self) -> &Arc<[IndexedCloud]> {
        &self.clouds
    }

    /// Fresh potentials over this sampler's clouds.
    pub fn new_state(&self, seed: u64) -> SamplingState {
        SamplingState::new(self.split, &self.clouds, seed)
    }

    /// Sample the next region.
    ///
    /// Picks the least sampled point over all clouds, jitters it, queries
    /// the cloud's index around it, raises the potentials of the returned
    /// points by their Tukey weight and, if more than `budget` points came
    /// back, keeps a random `budget - 1` of them.
    pub fn sample(&self, state: &mut SamplingState, budget: usize) -> Region {
        debug_assert_eq!(state.split(), self.split);
        debug_assert_eq!(state.fields().len(), self.clouds.len());

        let (cloud_index, point_index) = state.next_center();
        let cloud = &self.clouds[cloud_index];

        let anchor = cloud.points()[point_index];
        let mut center = anchor;
        for c in center.iter_mut() {
            *c += self.jitter.sample(&mut state.rng);
        }

        let hits = cloud.tree.radius_search_with_sq_dist(&center, self.radius);

        let radius_sq = f64::from(self.radius) * f64::from(self.radius);
        let weights: Vec<(usize, f64)> = hits
            .iter()
            .map(|&(idx, d_sq)| (idx, tukey_weight(f64::from(d_sq), radius_sq)))
            .collect();
        state.field_mut(cloud_index).add_weights(&weights);

        let mut point_indices: Vec<usize> = hits.into_iter().map(|(idx, _)| idx).collect();
        if point_indices.len() > budget {
            let keep = budget.saturating_sub(1);
            let mut chosen: Vec<usize> = index::sample(&mut state.rng, point_indices.len(), keep)
                .into_iter()
                .map(|i| point_indices[i])
                .collect();
            chosen.sort_unstable();
            point_indices = chosen;
        }

        self.extract(cloud_index, center, point_indices)
    }

    fn extract(&self, cloud_index: usize, center: [f32; 3], point_indices: Vec<usize>) -> Region {
        let cloud = &self.clouds[cloud_index];
        let n = point_indices.len();

        let mut points = Vec::with_capacity(n);
        let mut absolute = Vec::with_capacity(n);
        let mut colors = Vec::with_capacity(n);
        for &i in &point_indices {
            let p = cloud.cloud.points[i];
            absolute.push(p);
            points.push([p[0] - center[0], p[1] - center[1], p[2] - center[2]]);
            colors.push(cloud.cloud.colors[i]);
        }

        let labels = match &cloud.class_ids {
            Some(ids) => point_indices.iter().map(|&i| ids[i]).collect(),
            None => vec![0; n],
        };

        Region {
            cloud_index,
            center,
            radius: self.radius,
            point_indices,
            points,
            absolute,
            colors,
            labels,
        }
    }
}
