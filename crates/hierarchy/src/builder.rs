use pointbatch_core::{DatasetConfig, PointBatchError, Result};
use pointbatch_spatial::{batch_grid_subsample, batch_neighbors, NeighborMatrix};

/// One resolution level of a [`Hierarchy`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Stacked points of the level, grouped per region.
    pub points: Vec<[f32; 3]>,
    pub lengths: Vec<usize>,
    /// Convolution radius of the level.
    pub radius: f32,
    /// Self-neighbors of `points`.
    pub neighbors: NeighborMatrix,
    /// Rows are the next level's points, entries index into `points`.
    /// Empty on the last level.
    pub pools: NeighborMatrix,
    /// Rows are the previous level's points, entries index into `points`.
    /// Empty on the first level.
    pub upsamples: NeighborMatrix,
}

/// Multi-resolution inputs for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub layers: Vec<Layer>,
    /// Per-point loss weight, `min(lengths) / length` of the owning region.
    pub weights: Vec<f32>,
    /// Per-region rows of first-level point indices.
    pub first_batch_inds: NeighborMatrix,
    /// Per-region rows of last-level point indices.
    pub last_batch_inds: NeighborMatrix,
}

impl Hierarchy {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn first(&self) -> &Layer {
        &self.layers[0]
    }

    pub fn last(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }
}

/// Builds per-level point sets and sentinel-padded neighbor relations by
/// repeated grid subsampling, doubling radius and cell size at each level.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiResolutionNeighborBuilder {
    first_dl: f32,
    density: f32,
    limits: Vec<usize>,
}

impl MultiResolutionNeighborBuilder {
    /// `limits` holds one neighbor limit per level; its length is the number
    /// of levels.
    pub fn new(first_dl: f32, density: f32, limits: Vec<usize>) -> Result<Self> {
        if !(first_dl.is_finite() && first_dl > 0.0) {
            return Err(PointBatchError::Config(format!(
                "first subsampling cell must be > 0, got {first_dl}"
            )));
        }
        if !(density.is_finite() && density > 0.0) {
            return Err(PointBatchError::Config(format!(
                "density parameter must be > 0, got {density}"
            )));
        }
        if limits.is_empty() {
            return Err(PointBatchError::Config(
                "at least one hierarchy level is required".to_string(),
            ));
        }
        Ok(Self {
            first_dl,
            density,
            limits,
        })
    }

    pub fn from_config(config: &DatasetConfig, limits: Vec<usize>) -> Result<Self> {
        if limits.len() != config.num_layers {
            return Err(PointBatchError::Config(format!(
                "expected {} neighbor limits, got {}",
                config.num_layers,
                limits.len()
            )));
        }
        Self::new(config.first_subsampling_dl, config.density_parameter, limits)
    }

    pub fn num_layers(&self) -> usize {
        self.limits.len()
    }

    pub fn limits(&self) -> &[usize] {
        &self.limits
    }

    pub fn first_radius(&self) -> f32 {
        self.first_dl * self.density / 2.0
    }

    /// Build the hierarchy of a stacked point set.
    ///
    /// # Panics
    ///
    /// Panics if `lengths` does not sum to the number of points.
    pub fn build(&self, points: &[[f32; 3]], lengths: &[usize]) -> Hierarchy {
        let last = self.num_layers() - 1;
        let mut r = self.first_radius();
        let mut dl = self.first_dl;

        let mut points = points.to_vec();
        let mut lengths = lengths.to_vec();
        let mut upsamples = NeighborMatrix::empty(0);
        let mut layers = Vec::with_capacity(self.num_layers());

        for (level, &limit) in self.limits.iter().enumerate() {
            let neighbors = batch_neighbors(&points, &points, &lengths, &lengths, r, limit);

            if level == last {
                layers.push(Layer {
                    pools: NeighborMatrix::empty(points.len()),
                    points,
                    lengths,
                    radius: r,
                    neighbors,
                    upsamples,
                });
                break;
            }

            let (pool_points, pool_lengths) = batch_grid_subsample(&points, &lengths, 2.0 * dl);
            let pools = batch_neighbors(&pool_points, &points, &pool_lengths, &lengths, r, limit);
            let up = batch_neighbors(&points, &pool_points, &lengths, &pool_lengths, 2.0 * r, limit);

            layers.push(Layer {
                points: std::mem::replace(&mut points, pool_points),
                lengths: std::mem::replace(&mut lengths, pool_lengths),
                radius: r,
                neighbors,
                pools,
                upsamples: std::mem::replace(&mut upsamples, up),
            });

            r *= 2.0;
            dl *= 2.0;
        }

        let first_lengths = &layers[0].lengths;
        let weights = point_weights(first_lengths);
        let first_batch_inds = stack_batch_inds(first_lengths);
        let last_batch_inds = stack_batch_inds(&layers[layers.len() - 1].lengths);

        Hierarchy {
            layers,
            weights,
            first_batch_inds,
            last_batch_inds,
        }
    }
}

/// `min(lengths) / length` of the owning region, broadcast per point.
pub fn point_weights(lengths: &[usize]) -> Vec<f32> {
    let min_len = lengths.iter().copied().min().unwrap_or(0) as f32;
    lengths
        .iter()
        .flat_map(|&len| std::iter::repeat(min_len / len as f32).take(len))
        .collect()
}

/// One row per region listing the stacked indices of its points, padded with
/// the total point count.
pub fn stack_batch_inds(lengths: &[usize]) -> NeighborMatrix {
    let mut start = 0;
    let rows: Vec<Vec<usize>> = lengths
        .iter()
        .map(|&len| {
            let row = (start..start + len).collect();
            start += len;
            row
        })
        .collect();
    NeighborMatrix::from_rows(&rows, start, usize::MAX)
}
