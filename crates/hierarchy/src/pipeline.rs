use crate::augment::{Augmenter, RegionTransform};
use crate::builder::{Hierarchy, MultiResolutionNeighborBuilder};
use crate::features::{color_mask, compose, Features};
use pointbatch_core::{DatasetConfig, FeatureComposition, Result};
use pointbatch_sampling::Batch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Everything the network consumes for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInputs {
    pub hierarchy: Hierarchy,
    pub features: Features,
    pub labels: Vec<i32>,
    /// One entry per region.
    pub transforms: Vec<RegionTransform>,
    pub point_indices: Vec<usize>,
    pub cloud_indices: Vec<usize>,
}

impl ModelInputs {
    pub fn scales(&self) -> Vec<[f32; 3]> {
        self.transforms.iter().map(RegionTransform::scale_array).collect()
    }

    pub fn rotations(&self) -> Vec<[[f32; 3]; 3]> {
        self.transforms
            .iter()
            .map(RegionTransform::rotation_rows)
            .collect()
    }
}

/// Per-batch map from an emitted [`Batch`] to [`ModelInputs`]: augmentation,
/// color dropping, feature stacking and hierarchy building.
#[derive(Debug, Clone)]
pub struct InputPipeline {
    augmenter: Augmenter,
    composition: FeatureComposition,
    builder: MultiResolutionNeighborBuilder,
}

impl InputPipeline {
    pub fn new(config: &DatasetConfig, limits: Vec<usize>) -> Result<Self> {
        Ok(Self {
            augmenter: Augmenter::new(config.augment.clone())?,
            composition: config.in_features_dim,
            builder: MultiResolutionNeighborBuilder::from_config(config, limits)?,
        })
    }

    pub fn builder(&self) -> &MultiResolutionNeighborBuilder {
        &self.builder
    }

    pub fn composition(&self) -> FeatureComposition {
        self.composition
    }

    pub fn augmenter(&self) -> &Augmenter {
        &self.augmenter
    }

    pub fn prepare<R: Rng + ?Sized>(&self, batch: &Batch, rng: &mut R) -> ModelInputs {
        let (points, transforms) = self.augmenter.augment(&batch.points, &batch.lengths, rng);

        let keep_colors = if self.composition.drops_colors() {
            color_mask(batch.num_regions(), self.augmenter.config().color, rng)
        } else {
            vec![true; batch.num_regions()]
        };
        let features = compose(
            self.composition,
            &points,
            &batch.features,
            &batch.lengths,
            &keep_colors,
        );

        let hierarchy = self.builder.build(&points, &batch.lengths);

        ModelInputs {
            hierarchy,
            features,
            labels: batch.labels.clone(),
            transforms,
            point_indices: batch.point_indices.clone(),
            cloud_indices: batch.cloud_indices.clone(),
        }
    }

    /// Prepare batches in parallel. Batch `i` draws from an RNG seeded with
    /// `seed + i`, so the result does not depend on scheduling.
    pub fn prepare_all(&self, batches: &[Batch], seed: u64) -> Vec<ModelInputs> {
        log::debug!("preparing {} batches", batches.len());
        batches
            .par_iter()
            .enumerate()
            .map(|(i, batch)| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                self.prepare(batch, &mut rng)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointbatch_core::AugmentConfig;

    fn batch() -> Batch {
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                points.push([i as f32 * 0.1 - 0.35, j as f32 * 0.1 - 0.35, (i * 8 + j) as f32 * 1e-6]);
            }
        }
        let n = points.len();
        let mut stacked = points.clone();
        stacked.extend(points.iter().take(40));
        let total = stacked.len();
        Batch {
            features: stacked
                .iter()
                .map(|p| [0.5, 0.5, 0.5, p[0] + 100.0, p[1], p[2] + 2.0])
                .collect(),
            points: stacked,
            labels: vec![3; total],
            lengths: vec![n, 40],
            point_indices: (0..n).chain(0..40).collect(),
            cloud_indices: vec![0, 1],
        }
    }

    fn config(dim: usize) -> DatasetConfig {
        DatasetConfig {
            first_subsampling_dl: 0.1,
            density_parameter: 4.0,
            num_layers: 3,
            in_features_dim: FeatureComposition::try_from(dim).unwrap(),
            ..DatasetConfig::default()
        }
    }

    #[test]
    fn prepare_carries_batch_arrays_through() {
        let cfg = config(4);
        let pipeline = InputPipeline::new(&cfg, cfg.default_neighbor_limits()).unwrap();
        let b = batch();
        let mut rng = StdRng::seed_from_u64(0);
        let inputs = pipeline.prepare(&b, &mut rng);

        assert_eq!(inputs.hierarchy.num_layers(), 3);
        assert_eq!(inputs.hierarchy.first().lengths, b.lengths);
        assert_eq!(inputs.features.rows(), b.len());
        assert_eq!(inputs.features.dim(), 4);
        assert_eq!(inputs.labels, b.labels);
        assert_eq!(inputs.point_indices, b.point_indices);
        assert_eq!(inputs.cloud_indices, b.cloud_indices);
        assert_eq!(inputs.scales().len(), 2);
        assert_eq!(inputs.rotations().len(), 2);
    }

    #[test]
    fn disabled_augmentation_keeps_points() {
        let cfg = DatasetConfig {
            augment: AugmentConfig::disabled(),
            ..config(8)
        };
        let pipeline = InputPipeline::new(&cfg, vec![20; 3]).unwrap();
        let b = batch();
        let inputs = pipeline.prepare(&b, &mut StdRng::seed_from_u64(0));
        assert_eq!(inputs.hierarchy.first().points, b.points);
        // ones, colors, centered point, height
        assert_eq!(&inputs.features.row(0)[4..7], &b.points[0][..]);
        assert_eq!(inputs.features.row(0)[7], 2.0);
    }

    #[test]
    fn wrong_limit_count_is_rejected() {
        assert!(InputPipeline::new(&config(4), vec![10; 2]).is_err());
    }

    #[test]
    fn prepare_all_is_deterministic() {
        let cfg = config(5);
        let pipeline = InputPipeline::new(&cfg, cfg.default_neighbor_limits()).unwrap();
        let batches = vec![batch(), batch(), batch()];
        let a = pipeline.prepare_all(&batches, 11);
        let b = pipeline.prepare_all(&batches, 11);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        // different seeds per batch
        assert_ne!(a[0].transforms, a[1].transforms);
    }
}
