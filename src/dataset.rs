use pointbatch_calibration::Calibration;
use pointbatch_core::{Cloud, DatasetConfig, LabelMap, PointBatchError, Result, Split};
use pointbatch_hierarchy::InputPipeline;
use pointbatch_sampling::{floor_budget, BatchGenerator, CloudSet, RegionSampler};

/// Clouds, configuration and calibration state, handing out one batch
/// iterator per split and pass.
#[derive(Debug, Clone)]
pub struct Dataset {
    clouds: CloudSet,
    label_map: LabelMap,
    config: DatasetConfig,
    batch_limit: Option<f64>,
    neighbor_limits: Vec<usize>,
    calibration: Option<Calibration>,
}

impl Dataset {
    pub fn new(clouds: Vec<Cloud>, label_map: LabelMap, config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        let clouds = CloudSet::new(clouds, &label_map)?;
        let neighbor_limits = config.default_neighbor_limits();
        Ok(Self {
            clouds,
            label_map,
            config,
            batch_limit: None,
            neighbor_limits,
            calibration: None,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn clouds(&self) -> &CloudSet {
        &self.clouds
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    /// Point budget per batch, once calibrated or set.
    pub fn batch_limit(&self) -> Option<f64> {
        self.batch_limit
    }

    pub fn neighbor_limits(&self) -> &[usize] {
        &self.neighbor_limits
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn set_batch_limit(&mut self, limit: f64) -> Result<()> {
        floor_budget(limit)?;
        self.batch_limit = Some(limit);
        Ok(())
    }

    pub fn set_neighbor_limits(&mut self, limits: Vec<usize>) -> Result<()> {
        if limits.len() != self.config.num_layers {
            return Err(PointBatchError::Config(format!(
                "expected {} neighbor limits, got {}",
                self.config.num_layers,
                limits.len()
            )));
        }
        self.neighbor_limits = limits;
        Ok(())
    }

    /// Calibrate the point budget and neighbor limits, replacing any
    /// previous values.
    pub fn calibrate(&mut self, seed: u64) -> Result<&Calibration> {
        let calibration = Calibration::run(&self.clouds, &self.config, seed)?;
        self.batch_limit = Some(calibration.budget.limit);
        self.neighbor_limits = calibration.neighbors.limits.clone();
        Ok(self.calibration.insert(calibration))
    }

    /// A fresh pass over `split` with newly seeded potentials.
    pub fn epoch(&self, split: Split, seed: u64) -> Result<BatchGenerator> {
        let limit = self.batch_limit.ok_or_else(|| {
            PointBatchError::Config(
                "point budget is not set; run calibrate() or set_batch_limit() first".to_string(),
            )
        })?;
        let clouds = self.clouds.require(split)?.clone();
        let sampler = RegionSampler::new(clouds, split, self.config.in_radius)?;
        let state = sampler.new_state(seed);
        BatchGenerator::new(sampler, state, limit, self.config.draws_per_pass(split))
    }

    /// Input map under the current neighbor limits.
    pub fn pipeline(&self) -> Result<InputPipeline> {
        InputPipeline::new(&self.config, self.neighbor_limits.clone())
    }
}
