#![forbid(unsafe_code)]

pub mod budget;
pub mod neighbors;

pub use budget::{
    calibrate_budget_from_sizes, calibrate_point_budget, region_sizes, BudgetCalibration,
    CONVERGENCE_TOLERANCE,
};
pub use neighbors::{
    calibrate_neighbor_limits, limit_from_histogram, limits_from_histograms, NeighborCalibration,
    NeighborHistogram,
};

use pointbatch_core::{DatasetConfig, Result};
use pointbatch_sampling::CloudSet;

/// Both calibrations, run in order over the calibration split.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub budget: BudgetCalibration,
    pub neighbors: NeighborCalibration,
}

impl Calibration {
    /// Point budget first, then neighbor limits under that budget.
    pub fn run(clouds: &CloudSet, config: &DatasetConfig, seed: u64) -> Result<Self> {
        let split = clouds.calibration_split();
        let calib_clouds = clouds.require(split)?;
        let budget = calibrate_point_budget(calib_clouds, config, seed)?;
        let neighbors = calibrate_neighbor_limits(
            calib_clouds.clone(),
            split,
            config,
            budget.limit,
            seed.wrapping_add(1),
        )?;
        Ok(Self { budget, neighbors })
    }
}
