//! Coverage-balanced region sampling and budgeted batch assembly for point
//! cloud segmentation.
//!
//! [`Dataset`] ties the member crates together: it indexes clouds per split,
//! runs calibration and hands out one [`BatchGenerator`] per pass. Emitted
//! batches go through an [`InputPipeline`] to become [`ModelInputs`].

#![forbid(unsafe_code)]

mod dataset;

pub use dataset::Dataset;

pub use pointbatch_calibration as calibration;
pub use pointbatch_hierarchy as hierarchy;
pub use pointbatch_sampling as sampling;
pub use pointbatch_spatial as spatial;

pub use pointbatch_calibration::{BudgetCalibration, Calibration, NeighborCalibration};
pub use pointbatch_core::{
    AugmentConfig, CalibrationConfig, Cloud, DatasetConfig, FeatureComposition, LabelMap,
    PointBatchError, Result, RotationMode, Split, SplitTable,
};
pub use pointbatch_hierarchy::{Hierarchy, InputPipeline, ModelInputs};
pub use pointbatch_sampling::{Batch, BatchGenerator, CloudSet, Region};
pub use pointbatch_spatial::{KdTree, NeighborMatrix};
