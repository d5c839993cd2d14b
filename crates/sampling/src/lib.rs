#![forbid(unsafe_code)]

pub mod batch;
pub mod cloud_set;
pub mod generator;
pub mod potential;
pub mod region;

pub use batch::{Batch, BatchAssembler};
pub use cloud_set::{CloudSet, IndexedCloud};
pub use generator::{floor_budget, BatchGenerator};
pub use potential::{PotentialField, SamplingState, INITIAL_POTENTIAL_SCALE};
pub use region::{tukey_weight, Region, RegionSampler};
