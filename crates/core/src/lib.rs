#![forbid(unsafe_code)]

pub mod cloud;
pub mod config;
pub mod error;
pub mod labels;
pub mod split;
pub mod timing;

pub use cloud::Cloud;
pub use config::{AugmentConfig, CalibrationConfig, DatasetConfig, FeatureComposition, RotationMode};
pub use error::{PointBatchError, Result};
pub use labels::LabelMap;
pub use split::{Split, SplitTable};
pub use timing::Timed;
