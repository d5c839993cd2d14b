use crate::split::Split;
use thiserror::Error;

/// Errors raised while assembling clouds, configuring generation or
/// calibrating.
///
/// Running out of regions at the end of an epoch is not an error; iterators
/// signal it by returning `None`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointBatchError {
    /// Split name outside `training`, `validation`, `test`.
    #[error("unknown split {0:?}, expected \"training\", \"validation\" or \"test\"")]
    UnknownSplit(String),

    /// Feature dimensionality with no matching feature composition.
    #[error("unsupported input feature dimension {0}, accepted values are 1, 2, 3, 4, 5, 7 and 8")]
    UnsupportedFeatureDim(usize),

    /// A pass was requested over a split that holds no clouds.
    #[error("split {0} has no clouds")]
    EmptySplit(Split),

    /// Per-point arrays of a cloud disagree in length.
    #[error("cloud {cloud:?}: {what} has {got} entries, expected {expected}")]
    LengthMismatch {
        cloud: String,
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Generation was asked to run with a point budget below one point.
    #[error("point budget must be at least 1, got {0}")]
    InvalidBudget(f64),

    /// Any other invalid configuration value.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PointBatchError>;
