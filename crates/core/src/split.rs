use crate::error::{PointBatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dataset partition a cloud belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Training,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Training, Split::Validation, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }

    /// Test clouds carry no usable labels.
    pub fn is_labelled(&self) -> bool {
        !matches!(self, Split::Test)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = PointBatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "training" => Ok(Split::Training),
            "validation" => Ok(Split::Validation),
            "test" => Ok(Split::Test),
            other => Err(PointBatchError::UnknownSplit(other.to_string())),
        }
    }
}

/// Static cloud name to split assignment.
///
/// Names listed in neither `validation` nor `test` are training clouds. With
/// `trainval` set, validation clouds are folded into training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitTable {
    #[serde(default)]
    pub validation: Vec<String>,
    #[serde(default)]
    pub test: Vec<String>,
    #[serde(default)]
    pub trainval: bool,
}

impl SplitTable {
    pub fn new(validation: Vec<String>, test: Vec<String>) -> Self {
        Self {
            validation,
            test,
            trainval: false,
        }
    }

    /// Block layout of the SensatUrban release.
    pub fn sensat_urban() -> Self {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self::new(
            names(&[
                "birmingham_block_1",
                "birmingham_block_5",
                "cambridge_block_10",
                "cambridge_block_7",
            ]),
            names(&[
                "birmingham_block_2",
                "birmingham_block_8",
                "cambridge_block_15",
                "cambridge_block_22",
                "cambridge_block_16",
                "cambridge_block_27",
            ]),
        )
    }

    pub fn with_trainval(mut self, trainval: bool) -> Self {
        self.trainval = trainval;
        self
    }

    pub fn assign(&self, name: &str) -> Split {
        if self.test.iter().any(|n| n == name) {
            Split::Test
        } else if self.validation.iter().any(|n| n == name) && !self.trainval {
            Split::Validation
        } else {
            Split::Training
        }
    }
}
