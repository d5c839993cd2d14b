use crate::error::{PointBatchError, Result};
use crate::split::Split;
use serde::{Deserialize, Serialize};

/// Per-point input features handed to the network, keyed by their width.
///
/// `Height` is the absolute z coordinate, `Points` the augmented
/// region-centered coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum FeatureComposition {
    Ones,
    OnesHeight,
    Colors,
    OnesColors,
    OnesColorsHeight,
    OnesColorsPoints,
    OnesColorsPointsHeight,
}

impl FeatureComposition {
    pub fn dim(&self) -> usize {
        match self {
            FeatureComposition::Ones => 1,
            FeatureComposition::OnesHeight => 2,
            FeatureComposition::Colors => 3,
            FeatureComposition::OnesColors => 4,
            FeatureComposition::OnesColorsHeight => 5,
            FeatureComposition::OnesColorsPoints => 7,
            FeatureComposition::OnesColorsPointsHeight => 8,
        }
    }

    pub fn has_ones(&self) -> bool {
        !matches!(self, FeatureComposition::Colors)
    }

    pub fn has_colors(&self) -> bool {
        !matches!(
            self,
            FeatureComposition::Ones | FeatureComposition::OnesHeight
        )
    }

    pub fn has_points(&self) -> bool {
        matches!(
            self,
            FeatureComposition::OnesColorsPoints | FeatureComposition::OnesColorsPointsHeight
        )
    }

    pub fn has_height(&self) -> bool {
        matches!(
            self,
            FeatureComposition::OnesHeight
                | FeatureComposition::OnesColorsHeight
                | FeatureComposition::OnesColorsPointsHeight
        )
    }

    /// Only the compositions without point coordinates randomly drop colors.
    pub fn drops_colors(&self) -> bool {
        matches!(
            self,
            FeatureComposition::OnesColors | FeatureComposition::OnesColorsHeight
        )
    }
}

impl TryFrom<usize> for FeatureComposition {
    type Error = PointBatchError;

    fn try_from(dim: usize) -> Result<Self> {
        match dim {
            1 => Ok(FeatureComposition::Ones),
            2 => Ok(FeatureComposition::OnesHeight),
            3 => Ok(FeatureComposition::Colors),
            4 => Ok(FeatureComposition::OnesColors),
            5 => Ok(FeatureComposition::OnesColorsHeight),
            7 => Ok(FeatureComposition::OnesColorsPoints),
            8 => Ok(FeatureComposition::OnesColorsPointsHeight),
            other => Err(PointBatchError::UnsupportedFeatureDim(other)),
        }
    }
}

impl From<FeatureComposition> for usize {
    fn from(f: FeatureComposition) -> usize {
        f.dim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    None,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub rotation: RotationMode,
    pub scale_min: f32,
    pub scale_max: f32,
    pub scale_anisotropic: bool,
    /// Random sign flip per axis.
    pub symmetries: [bool; 3],
    /// Std of the Gaussian jitter added to every point.
    pub noise: f32,
    /// Probability that a region keeps its colors.
    pub color: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            rotation: RotationMode::Vertical,
            scale_min: 0.8,
            scale_max: 1.2,
            scale_anisotropic: true,
            symmetries: [true, false, false],
            noise: 0.001,
            color: 0.8,
        }
    }
}

impl AugmentConfig {
    /// No rotation, unit scale, no flips, no jitter, colors always kept.
    pub fn disabled() -> Self {
        Self {
            rotation: RotationMode::None,
            scale_min: 1.0,
            scale_max: 1.0,
            scale_anisotropic: false,
            symmetries: [false; 3],
            noise: 0.0,
            color: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Total radius queries drawn across the calibration split.
    pub budget_samples: usize,
    pub budget_iterations: usize,
    pub budget_gain: f64,
    /// Center jitter of the sampled queries, as a fraction of `in_radius`.
    pub budget_noise_ratio: f32,
    pub keep_ratio: f64,
    pub samples_threshold: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            budget_samples: 10_000,
            budget_iterations: 10_000,
            budget_gain: 10.0,
            budget_noise_ratio: 0.25,
            keep_ratio: 0.8,
            samples_threshold: 10_000,
        }
    }
}

/// Generation, hierarchy and calibration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub in_radius: f32,
    /// Target number of regions per batch.
    pub batch_size: usize,
    pub epoch_steps: usize,
    pub validation_size: usize,
    pub first_subsampling_dl: f32,
    pub density_parameter: f32,
    pub num_layers: usize,
    pub in_features_dim: FeatureComposition,
    pub augment: AugmentConfig,
    pub calibration: CalibrationConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            in_radius: 10.0,
            batch_size: 6,
            epoch_steps: 500,
            validation_size: 50,
            first_subsampling_dl: 0.2,
            density_parameter: 5.0,
            num_layers: 5,
            in_features_dim: FeatureComposition::OnesColors,
            augment: AugmentConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

const BASE_NEIGHBOR_LIMITS: [usize; 5] = [26, 31, 38, 41, 39];

impl DatasetConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.in_radius.is_finite() && self.in_radius > 0.0) {
            return Err(PointBatchError::Config(format!(
                "in_radius must be > 0 and finite, got {}",
                self.in_radius
            )));
        }
        if self.batch_size == 0 {
            return Err(PointBatchError::Config("batch_size must be >= 1".to_string()));
        }
        if !(self.first_subsampling_dl.is_finite() && self.first_subsampling_dl > 0.0) {
            return Err(PointBatchError::Config(format!(
                "first_subsampling_dl must be > 0 and finite, got {}",
                self.first_subsampling_dl
            )));
        }
        if !(self.density_parameter.is_finite() && self.density_parameter > 0.0) {
            return Err(PointBatchError::Config(format!(
                "density_parameter must be > 0 and finite, got {}",
                self.density_parameter
            )));
        }
        if self.num_layers == 0 {
            return Err(PointBatchError::Config("num_layers must be >= 1".to_string()));
        }
        let aug = &self.augment;
        if !(aug.scale_min > 0.0 && aug.scale_min <= aug.scale_max) {
            return Err(PointBatchError::Config(format!(
                "augment scale range must satisfy 0 < min <= max, got [{}, {}]",
                aug.scale_min, aug.scale_max
            )));
        }
        if !(aug.noise >= 0.0 && aug.noise.is_finite()) {
            return Err(PointBatchError::Config(format!(
                "augment noise must be >= 0, got {}",
                aug.noise
            )));
        }
        if !(0.0..=1.0).contains(&aug.color) {
            return Err(PointBatchError::Config(format!(
                "augment color must be in [0, 1], got {}",
                aug.color
            )));
        }
        let cal = &self.calibration;
        if !(cal.keep_ratio > 0.0 && cal.keep_ratio <= 1.0) {
            return Err(PointBatchError::Config(format!(
                "keep_ratio must be in (0, 1], got {}",
                cal.keep_ratio
            )));
        }
        if cal.budget_samples == 0 {
            return Err(PointBatchError::Config(
                "budget_samples must be >= 1".to_string(),
            ));
        }
        if !(cal.budget_noise_ratio >= 0.0 && cal.budget_noise_ratio.is_finite()) {
            return Err(PointBatchError::Config(format!(
                "budget_noise_ratio must be >= 0, got {}",
                cal.budget_noise_ratio
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            // Unsupported feature widths surface through serde's custom error.
            let msg = e.to_string();
            match unsupported_dim(&msg) {
                Some(dim) => PointBatchError::UnsupportedFeatureDim(dim),
                None => PointBatchError::Config(format!("JSON parse error: {msg}")),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Number of regions drawn per pass over `split`.
    pub fn draws_per_pass(&self, split: Split) -> usize {
        match split {
            Split::Training => self.epoch_steps * self.batch_size,
            Split::Validation | Split::Test => self.validation_size * self.batch_size,
        }
    }

    /// Radius of the first convolution layer, `dl * dp / 2`.
    pub fn first_radius(&self) -> f32 {
        self.first_subsampling_dl * self.density_parameter / 2.0
    }

    /// Histogram width for neighbor counts: the volume of a sphere of radius
    /// `dp + 1` cells.
    pub fn max_neighbor_count(&self) -> usize {
        let r = f64::from(self.density_parameter) + 1.0;
        (4.0 / 3.0 * std::f64::consts::PI * r.powi(3)).ceil() as usize
    }

    /// Neighbor limits used until calibration has run.
    pub fn default_neighbor_limits(&self) -> Vec<usize> {
        let dp = f64::from(self.density_parameter);
        (0..self.num_layers)
            .map(|layer| {
                let base = BASE_NEIGHBOR_LIMITS[layer.min(BASE_NEIGHBOR_LIMITS.len() - 1)];
                ((base as f64 * dp) / 5.0).floor() as usize
            })
            .collect()
    }
}

fn unsupported_dim(msg: &str) -> Option<usize> {
    let prefix = "unsupported input feature dimension ";
    let start = msg.find(prefix)? + prefix.len();
    let digits: String = msg[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
