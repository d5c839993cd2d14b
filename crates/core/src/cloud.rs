use crate::error::{PointBatchError, Result};
use crate::split::Split;

/// One pre-subsampled scene: coordinates, colors and (optionally) labels.
///
/// All per-point arrays have the same length. Test clouds may carry no
/// labels at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Cloud {
    pub name: String,
    pub split: Split,
    pub points: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub labels: Option<Vec<i32>>,
}

impl Cloud {
    pub fn new(
        name: impl Into<String>,
        split: Split,
        points: Vec<[f32; 3]>,
        colors: Vec<[f32; 3]>,
        labels: Option<Vec<i32>>,
    ) -> Result<Self> {
        let name = name.into();
        let n = points.len();

        if colors.len() != n {
            return Err(PointBatchError::LengthMismatch {
                cloud: name,
                what: "colors",
                expected: n,
                got: colors.len(),
            });
        }
        if let Some(labels) = &labels {
            if labels.len() != n {
                return Err(PointBatchError::LengthMismatch {
                    cloud: name,
                    what: "labels",
                    expected: n,
                    got: labels.len(),
                });
            }
        }

        Ok(Self {
            name,
            split,
            points,
            colors,
            labels,
        })
    }

    /// Build from separate coordinate columns with black colors and no
    /// labels.
    pub fn from_xyz(name: impl Into<String>, split: Split, x: &[f32], y: &[f32], z: &[f32]) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        let points: Vec<[f32; 3]> = x
            .iter()
            .zip(y)
            .zip(z)
            .map(|((x, y), z)| [*x, *y, *z])
            .collect();
        let colors = vec![[0.0; 3]; points.len()];

        Self {
            name: name.into(),
            split,
            points,
            colors,
            labels: None,
        }
    }

    /// Build from interleaved `xyz` and `rgb` buffers.
    pub fn from_interleaved(
        name: impl Into<String>,
        split: Split,
        xyz: &[f32],
        rgb: &[f32],
        labels: Option<Vec<i32>>,
    ) -> Result<Self> {
        let name = name.into();
        if xyz.len() % 3 != 0 {
            return Err(PointBatchError::LengthMismatch {
                cloud: name,
                what: "interleaved xyz",
                expected: xyz.len() / 3 * 3,
                got: xyz.len(),
            });
        }
        if rgb.len() != xyz.len() {
            return Err(PointBatchError::LengthMismatch {
                cloud: name,
                what: "interleaved rgb",
                expected: xyz.len(),
                got: rgb.len(),
            });
        }

        let points = xyz.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        let colors = rgb.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Self::new(name, split, points, colors, labels)
    }

    pub fn with_labels(mut self, labels: Vec<i32>) -> Result<Self> {
        if labels.len() != self.len() {
            return Err(PointBatchError::LengthMismatch {
                cloud: self.name,
                what: "labels",
                expected: self.points.len(),
                got: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.points.len(), self.colors.len());
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        self.points[i]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.points.iter().copied()
    }
}
