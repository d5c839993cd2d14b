use nalgebra::{Matrix3, Rotation3, Vector3};
use pointbatch_core::{AugmentConfig, PointBatchError, Result, RotationMode};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f32::consts::PI;

/// Transform drawn for one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionTransform {
    pub rotation: Matrix3<f32>,
    /// Per-axis scale, sign flips included.
    pub scale: Vector3<f32>,
}

impl RegionTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    /// `scale * (rotation * p)`, without noise.
    pub fn apply(&self, p: [f32; 3]) -> [f32; 3] {
        let q = (self.rotation * Vector3::from(p)).component_mul(&self.scale);
        [q.x, q.y, q.z]
    }

    pub fn rotation_rows(&self) -> [[f32; 3]; 3] {
        let m = &self.rotation;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn scale_array(&self) -> [f32; 3] {
        [self.scale.x, self.scale.y, self.scale.z]
    }
}

/// Random per-region rotation, scaling, flipping and jitter.
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
    noise: Option<Normal<f32>>,
}

impl Augmenter {
    pub fn new(config: AugmentConfig) -> Result<Self> {
        if !(config.scale_min > 0.0 && config.scale_min <= config.scale_max) {
            return Err(PointBatchError::Config(format!(
                "augment scale range must satisfy 0 < min <= max, got [{}, {}]",
                config.scale_min, config.scale_max
            )));
        }
        let noise = if config.noise > 0.0 {
            let normal = Normal::new(0.0, config.noise)
                .map_err(|e| PointBatchError::Config(format!("augment noise: {e}")))?;
            Some(normal)
        } else {
            None
        };
        Ok(Self { config, noise })
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    /// Draw one region transform.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> RegionTransform {
        let rotation = match self.config.rotation {
            RotationMode::Vertical => {
                let theta = rng.gen_range(0.0..2.0 * PI);
                Rotation3::from_axis_angle(&Vector3::z_axis(), theta).into_inner()
            }
            RotationMode::None => Matrix3::identity(),
        };

        let (lo, hi) = (self.config.scale_min, self.config.scale_max);
        let mut scale = if self.config.scale_anisotropic {
            Vector3::new(
                rng.gen_range(lo..=hi),
                rng.gen_range(lo..=hi),
                rng.gen_range(lo..=hi),
            )
        } else {
            Vector3::repeat(rng.gen_range(lo..=hi))
        };
        for (axis, &flip) in self.config.symmetries.iter().enumerate() {
            if flip && rng.gen_bool(0.5) {
                scale[axis] = -scale[axis];
            }
        }

        RegionTransform { rotation, scale }
    }

    /// Transform every region of a stacked point set and add jitter.
    ///
    /// Returns the augmented points and one transform per region.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        points: &[[f32; 3]],
        lengths: &[usize],
        rng: &mut R,
    ) -> (Vec<[f32; 3]>, Vec<RegionTransform>) {
        debug_assert_eq!(lengths.iter().sum::<usize>(), points.len());

        let transforms: Vec<RegionTransform> = lengths.iter().map(|_| self.draw(rng)).collect();
        let mut out = Vec::with_capacity(points.len());
        let mut start = 0;
        for (t, &len) in transforms.iter().zip(lengths) {
            for &p in &points[start..start + len] {
                let mut q = t.apply(p);
                if let Some(noise) = &self.noise {
                    for c in &mut q {
                        *c += noise.sample(rng);
                    }
                }
                out.push(q);
            }
            start += len;
        }

        (out, transforms)
    }
}
