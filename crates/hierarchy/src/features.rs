use pointbatch_core::FeatureComposition;
use rand::Rng;

/// Row-major per-point feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    dim: usize,
    data: Vec<f32>,
}

impl Features {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Decide per region whether its colors survive, each with probability
/// `keep`.
pub fn color_mask<R: Rng + ?Sized>(regions: usize, keep: f32, rng: &mut R) -> Vec<bool> {
    (0..regions).map(|_| rng.gen::<f32>() < keep).collect()
}

/// Stack the network input features.
///
/// `raw` holds color followed by absolute coordinate per point, `points`
/// the augmented centered coordinates. Regions whose `keep_colors` entry is
/// false get black colors.
pub fn compose(
    composition: FeatureComposition,
    points: &[[f32; 3]],
    raw: &[[f32; 6]],
    lengths: &[usize],
    keep_colors: &[bool],
) -> Features {
    assert_eq!(points.len(), raw.len(), "points and raw features must align");
    assert_eq!(lengths.len(), keep_colors.len(), "one color flag per region");

    let dim = composition.dim();
    let mut data = Vec::with_capacity(points.len() * dim);
    let owners = lengths
        .iter()
        .zip(keep_colors)
        .flat_map(|(&len, &keep)| std::iter::repeat(keep).take(len));

    for ((p, f), keep) in points.iter().zip(raw).zip(owners) {
        if composition.has_ones() {
            data.push(1.0);
        }
        if composition.has_colors() {
            let s = if keep { 1.0 } else { 0.0 };
            data.extend([f[0] * s, f[1] * s, f[2] * s]);
        }
        if composition.has_points() {
            data.extend(p);
        }
        if composition.has_height() {
            data.push(f[5]);
        }
    }

    debug_assert_eq!(data.len(), points.len() * dim);
    Features { dim, data }
}
