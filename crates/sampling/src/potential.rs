use crate::cloud_set::IndexedCloud;
use pointbatch_core::Split;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale of the random initial potentials. Small enough that the first
/// region weight dominates, large enough to break ties.
pub const INITIAL_POTENTIAL_SCALE: f64 = 1e-3;

/// Per-point "already sampled" score of one cloud.
///
/// The minimum and its position are cached so the next sampling center can
/// be read in O(1).
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialField {
    values: Vec<f64>,
    min_value: f64,
    min_index: usize,
}

impl PotentialField {
    /// Independent uniform values in `[0, INITIAL_POTENTIAL_SCALE)`.
    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Self {
        let values = (0..len)
            .map(|_| rng.gen::<f64>() * INITIAL_POTENTIAL_SCALE)
            .collect();
        Self::from_values(values)
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        let mut field = Self {
            values,
            min_value: f64::INFINITY,
            min_index: 0,
        };
        field.refresh_min();
        field
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Cached minimum value, `+inf` for an empty field.
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Index of the cached minimum; the lowest index wins ties.
    pub fn argmin(&self) -> usize {
        self.min_index
    }

    /// Add non-negative weights at the given indices and refresh the cached
    /// minimum.
    pub fn add_weights(&mut self, weights: &[(usize, f64)]) {
        for &(idx, w) in weights {
            debug_assert!(w >= 0.0, "potential weights must be non-negative");
            self.values[idx] += w;
        }
        self.refresh_min();
    }

    fn refresh_min(&mut self) {
        let mut min_value = f64::INFINITY;
        let mut min_index = 0;
        for (i, &v) in self.values.iter().enumerate() {
            if v < min_value {
                min_value = v;
                min_index = i;
            }
        }
        self.min_value = min_value;
        self.min_index = min_index;
    }
}

/// Mutable sampling state of one generation pass over one split.
///
/// Owns a [`PotentialField`] per cloud of the split and the random stream
/// used for center jitter and dense-region subsampling. Two passes never
/// share a state.
#[derive(Debug, Clone)]
pub struct SamplingState {
    split: Split,
    fields: Vec<PotentialField>,
    pub(crate) rng: StdRng,
}

impl SamplingState {
    /// Fresh random potentials for every cloud, seeded for reproducibility.
    pub fn new(split: Split, clouds: &[IndexedCloud], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let fields = clouds
            .iter()
            .map(|c| PotentialField::random(c.len(), &mut rng))
            .collect();
        Self { split, fields, rng }
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn fields(&self) -> &[PotentialField] {
        &self.fields
    }

    pub fn field(&self, cloud: usize) -> &PotentialField {
        &self.fields[cloud]
    }

    pub(crate) fn field_mut(&mut self, cloud: usize) -> &mut PotentialField {
        &mut self.fields[cloud]
    }

    /// Cloud holding the globally least sampled point, lowest cloud index
    /// on ties.
    pub fn next_cloud(&self) -> usize {
        let mut best = 0;
        let mut best_value = f64::INFINITY;
        for (i, field) in self.fields.iter().enumerate() {
            if field.min_value() < best_value {
                best_value = field.min_value();
                best = i;
            }
        }
        best
    }

    /// `(cloud, point)` of the next sampling center.
    pub fn next_center(&self) -> (usize, usize) {
        let cloud = self.next_cloud();
        (cloud, self.fields[cloud].argmin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmin_prefers_lowest_index_on_ties() {
        let field = PotentialField::from_values(vec![0.5, 0.1, 0.1, 0.3]);
        assert_eq!(field.argmin(), 1);
        assert_eq!(field.min_value(), 0.1);
    }

    #[test]
    fn adding_weights_moves_the_minimum() {
        let mut field = PotentialField::from_values(vec![0.0, 0.2, 0.4]);
        field.add_weights(&[(0, 1.0)]);
        assert_eq!(field.argmin(), 1);
        field.add_weights(&[(1, 1.0), (2, 0.5)]);
        assert_eq!(field.argmin(), 2);
        assert_eq!(field.values(), &[1.0, 1.2, 0.9]);
    }

    #[test]
    fn empty_field_has_infinite_minimum() {
        let field = PotentialField::from_values(Vec::new());
        assert!(field.is_empty());
        assert_eq!(field.min_value(), f64::INFINITY);
    }

    #[test]
    fn random_values_are_small_and_seeded() {
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        let fa = PotentialField::random(100, &mut a);
        let fb = PotentialField::random(100, &mut b);
        assert_eq!(fa, fb);
        assert!(fa
            .values()
            .iter()
            .all(|&v| (0.0..INITIAL_POTENTIAL_SCALE).contains(&v)));
    }
}
