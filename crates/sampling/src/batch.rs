use crate::region::Region;
use std::ops::Range;

/// Budget-bounded concatenation of regions, the unit handed to the model.
///
/// `lengths` sums to the number of stacked points and holds one entry per
/// region, as does `cloud_indices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Region-centered coordinates.
    pub points: Vec<[f32; 3]>,
    /// Color followed by absolute coordinate.
    pub features: Vec<[f32; 6]>,
    pub labels: Vec<i32>,
    pub lengths: Vec<usize>,
    /// Index of every point in its source cloud.
    pub point_indices: Vec<usize>,
    pub cloud_indices: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn num_regions(&self) -> usize {
        self.lengths.len()
    }

    /// Row range of every region in the stacked arrays.
    pub fn region_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.lengths.iter().scan(0, |start, &len| {
            let range = *start..*start + len;
            *start += len;
            Some(range)
        })
    }

    /// Region of every stacked point.
    pub fn region_of_points(&self) -> Vec<usize> {
        self.lengths
            .iter()
            .enumerate()
            .flat_map(|(r, &len)| std::iter::repeat(r).take(len))
            .collect()
    }

    fn append(&mut self, region: Region) {
        self.lengths.push(region.len());
        self.cloud_indices.push(region.cloud_index);
        self.features.extend(
            region
                .colors
                .iter()
                .zip(&region.absolute)
                .map(|(c, a)| [c[0], c[1], c[2], a[0], a[1], a[2]]),
        );
        self.points.extend(region.points);
        self.labels.extend(region.labels);
        self.point_indices.extend(region.point_indices);
    }
}

/// Packs a stream of regions into batches of at most `budget` points.
///
/// A region that would overflow a non-empty batch closes it first. A single
/// region larger than the budget still forms a batch on its own. Empty
/// regions are dropped without closing anything.
#[derive(Debug, Clone)]
pub struct BatchAssembler {
    budget: usize,
    pending: Batch,
    running: usize,
}

impl BatchAssembler {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            pending: Batch::default(),
            running: 0,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Points accumulated in the open batch.
    pub fn pending_points(&self) -> usize {
        self.running
    }

    /// Add a region, returning the batch it closed, if any.
    pub fn push(&mut self, region: Region) -> Option<Batch> {
        let n = region.len();

        let emitted = if self.running + n > self.budget && !self.pending.lengths.is_empty() {
            Some(self.take())
        } else {
            None
        };

        if n > 0 {
            self.pending.append(region);
        }
        self.running += n;

        emitted
    }

    /// Emit whatever is left, if anything.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.pending.lengths.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Batch {
        self.running = 0;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn region(cloud_index: usize, n: usize) -> Region {
        Region {
            cloud_index,
            center: [0.0; 3],
            radius: 1.0,
            point_indices: (0..n).collect(),
            points: vec![[0.1, 0.2, 0.3]; n],
            absolute: vec![[1.0, 2.0, 3.0]; n],
            colors: vec![[0.5, 0.6, 0.7]; n],
            labels: vec![1; n],
        }
    }

    fn assemble(budget: usize, sizes: &[usize]) -> Vec<Batch> {
        let mut assembler = BatchAssembler::new(budget);
        let mut out: Vec<Batch> = sizes
            .iter()
            .enumerate()
            .filter_map(|(i, &n)| assembler.push(region(i, n)))
            .collect();
        out.extend(assembler.flush());
        out
    }

    #[test]
    fn regions_pack_under_budget() {
        let batches = assemble(10, &[4, 5, 3, 6]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].lengths, vec![4, 5]);
        assert_eq!(batches[0].cloud_indices, vec![0, 1]);
        assert_eq!(batches[1].lengths, vec![3, 6]);
        assert_eq!(batches[1].cloud_indices, vec![2, 3]);
    }

    #[test]
    fn exact_fit_does_not_close_batch() {
        let batches = assemble(10, &[4, 6, 1]);
        assert_eq!(batches[0].lengths, vec![4, 6]);
        assert_eq!(batches[1].lengths, vec![1]);
    }

    #[test]
    fn oversized_first_region_is_emitted_alone() {
        let batches = assemble(10, &[15, 2]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].lengths, vec![15]);
        assert_eq!(batches[1].lengths, vec![2]);
    }

    #[test]
    fn empty_regions_contribute_nothing() {
        let batches = assemble(10, &[0, 4, 0, 0, 5]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].lengths, vec![4, 5]);
        assert_eq!(batches[0].cloud_indices, vec![1, 4]);
    }

    #[test]
    fn only_empty_regions_flush_nothing() {
        assert!(assemble(10, &[0, 0, 0]).is_empty());
    }

    #[test]
    fn features_are_colors_then_absolute_coordinates() {
        let batches = assemble(10, &[2]);
        assert_eq!(batches[0].features[0], [0.5, 0.6, 0.7, 1.0, 2.0, 3.0]);
        assert_eq!(batches[0].points[1], [0.1, 0.2, 0.3]);
        assert_eq!(batches[0].labels, vec![1, 1]);
        assert_eq!(batches[0].point_indices, vec![0, 1]);
    }

    #[test]
    fn region_ranges_cover_stacked_rows() {
        let batches = assemble(100, &[3, 1, 2]);
        let ranges: Vec<_> = batches[0].region_ranges().collect();
        assert_eq!(ranges, vec![0..3, 3..4, 4..6]);
        assert_eq!(batches[0].region_of_points(), vec![0, 0, 0, 1, 2, 2]);
    }

    proptest! {
        #[test]
        fn batches_respect_budget_and_keep_every_point(
            budget in 1usize..200,
            sizes in prop::collection::vec(0usize..120, 0..60),
        ) {
            let batches = assemble(budget, &sizes);
            let total: usize = sizes.iter().sum();
            prop_assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), total);
            for batch in &batches {
                prop_assert!(batch.num_regions() >= 1);
                prop_assert_eq!(batch.lengths.iter().sum::<usize>(), batch.len());
                prop_assert_eq!(batch.features.len(), batch.len());
                prop_assert_eq!(batch.labels.len(), batch.len());
                prop_assert_eq!(batch.point_indices.len(), batch.len());
                prop_assert_eq!(batch.cloud_indices.len(), batch.num_regions());
                // Over budget only as a lone region.
                prop_assert!(batch.len() <= budget || batch.num_regions() == 1);
            }
        }
    }
}
