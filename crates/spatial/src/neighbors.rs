use crate::kdtree::KdTree;
use rayon::prelude::*;

/// Fixed-width neighbor index matrix.
///
/// Row `i` lists neighbor indices of query point `i` into a support set of
/// `support_len` points. Missing entries hold the sentinel `support_len`,
/// which is never a valid index, so the true neighbor count of a row is the
/// number of entries below `support_len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborMatrix {
    rows: usize,
    width: usize,
    support_len: usize,
    data: Vec<u32>,
}

impl NeighborMatrix {
    /// A matrix with no rows, used where a layer has no relation.
    pub fn empty(support_len: usize) -> Self {
        Self {
            rows: 0,
            width: 0,
            support_len,
            data: Vec::new(),
        }
    }

    /// Pack ragged neighbor lists. The width is the longest list clipped to
    /// `limit`; longer lists are truncated, shorter ones sentinel-padded.
    ///
    /// # Panics
    ///
    /// Panics if an index is not below `support_len` or `support_len`
    /// exceeds `u32::MAX`.
    pub fn from_rows(lists: &[Vec<usize>], support_len: usize, limit: usize) -> Self {
        assert!(
            support_len <= u32::MAX as usize,
            "support set too large for u32 indices"
        );
        let width = lists.iter().map(Vec::len).max().unwrap_or(0).min(limit);
        let sentinel = support_len as u32;
        let mut data = vec![sentinel; lists.len() * width];

        for (row, list) in data.chunks_exact_mut(width.max(1)).zip(lists) {
            for (slot, &idx) in row.iter_mut().zip(list.iter().take(width)) {
                assert!(idx < support_len, "neighbor index {idx} out of range");
                *slot = idx as u32;
            }
        }

        Self {
            rows: lists.len(),
            width,
            support_len,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn support_len(&self) -> usize {
        self.support_len
    }

    pub fn sentinel(&self) -> u32 {
        self.support_len as u32
    }

    pub fn row(&self, i: usize) -> &[u32] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.data
    }

    /// Number of non-sentinel entries per row.
    pub fn neighbor_counts(&self) -> Vec<usize> {
        let sentinel = self.sentinel();
        self.iter_rows()
            .map(|row| row.iter().filter(|&&idx| idx < sentinel).count())
            .collect()
    }
}

fn offsets(lengths: &[usize]) -> Vec<usize> {
    let mut acc = 0;
    lengths
        .iter()
        .map(|&len| {
            let start = acc;
            acc += len;
            start
        })
        .collect()
}

/// Radius neighbors of stacked query points among stacked support points,
/// restricted to the same sub-cloud.
///
/// `queries` and `supports` are each the concatenation of sub-clouds whose
/// sizes are given by `query_lengths` and `support_lengths`, in the same
/// order. A query point of sub-cloud `b` only ever sees support points of
/// sub-cloud `b`. Neighbors are listed nearest first, at most `limit` per
/// row, indices refer to the whole stacked support set.
///
/// # Panics
///
/// Panics if the two length arrays differ in size or do not sum to the
/// number of points they describe.
pub fn batch_neighbors(
    queries: &[[f32; 3]],
    supports: &[[f32; 3]],
    query_lengths: &[usize],
    support_lengths: &[usize],
    radius: f32,
    limit: usize,
) -> NeighborMatrix {
    assert_eq!(
        query_lengths.len(),
        support_lengths.len(),
        "query and support must have the same number of sub-clouds"
    );
    assert_eq!(
        query_lengths.iter().sum::<usize>(),
        queries.len(),
        "query lengths must sum to the number of query points"
    );
    assert_eq!(
        support_lengths.iter().sum::<usize>(),
        supports.len(),
        "support lengths must sum to the number of support points"
    );

    let q_offsets = offsets(query_lengths);
    let s_offsets = offsets(support_lengths);

    let lists: Vec<Vec<usize>> = (0..query_lengths.len())
        .into_par_iter()
        .map(|b| {
            let q = &queries[q_offsets[b]..q_offsets[b] + query_lengths[b]];
            let s_start = s_offsets[b];
            let tree = KdTree::build(&supports[s_start..s_start + support_lengths[b]]);
            q.iter()
                .map(|point| {
                    tree.radius_search_nearest_first(point, radius)
                        .into_iter()
                        .take(limit)
                        .map(|j| j + s_start)
                        .collect()
                })
                .collect::<Vec<Vec<usize>>>()
        })
        .flatten()
        .collect();

    NeighborMatrix::from_rows(&lists, supports.len(), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn from_rows_pads_with_sentinel() {
        let m = NeighborMatrix::from_rows(&[vec![0, 1, 2], vec![3]], 5, 10);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.width(), 3);
        assert_eq!(m.row(0), &[0, 1, 2]);
        assert_eq!(m.row(1), &[3, 5, 5]);
        assert_eq!(m.neighbor_counts(), vec![3, 1]);
    }

    #[test]
    fn from_rows_truncates_to_limit() {
        let m = NeighborMatrix::from_rows(&[vec![4, 3, 2, 1], vec![0]], 5, 2);
        assert_eq!(m.width(), 2);
        assert_eq!(m.row(0), &[4, 3]);
        assert_eq!(m.row(1), &[0, 5]);
    }

    #[test]
    fn from_rows_all_empty() {
        let m = NeighborMatrix::from_rows(&[vec![], vec![]], 3, 4);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.width(), 0);
        assert!(m.as_slice().is_empty());
        assert_eq!(m.neighbor_counts(), vec![0, 0]);
    }

    #[test]
    fn empty_matrix_has_no_rows() {
        let m = NeighborMatrix::empty(7);
        assert_eq!(m.rows(), 0);
        assert_eq!(m.sentinel(), 7);
        assert!(m.neighbor_counts().is_empty());
    }

    #[test]
    fn neighbors_do_not_leak_across_sub_clouds() {
        // Two sub-clouds stacked on top of each other at the same location.
        let pts = vec![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.2, 0.0, 0.0],
        ];
        let lengths = [2, 3];
        let m = batch_neighbors(&pts, &pts, &lengths, &lengths, 1.0, 10);
        assert_eq!(m.rows(), 5);
        assert_eq!(m.width(), 3);
        for i in 0..2 {
            for &j in m.row(i) {
                assert!(j < 2 || j == m.sentinel(), "row {i} leaked to {j}");
            }
        }
        for i in 2..5 {
            for &j in m.row(i) {
                assert!((2..5).contains(&j), "row {i} leaked to {j}");
            }
        }
    }

    #[test]
    fn neighbors_are_nearest_first_and_include_self() {
        let pts = vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.9, 0.0, 0.0]];
        let m = batch_neighbors(&pts, &pts, &[3], &[3], 1.0, 10);
        assert_eq!(m.row(0), &[0, 1, 2]);
        assert_eq!(m.row(2), &[2, 1, 0]);
    }

    #[test]
    fn query_and_support_sets_may_differ() {
        let queries = vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]];
        let supports = vec![[0.2, 0.0, 0.0], [5.0, 0.0, 0.0], [10.1, 0.0, 0.0]];
        let m = batch_neighbors(&queries, &supports, &[1, 1], &[2, 1], 1.0, 4);
        assert_eq!(m.support_len(), 3);
        assert_eq!(m.row(0), &[0]);
        assert_eq!(m.row(1), &[2]);
    }

    #[test]
    fn empty_sub_cloud_yields_empty_rows() {
        let queries = vec![[0.0, 0.0, 0.0]];
        let supports: Vec<[f32; 3]> = Vec::new();
        let m = batch_neighbors(&queries, &supports, &[1], &[0], 1.0, 4);
        assert_eq!(m.rows(), 1);
        assert_eq!(m.neighbor_counts(), vec![0]);
    }

    #[test]
    #[should_panic]
    fn mismatched_lengths_panic() {
        let pts = vec![[0.0, 0.0, 0.0]; 3];
        let _ = batch_neighbors(&pts, &pts, &[1, 2], &[3], 1.0, 4);
    }

    proptest! {
        #[test]
        fn entries_never_exceed_support_len(
            seed in 0u64..1000,
            sizes in prop::collection::vec(0usize..40, 1..5),
            radius in 0.05f32..2.0,
            limit in 1usize..30,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let total: usize = sizes.iter().sum();
            let pts: Vec<[f32; 3]> = (0..total)
                .map(|_| [rng.gen_range(0.0f32..2.0), rng.gen_range(0.0f32..2.0), rng.gen_range(0.0f32..2.0)])
                .collect();
            let m = batch_neighbors(&pts, &pts, &sizes, &sizes, radius, limit);
            prop_assert_eq!(m.rows(), total);
            prop_assert!(m.width() <= limit);
            for &idx in m.as_slice() {
                prop_assert!(idx as usize <= total);
            }
            // Every row of a self query sees at least itself unless the
            // matrix has zero width.
            if m.width() > 0 {
                for count in m.neighbor_counts() {
                    prop_assert!(count >= 1);
                }
            }
        }
    }
}
