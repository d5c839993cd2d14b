use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use pointbatch_core::Cloud;

/// Static spatial index over one cloud, answering radius queries.
///
/// Built on kiddo v5's `ImmutableKdTree`, which uses a cache-optimized
/// layout for faster queries than the mutable variant. The tree is built once
/// and never modified; it stores `u32` indices into the source point slice.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    num_points: usize,
}

impl KdTree {
    /// Build a KdTree over a slice of points.
    ///
    /// # Panics
    ///
    /// Panics if the slice holds more than `u32::MAX` points.
    pub fn build(points: &[[f32; 3]]) -> Self {
        assert!(
            points.len() <= u32::MAX as usize,
            "KdTree indices are stored as u32"
        );
        if points.is_empty() {
            return Self {
                tree: ImmutableKdTree::new_from_slice(&[]),
                num_points: 0,
            };
        }

        Self {
            tree: ImmutableKdTree::new_from_slice(points),
            num_points: points.len(),
        }
    }

    pub fn from_cloud(cloud: &Cloud) -> Self {
        Self::build(&cloud.points)
    }

    /// Returns the number of points in the tree.
    pub fn len(&self) -> usize {
        self.num_points
    }

    /// Returns true if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Find all points within `radius` (Euclidean distance) of `query`.
    ///
    /// Returns indices of points where `euclidean_dist <= radius`, sorted by
    /// index.
    ///
    /// Edge cases:
    /// - Returns empty if radius <= 0, cloud is empty, radius is non-finite,
    ///   or query contains NaN.
    pub fn radius_search(&self, query: &[f32; 3], radius: f32) -> Vec<usize> {
        self.radius_search_with_sq_dist(query, radius)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Like [`radius_search`](Self::radius_search) but also returns the
    /// squared distance of every hit, sorted by index.
    pub fn radius_search_with_sq_dist(&self, query: &[f32; 3], radius: f32) -> Vec<(usize, f32)> {
        let mut hits = self.within(query, radius);
        hits.sort_unstable_by_key(|&(idx, _)| idx);
        hits
    }

    /// Indices within `radius`, nearest first. Ties on distance are broken
    /// by index so the order is deterministic.
    pub fn radius_search_nearest_first(&self, query: &[f32; 3], radius: f32) -> Vec<usize> {
        let mut hits = self.within(query, radius);
        hits.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.into_iter().map(|(idx, _)| idx).collect()
    }

    fn within(&self, query: &[f32; 3], radius: f32) -> Vec<(usize, f32)> {
        if self.is_empty()
            || radius <= 0.0
            || !radius.is_finite()
            || !query.iter().all(|v| v.is_finite())
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;

        // kiddo's `within_unsorted` uses strict `<`. To include points
        // exactly on the boundary (dist == radius), we query with a tiny
        // epsilon added, then post-filter with `<=`.
        let query_radius_sq = radius_sq + f32::EPSILON * radius_sq.max(1.0);

        self.tree
            .within_unsorted::<SquaredEuclidean>(query, query_radius_sq)
            .into_iter()
            .filter(|nn| nn.distance <= radius_sq)
            .map(|nn| (nn.item as usize, nn.distance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::KdTree;
    use proptest::prelude::*;

    fn line(xs: &[f32]) -> Vec<[f32; 3]> {
        xs.iter().map(|&x| [x, 0.0, 0.0]).collect()
    }

    #[test]
    fn radius_search_finds_points() {
        let tree = KdTree::build(&line(&[0.0, 0.5, 2.0]));
        assert_eq!(tree.radius_search(&[0.0, 0.0, 0.0], 0.75), vec![0, 1]);
    }

    #[test]
    fn radius_search_includes_own_index() {
        let pts = line(&[0.0, 3.0, 6.0]);
        let tree = KdTree::build(&pts);
        assert_eq!(tree.radius_search(&pts[1], 1.0), vec![1]);
    }

    #[test]
    fn radius_search_empty_cloud() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.radius_search(&[0.0, 0.0, 0.0], 10.0).is_empty());
    }

    #[test]
    fn radius_search_negative_radius() {
        let tree = KdTree::build(&line(&[0.0]));
        assert!(tree.radius_search(&[0.0, 0.0, 0.0], -1.0).is_empty());
    }

    #[test]
    fn radius_search_nan_query() {
        let tree = KdTree::build(&line(&[0.0]));
        assert!(tree.radius_search(&[f32::NAN, 0.0, 0.0], 1.0).is_empty());
    }

    #[test]
    fn radius_search_exact_boundary() {
        // Place a point at exactly distance 1.0 from the origin
        let tree = KdTree::build(&line(&[1.0, 5.0]));
        let idx = tree.radius_search(&[0.0, 0.0, 0.0], 1.0);
        // Point at distance exactly 1.0 should be included (<=)
        assert!(
            idx.contains(&0),
            "point at exact boundary should be included, got {:?}",
            idx
        );
        assert!(!idx.contains(&1));
    }

    #[test]
    fn squared_distances_are_reported() {
        let tree = KdTree::build(&line(&[0.0, 1.0, 2.0]));
        let hits = tree.radius_search_with_sq_dist(&[0.0, 0.0, 0.0], 1.5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1.abs() < 1e-6);
        assert_eq!(hits[1].0, 1);
        assert!((hits[1].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_first_orders_by_distance() {
        let tree = KdTree::build(&line(&[3.0, 0.0, 1.0, 2.0]));
        assert_eq!(
            tree.radius_search_nearest_first(&[0.1, 0.0, 0.0], 10.0),
            vec![1, 2, 3, 0]
        );
    }

    proptest! {
        #[test]
        fn radius_search_results_are_within_radius(
            pts in prop::collection::vec(
                (-100.0f32..100.0f32, -100.0f32..100.0f32, -100.0f32..100.0f32),
                1..200
            ),
            radius in 0.1f32..50.0f32,
        ) {
            let points: Vec<[f32; 3]> = pts.iter().map(|p| [p.0, p.1, p.2]).collect();
            let tree = KdTree::build(&points);
            let idx = tree.radius_search(&[0.0, 0.0, 0.0], radius);
            for &i in &idx {
                let [dx, dy, dz] = points[i];
                let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                prop_assert!(
                    dist <= radius + f32::EPSILON * 10.0,
                    "point {} at dist {} exceeds radius {}",
                    i,
                    dist,
                    radius,
                );
            }
        }

        #[test]
        fn radius_search_matches_brute_force(
            pts in prop::collection::vec(
                (-10.0f32..10.0f32, -10.0f32..10.0f32, -10.0f32..10.0f32),
                1..150
            ),
            radius in 0.5f32..8.0f32,
        ) {
            let points: Vec<[f32; 3]> = pts.iter().map(|p| [p.0, p.1, p.2]).collect();
            let tree = KdTree::build(&points);
            let found = tree.radius_search(&[1.0, -1.0, 0.5], radius);
            let r_sq = radius * radius;
            // Skip points within float noise of the boundary.
            for (i, p) in points.iter().enumerate() {
                let d_sq = (p[0] - 1.0).powi(2) + (p[1] + 1.0).powi(2) + (p[2] - 0.5).powi(2);
                if d_sq < r_sq * 0.999 {
                    prop_assert!(found.contains(&i), "missing {} at d_sq {}", i, d_sq);
                } else if d_sq > r_sq * 1.001 {
                    prop_assert!(!found.contains(&i), "unexpected {} at d_sq {}", i, d_sq);
                }
            }
        }
    }
}
