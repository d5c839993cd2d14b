use hashbrown::HashMap;
use rayon::prelude::*;

#[derive(Default, Clone, Copy)]
struct CellAccum {
    sx: f32,
    sy: f32,
    sz: f32,
    n: usize,
}

/// Replace the points of one sub-cloud by the barycenter of each occupied
/// grid cell. Cells are emitted in ascending `(i, j, k)` order.
pub fn grid_subsample(points: &[[f32; 3]], cell_size: f32) -> Vec<[f32; 3]> {
    assert!(
        cell_size.is_finite() && cell_size > 0.0,
        "cell_size must be > 0 and finite"
    );

    let mut cells: HashMap<(i32, i32, i32), CellAccum> = HashMap::new();

    for &[px, py, pz] in points {
        if !px.is_finite() || !py.is_finite() || !pz.is_finite() {
            continue;
        }

        let key = (
            (px / cell_size).floor() as i32,
            (py / cell_size).floor() as i32,
            (pz / cell_size).floor() as i32,
        );

        let entry = cells.entry(key).or_default();
        entry.sx += px;
        entry.sy += py;
        entry.sz += pz;
        entry.n += 1;
    }

    let mut keys: Vec<(i32, i32, i32)> = cells.keys().copied().collect();
    keys.sort_unstable();

    keys.into_iter()
        .map(|key| {
            let a = cells[&key];
            let denom = a.n as f32;
            [a.sx / denom, a.sy / denom, a.sz / denom]
        })
        .collect()
}

/// Grid-subsample every sub-cloud of a stacked point set independently.
///
/// Returns the stacked representatives and the new per-sub-cloud lengths,
/// in the input order.
pub fn batch_grid_subsample(
    points: &[[f32; 3]],
    lengths: &[usize],
    cell_size: f32,
) -> (Vec<[f32; 3]>, Vec<usize>) {
    assert_eq!(
        lengths.iter().sum::<usize>(),
        points.len(),
        "lengths must sum to the number of points"
    );

    let mut starts = Vec::with_capacity(lengths.len());
    let mut acc = 0;
    for &len in lengths {
        starts.push(acc);
        acc += len;
    }

    let parts: Vec<Vec<[f32; 3]>> = starts
        .par_iter()
        .zip(lengths.par_iter())
        .map(|(&start, &len)| grid_subsample(&points[start..start + len], cell_size))
        .collect();

    let new_lengths = parts.iter().map(Vec::len).collect();
    (parts.concat(), new_lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_cell_collapses_to_barycenter() {
        let pts = vec![
            [0.0, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [0.5, 0.5, 0.0],
            [0.0, 0.0, 0.5],
            [0.5, 0.0, 0.5],
            [0.0, 0.5, 0.5],
            [0.5, 0.5, 0.5],
        ];
        let out = grid_subsample(&pts, 1.0);
        assert_eq!(out.len(), 1);
        for v in out[0] {
            assert!((v - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(grid_subsample(&[], 1.0).is_empty());
        let (pts, lengths) = batch_grid_subsample(&[], &[], 1.0);
        assert!(pts.is_empty());
        assert!(lengths.is_empty());
    }

    #[test]
    fn sub_clouds_are_subsampled_independently() {
        // Both sub-clouds share one cell; they must not be merged.
        let pts = vec![
            [0.1, 0.1, 0.1],
            [0.2, 0.2, 0.2],
            [0.3, 0.3, 0.3],
            [5.0, 0.0, 0.0],
        ];
        let (out, lengths) = batch_grid_subsample(&pts, &[2, 2], 1.0);
        assert_eq!(lengths, vec![1, 2]);
        assert_eq!(out.len(), 3);
        assert!((out[0][0] - 0.15).abs() < 1e-6);
        assert!((out[1][0] - 0.3).abs() < 1e-6);
        assert!((out[2][0] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn output_is_deterministic() {
        let pts: Vec<[f32; 3]> = (0..200)
            .map(|i| [(i as f32 * 0.37) % 3.0, (i as f32 * 0.11) % 2.0, (i as f32 * 0.07) % 1.0])
            .collect();
        let a = batch_grid_subsample(&pts, &[120, 80], 0.5);
        let b = batch_grid_subsample(&pts, &[120, 80], 0.5);
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic]
    fn zero_cell_size_panics() {
        let _ = grid_subsample(&[[0.0; 3]], 0.0);
    }

    proptest! {
        #[test]
        fn subsampling_never_increases_points(
            pts in prop::collection::vec((-100.0f32..100.0f32, -100.0f32..100.0f32, -100.0f32..100.0f32), 1..1000),
            cell_size in 0.01f32..10.0f32,
            split in 0usize..1000,
        ) {
            let points: Vec<[f32; 3]> = pts.iter().map(|p| [p.0, p.1, p.2]).collect();
            let first = split.min(points.len());
            let lengths = [first, points.len() - first];
            let (out, new_lengths) = batch_grid_subsample(&points, &lengths, cell_size);
            prop_assert_eq!(out.len(), new_lengths.iter().sum::<usize>());
            for (new_len, old_len) in new_lengths.iter().zip(lengths) {
                prop_assert!(*new_len <= old_len);
                prop_assert_eq!(*new_len == 0, old_len == 0);
            }
        }
    }
}
