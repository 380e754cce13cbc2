//! K-d tree splitting rule.
//!
//! A node is cut on the dimension of its bounding box with the largest
//! extent, at the midpoint of that extent. Ties go to the lowest dimension.

use super::partition_in_place;
use super::region::BoundingRegion;
use crate::common_types::{Coordinate, PointSet};

/// Reorders `indices` so that `indices[..mid]` and `indices[mid..]` are the
/// two children, and returns `mid` (always strictly inside `1..len`).
///
/// `region` must be the bounding box of the points at `indices`.
pub(crate) fn split<F: Coordinate>(
    points: &PointSet<F>,
    indices: &mut [usize],
    region: &BoundingRegion,
) -> usize {
    let len = indices.len();
    debug_assert!(len >= 2, "cannot split fewer than two points");

    let (lower, upper) = match region {
        BoundingRegion::Box { lower, upper } => (lower, upper),
        // Not produced by the k-d builder; split evenly.
        BoundingRegion::Ball { .. } => return len / 2,
    };

    let (split_dim, spread) = widest_dimension(lower, upper);
    if spread <= 0.0 {
        // Every point is identical: any even split keeps leaves within size.
        return len / 2;
    }

    let cut = lower[split_dim] + 0.5 * spread;
    let coord = |i: usize| -> f64 { points.point(i)[split_dim].as_() };
    let mid = partition_in_place(indices, |i| coord(i) < cut);
    if mid > 0 && mid < len {
        return mid;
    }

    // The midpoint failed to separate anything (can only happen when the
    // extent is a handful of ulps wide). Fall back to the median.
    let median = len / 2;
    indices.select_nth_unstable_by(median, |&a, &b| {
        coord(a)
            .partial_cmp(&coord(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    median
}

/// `(dimension, extent)` of the widest axis; the first one wins ties.
fn widest_dimension(lower: &[f64], upper: &[f64]) -> (usize, f64) {
    let mut best_dim = 0;
    let mut best_spread = f64::NEG_INFINITY;
    for (dim, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
        let spread = hi - lo;
        if spread > best_spread {
            best_spread = spread;
            best_dim = dim;
        }
    }
    (best_dim, best_spread)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_points(rows: &[&[f64]]) -> PointSet<f64> {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        PointSet::from_rows(&rows).expect("test rows are valid")
    }

    #[test]
    fn test_splits_on_widest_dimension_at_midpoint() {
        // x spans 0..10, y spans 0..2: cut at x = 5.
        let points = make_points(&[&[0.0, 0.0], &[9.0, 1.0], &[4.0, 2.0], &[10.0, 0.5], &[6.0, 1.5]]);
        let mut indices: Vec<usize> = (0..5).collect();
        let region = BoundingRegion::bounding_box(&points, &indices);
        let mid = split(&points, &mut indices, &region);
        assert_eq!(mid, 2, "two points lie left of x = 5");
        let mut left = indices[..mid].to_vec();
        left.sort_unstable();
        assert_eq!(left, vec![0, 2], "points 0 and 2 should go left");
    }

    #[test]
    fn test_tie_break_picks_lowest_dimension() {
        assert_eq!(widest_dimension(&[0.0, 0.0, 0.0], &[3.0, 3.0, 1.0]), (0, 3.0));
        assert_eq!(widest_dimension(&[0.0, 0.0, 0.0], &[1.0, 3.0, 3.0]), (1, 3.0));
    }

    #[test]
    fn test_identical_points_split_evenly() {
        let points = make_points(&[&[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]]);
        let mut indices: Vec<usize> = (0..4).collect();
        let region = BoundingRegion::bounding_box(&points, &indices);
        assert_eq!(split(&points, &mut indices, &region), 2);
    }

    #[test]
    fn test_split_is_deterministic() {
        let points = make_points(&[&[3.0], &[1.0], &[4.0], &[1.0], &[5.0], &[9.0], &[2.0], &[6.0]]);
        let region = BoundingRegion::bounding_box(&points, &(0..8).collect::<Vec<_>>());
        let mut first: Vec<usize> = (0..8).collect();
        let mut second: Vec<usize> = (0..8).collect();
        let mid_a = split(&points, &mut first, &region);
        let mid_b = split(&points, &mut second, &region);
        assert_eq!((mid_a, first), (mid_b, second), "same input must give the same partition");
    }
}
