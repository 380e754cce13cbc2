//! Ball tree splitting rule.
//!
//! Two well-separated seeds are picked with the farthest-pair heuristic (the
//! point farthest from the first point, then the point farthest from that
//! one) and every point joins the nearer seed. Ties go to the first seed, and
//! seed scans keep the first maximum, so the split only depends on input order.

use super::partition_in_place;
use crate::common_types::{Coordinate, PointSet};
use crate::kde::metric::DistanceMetric;

/// Reorders `indices` into the two children and returns the boundary
/// (always strictly inside `1..len`).
pub(crate) fn split<F: Coordinate>(
    points: &PointSet<F>,
    indices: &mut [usize],
    metric: DistanceMetric,
) -> usize {
    let len = indices.len();
    debug_assert!(len >= 2, "cannot split fewer than two points");

    let first_seed = farthest_from(points, indices, indices[0], metric);
    let second_seed = farthest_from(points, indices, first_seed, metric);
    if metric.distance(points.point(first_seed), points.point(second_seed)) <= 0.0 {
        // No two distinct points: the node is a stack of duplicates.
        return len / 2;
    }

    let a = points.point(first_seed);
    let b = points.point(second_seed);
    let mid = partition_in_place(indices, |i| {
        let p = points.point(i);
        metric.distance(p, a) <= metric.distance(p, b)
    });
    // The first seed is at distance zero from itself and the second seed is
    // strictly closer to itself, so both sides are non-empty.
    debug_assert!(mid > 0 && mid < len, "farthest-pair split produced an empty side");
    mid
}

/// Sample index at the largest distance from `pivot`; the first one
/// encountered wins ties.
fn farthest_from<F: Coordinate>(
    points: &PointSet<F>,
    indices: &[usize],
    pivot: usize,
    metric: DistanceMetric,
) -> usize {
    let origin = points.point(pivot);
    let mut best = pivot;
    let mut best_distance = f64::NEG_INFINITY;
    for &i in indices {
        let d = metric.distance(origin, points.point(i));
        if d > best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}
