//! Geometric summaries of tree nodes.
//!
//! The distance bounds here are what pruning soundness rests on: for every
//! sample `x` enclosed by a region and every query `q`,
//! `min_distance(q) <= d(q, x) <= max_distance(q)` must hold.

use crate::common_types::{Coordinate, PointSet};
use crate::kde::metric::DistanceMetric;

#[derive(Debug, Clone, PartialEq)]
pub enum BoundingRegion {
    /// Axis-aligned box, one `[lower, upper]` interval per dimension.
    Box { lower: Vec<f64>, upper: Vec<f64> },
    /// Centroid plus covering radius under the tree's metric.
    Ball { centroid: Vec<f64>, radius: f64 },
}

impl BoundingRegion {
    /// Tight bounding box of the points at `indices`.
    pub fn bounding_box<F: Coordinate>(points: &PointSet<F>, indices: &[usize]) -> Self {
        let dim = points.dim();
        let mut lower = vec![f64::INFINITY; dim];
        let mut upper = vec![f64::NEG_INFINITY; dim];
        for &i in indices {
            for (k, &c) in points.point(i).iter().enumerate() {
                let c: f64 = c.as_();
                if c < lower[k] {
                    lower[k] = c;
                }
                if c > upper[k] {
                    upper[k] = c;
                }
            }
        }
        BoundingRegion::Box { lower, upper }
    }

    /// Ball centred on the mean of the points at `indices`, with the radius
    /// reaching the farthest of them under `metric`.
    pub fn bounding_ball<F: Coordinate>(
        points: &PointSet<F>,
        indices: &[usize],
        metric: DistanceMetric,
    ) -> Self {
        let centroid = centroid(points, indices);
        let radius = indices
            .iter()
            .map(|&i| metric.distance(&centroid[..], points.point(i)))
            .fold(0.0, f64::max);
        BoundingRegion::Ball { centroid, radius }
    }

    pub fn dim(&self) -> usize {
        match self {
            BoundingRegion::Box { lower, .. } => lower.len(),
            BoundingRegion::Ball { centroid, .. } => centroid.len(),
        }
    }

    /// Smallest possible distance from `q` to any point in the region.
    #[inline]
    pub fn min_distance_to_point<F: Coordinate>(&self, q: &[F], metric: DistanceMetric) -> f64 {
        match self {
            BoundingRegion::Box { lower, upper } => {
                metric.combine(q.iter().zip(lower.iter().zip(upper.iter())).map(|(&c, (&lo, &hi))| {
                    let c: f64 = c.as_();
                    (lo - c).max(c - hi).max(0.0)
                }))
            }
            BoundingRegion::Ball { centroid, radius } => {
                (metric.distance(q, &centroid[..]) - radius).max(0.0)
            }
        }
    }

    /// Largest possible distance from `q` to any point in the region.
    #[inline]
    pub fn max_distance_to_point<F: Coordinate>(&self, q: &[F], metric: DistanceMetric) -> f64 {
        match self {
            BoundingRegion::Box { lower, upper } => {
                metric.combine(q.iter().zip(lower.iter().zip(upper.iter())).map(|(&c, (&lo, &hi))| {
                    let c: f64 = c.as_();
                    (c - lo).abs().max((hi - c).abs())
                }))
            }
            BoundingRegion::Ball { centroid, radius } => metric.distance(q, &centroid[..]) + radius,
        }
    }

    /// `(min, max)` distance between any point of `self` and any point of `other`.
    pub fn distance_bounds(&self, other: &BoundingRegion, metric: DistanceMetric) -> (f64, f64) {
        match (self, other) {
            (
                BoundingRegion::Box { lower: lo_a, upper: hi_a },
                BoundingRegion::Box { lower: lo_b, upper: hi_b },
            ) => {
                let axes = || lo_a.iter().zip(hi_a.iter()).zip(lo_b.iter().zip(hi_b.iter()));
                let min = metric.combine(
                    axes().map(|((&la, &ha), (&lb, &hb))| (lb - ha).max(la - hb).max(0.0)),
                );
                let max = metric.combine(axes().map(|((&la, &ha), (&lb, &hb))| (hb - la).max(ha - lb)));
                (min, max)
            }
            (
                BoundingRegion::Ball { centroid: c_a, radius: r_a },
                BoundingRegion::Ball { centroid: c_b, radius: r_b },
            ) => {
                let d = metric.distance(&c_a[..], &c_b[..]);
                ((d - r_a - r_b).max(0.0), d + r_a + r_b)
            }
            (region @ BoundingRegion::Box { .. }, BoundingRegion::Ball { centroid, radius })
            | (BoundingRegion::Ball { centroid, radius }, region @ BoundingRegion::Box { .. }) => {
                let min = (region.min_distance_to_point(&centroid[..], metric) - radius).max(0.0);
                let max = region.max_distance_to_point(&centroid[..], metric) + radius;
                (min, max)
            }
        }
    }

    /// Whether `point` lies inside the region, up to `tolerance`.
    pub fn contains_point<F: Coordinate>(&self, point: &[F], metric: DistanceMetric, tolerance: f64) -> bool {
        match self {
            BoundingRegion::Box { lower, upper } => point
                .iter()
                .zip(lower.iter().zip(upper.iter()))
                .all(|(&c, (&lo, &hi))| {
                    let c: f64 = c.as_();
                    c >= lo - tolerance && c <= hi + tolerance
                }),
            BoundingRegion::Ball { centroid, radius } => {
                metric.distance(point, &centroid[..]) <= radius + tolerance
            }
        }
    }

    /// Whether `other` lies entirely inside the region, up to `tolerance`.
    pub fn contains_region(&self, other: &BoundingRegion, metric: DistanceMetric, tolerance: f64) -> bool {
        match (self, other) {
            (
                BoundingRegion::Box { lower, upper },
                BoundingRegion::Box { lower: inner_lo, upper: inner_hi },
            ) => lower
                .iter()
                .zip(upper.iter())
                .zip(inner_lo.iter().zip(inner_hi.iter()))
                .all(|((&lo, &hi), (&ilo, &ihi))| ilo >= lo - tolerance && ihi <= hi + tolerance),
            (
                BoundingRegion::Ball { centroid, radius },
                BoundingRegion::Ball { centroid: inner_c, radius: inner_r },
            ) => metric.distance(&centroid[..], &inner_c[..]) + inner_r <= radius + tolerance,
            (BoundingRegion::Box { lower, upper }, BoundingRegion::Ball { centroid, radius }) => {
                // Under both metrics a ball reaches exactly `radius` along each axis.
                centroid.iter().zip(lower.iter().zip(upper.iter())).all(|(&c, (&lo, &hi))| {
                    c - radius >= lo - tolerance && c + radius <= hi + tolerance
                })
            }
            (BoundingRegion::Ball { centroid, radius }, inner @ BoundingRegion::Box { .. }) => {
                inner.max_distance_to_point(&centroid[..], metric) <= radius + tolerance
            }
        }
    }

    /// Grows a ball so that it also covers `inner`. No-op for boxes, which are
    /// built tight around their points and already nest.
    pub(crate) fn cover(&mut self, inner: &BoundingRegion, metric: DistanceMetric) {
        if let (
            BoundingRegion::Ball { centroid, radius },
            BoundingRegion::Ball { centroid: inner_c, radius: inner_r },
        ) = (&mut *self, inner)
        {
            let reach = metric.distance(&centroid[..], &inner_c[..]) + inner_r;
            if reach > *radius {
                *radius = reach;
            }
        }
    }
}

fn centroid<F: Coordinate>(points: &PointSet<F>, indices: &[usize]) -> Vec<f64> {
    let mut sum = vec![0.0; points.dim()];
    for &i in indices {
        for (acc, &c) in sum.iter_mut().zip(points.point(i)) {
            let c: f64 = c.as_();
            *acc += c;
        }
    }
    let n = indices.len().max(1) as f64;
    sum.iter_mut().for_each(|s| *s /= n);
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPSILON: f64 = 1e-9;
    const METRICS: [DistanceMetric; 2] = [DistanceMetric::Euclidean, DistanceMetric::Manhattan];

    fn random_points(rng: &mut StdRng, n: usize, dim: usize) -> PointSet<f64> {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|_| (0..dim).map(|_| rng.gen_range(-5.0..5.0)).collect())
            .collect();
        PointSet::from_rows(&rows).expect("random rows are valid")
    }

    #[test]
    fn test_bounding_box_is_tight() {
        let points = PointSet::from_rows(&[vec![1.0, 5.0], vec![-2.0, 3.0], vec![0.5, 4.0]]).unwrap();
        let region = BoundingRegion::bounding_box(&points, &[0, 1, 2]);
        assert_eq!(
            region,
            BoundingRegion::Box { lower: vec![-2.0, 3.0], upper: vec![1.0, 5.0] },
            "box should span exactly the point extents"
        );
    }

    #[test]
    fn test_bounding_ball_centroid_and_radius() {
        let points = PointSet::from_rows(&[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]).unwrap();
        match BoundingRegion::bounding_ball(&points, &[0, 1, 2], DistanceMetric::Euclidean) {
            BoundingRegion::Ball { centroid, radius } => {
                assert_eq!(centroid, vec![2.0, 2.0]);
                assert_relative_eq!(radius, 2.0_f64.sqrt(), epsilon = EPSILON);
            }
            other => panic!("expected a ball, got {other:?}"),
        }
        match BoundingRegion::bounding_ball(&points, &[0, 1, 2], DistanceMetric::Manhattan) {
            BoundingRegion::Ball { radius, .. } => assert_relative_eq!(radius, 2.0, epsilon = EPSILON),
            other => panic!("expected a ball, got {other:?}"),
        }
    }

    #[test]
    fn test_point_bounds_bracket_true_distances() {
        let mut rng = StdRng::seed_from_u64(11);
        for metric in METRICS {
            let points = random_points(&mut rng, 30, 3);
            let indices: Vec<usize> = (0..points.len()).collect();
            let regions = [
                BoundingRegion::bounding_box(&points, &indices),
                BoundingRegion::bounding_ball(&points, &indices, metric),
            ];
            for _ in 0..20 {
                let q: Vec<f64> = (0..3).map(|_| rng.gen_range(-9.0..9.0)).collect();
                for region in &regions {
                    let lo = region.min_distance_to_point(&q, metric);
                    let hi = region.max_distance_to_point(&q, metric);
                    for &i in &indices {
                        let d = metric.distance(&q, points.point(i));
                        assert!(lo <= d + EPSILON, "{metric}: min bound {lo} exceeds distance {d}");
                        assert!(hi >= d - EPSILON, "{metric}: max bound {hi} below distance {d}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_region_bounds_bracket_true_distances() {
        let mut rng = StdRng::seed_from_u64(7);
        for metric in METRICS {
            let a = random_points(&mut rng, 15, 2);
            let b_rows: Vec<Vec<f64>> = (0..15)
                .map(|_| vec![rng.gen_range(3.0..9.0), rng.gen_range(-1.0..4.0)])
                .collect();
            let b = PointSet::from_rows(&b_rows).unwrap();
            let idx: Vec<usize> = (0..15).collect();
            let pairs = [
                (BoundingRegion::bounding_box(&a, &idx), BoundingRegion::bounding_box(&b, &idx)),
                (BoundingRegion::bounding_ball(&a, &idx, metric), BoundingRegion::bounding_ball(&b, &idx, metric)),
                (BoundingRegion::bounding_box(&a, &idx), BoundingRegion::bounding_ball(&b, &idx, metric)),
            ];
            for (ra, rb) in &pairs {
                let (lo, hi) = ra.distance_bounds(rb, metric);
                assert_eq!((lo, hi), rb.distance_bounds(ra, metric), "bounds should be symmetric");
                for i in 0..15 {
                    for j in 0..15 {
                        let d = metric.distance(a.point(i), b.point(j));
                        assert!(lo <= d + EPSILON && d <= hi + EPSILON, "{metric}: {d} outside [{lo}, {hi}]");
                    }
                }
            }
        }
    }

    #[test]
    fn test_min_distance_zero_inside_region() {
        let region = BoundingRegion::Box { lower: vec![0.0, 0.0], upper: vec![2.0, 2.0] };
        assert_eq!(region.min_distance_to_point(&[1.0, 1.5], DistanceMetric::Euclidean), 0.0);
        assert_relative_eq!(
            region.max_distance_to_point(&[1.0, 1.5], DistanceMetric::Manhattan),
            2.5,
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_containment_checks() {
        let outer = BoundingRegion::Box { lower: vec![0.0, 0.0], upper: vec![4.0, 4.0] };
        let inner = BoundingRegion::Box { lower: vec![1.0, 1.0], upper: vec![2.0, 3.0] };
        assert!(outer.contains_region(&inner, DistanceMetric::Euclidean, 0.0));
        assert!(!inner.contains_region(&outer, DistanceMetric::Euclidean, 0.0));

        let big = BoundingRegion::Ball { centroid: vec![0.0, 0.0], radius: 3.0 };
        let small = BoundingRegion::Ball { centroid: vec![1.0, 0.0], radius: 1.5 };
        assert!(big.contains_region(&small, DistanceMetric::Euclidean, 0.0));
        assert!(!big.contains_region(&small, DistanceMetric::Euclidean, -1.0));
        assert!(big.contains_point(&[0.0, 2.9], DistanceMetric::Euclidean, 0.0));
        assert!(!big.contains_point(&[2.5, 2.5], DistanceMetric::Manhattan, 0.0));
    }

    #[test]
    fn test_cover_grows_ball_to_enclose_child() {
        let mut parent = BoundingRegion::Ball { centroid: vec![0.0], radius: 1.0 };
        let child = BoundingRegion::Ball { centroid: vec![1.0], radius: 0.5 };
        parent.cover(&child, DistanceMetric::Euclidean);
        assert!(parent.contains_region(&child, DistanceMetric::Euclidean, 0.0));
        match parent {
            BoundingRegion::Ball { radius, .. } => assert_relative_eq!(radius, 1.5, epsilon = EPSILON),
            other => panic!("expected a ball, got {other:?}"),
        }
    }
}
