//! Single-tree evaluation: each query point descends the sample tree on its own.

use crate::common_types::{Coordinate, PointSet};
use crate::kde::log_math::{DensityAccumulator, log_add_exp, log_sum_exp};
use crate::kde::traversal::TraversalParams;
use crate::spatial::{Node, NodeId, SpatialTree};
use rayon::prelude::*;

/// Log kernel sums for every query, in query order.
pub(crate) fn log_kernel_sums<F: Coordinate>(
    tree: &SpatialTree<F>,
    queries: &PointSet<F>,
    params: &TraversalParams,
) -> Vec<DensityAccumulator> {
    (0..queries.len())
        .into_par_iter()
        .map(|i| evaluate_point(tree, queries.point(i), params))
        .collect()
}

pub(crate) fn evaluate_point<F: Coordinate>(
    tree: &SpatialTree<F>,
    query: &[F],
    params: &TraversalParams,
) -> DensityAccumulator {
    let (_, root_bounds) = node_bounds(tree.root(), query, params);
    let mut acc = DensityAccumulator::new();
    visit(tree, SpatialTree::<F>::ROOT, root_bounds, f64::NEG_INFINITY, query, params, &mut acc);
    acc
}

/// `(min distance, (ln lower, ln upper))` of `node` as seen from `query`.
#[inline]
fn node_bounds<F: Coordinate>(node: &Node, query: &[F], params: &TraversalParams) -> (f64, (f64, f64)) {
    let min_distance = node.region().min_distance_to_point(query, params.metric);
    let max_distance = node.region().max_distance_to_point(query, params.metric);
    (
        min_distance,
        params.block_log_bounds(node.count(), min_distance, max_distance),
    )
}

/// `pending_lower` is the summed lower bound of every subtree that is still
/// waiting on the recursion stack, excluding `id` itself.
fn visit<F: Coordinate>(
    tree: &SpatialTree<F>,
    id: NodeId,
    bounds: (f64, f64),
    pending_lower: f64,
    query: &[F],
    params: &TraversalParams,
    acc: &mut DensityAccumulator,
) {
    let node = tree.node(id);
    let (lower, upper) = bounds;
    let lower_total = acc.lower_with(log_add_exp(lower, pending_lower));
    if params.can_prune(node.count(), lower, upper, lower_total) {
        acc.resolve_bounded(lower, upper);
        return;
    }

    let Some((left, right)) = node.children() else {
        let points = tree.points();
        let exact = log_sum_exp(
            node.range()
                .map(|pos| params.log_kernel_at(params.metric.distance(query, points.point(pos)))),
        );
        acc.resolve_exact(exact);
        return;
    };

    let (left_distance, left_bounds) = node_bounds(tree.node(left), query, params);
    let (right_distance, right_bounds) = node_bounds(tree.node(right), query, params);

    // Closer child first: it raises the lower total the most.
    let (first, first_bounds, second, second_bounds) = if left_distance <= right_distance {
        (left, left_bounds, right, right_bounds)
    } else {
        (right, right_bounds, left, left_bounds)
    };
    visit(
        tree,
        first,
        first_bounds,
        log_add_exp(pending_lower, second_bounds.0),
        query,
        params,
        acc,
    );
    visit(tree, second, second_bounds, pending_lower, query, params, acc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kde::brute_force::exact_log_kernel_sum;
    use crate::kde::config::KdeConfig;
    use crate::kde::kernel::KernelType;
    use crate::kde::metric::DistanceMetric;
    use crate::spatial::TreeKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_rows(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| (0..dim).map(|_| rng.gen_range(-3.0..3.0)).collect())
            .collect()
    }

    #[test]
    fn test_zero_tolerance_matches_exact_sum() {
        let mut rng = StdRng::seed_from_u64(21);
        let rows = random_rows(&mut rng, 300, 2);
        let queries = PointSet::from_rows(&random_rows(&mut rng, 25, 2)).expect("valid queries");
        for kernel in [KernelType::Gaussian, KernelType::Epanechnikov, KernelType::Exponential] {
            for kind in [TreeKind::KdTree, TreeKind::BallTree] {
                let config = KdeConfig::default()
                    .with_kernel(kernel)
                    .with_bandwidth(0.6)
                    .with_rel_tol(0.0);
                let tree = SpatialTree::from_rows(&rows, kind, config.metric, 8).expect("tree builds");
                let params = TraversalParams::new(&config, rows.len(), 2);
                let accs = log_kernel_sums(&tree, &queries, &params);
                for (i, acc) in accs.iter().enumerate() {
                    let exact = exact_log_kernel_sum(tree.points(), queries.point(i), &params);
                    let error = (acc.log_estimate.exp() - exact.exp()).abs();
                    assert!(
                        error <= 1e-9 * exact.exp().max(1e-300),
                        "{kernel}/{kind}: query {i} estimate {} vs exact {}",
                        acc.log_estimate,
                        exact
                    );
                }
            }
        }
    }

    #[test]
    fn test_bounds_bracket_exact_sum() {
        let mut rng = StdRng::seed_from_u64(22);
        let rows = random_rows(&mut rng, 500, 3);
        let config = KdeConfig::default()
            .with_bandwidth(0.8)
            .with_metric(DistanceMetric::Manhattan)
            .with_rel_tol(0.05);
        let tree = SpatialTree::from_rows(&rows, TreeKind::BallTree, config.metric, 10).expect("tree builds");
        let params = TraversalParams::new(&config, rows.len(), 3);
        for _ in 0..20 {
            let q: Vec<f64> = (0..3).map(|_| rng.gen_range(-4.0..4.0)).collect();
            let acc = evaluate_point(&tree, &q, &params);
            let exact = exact_log_kernel_sum(tree.points(), &q, &params);
            assert!(acc.log_lower <= exact + 1e-9, "lower bound {} above exact {}", acc.log_lower, exact);
            assert!(acc.log_upper >= exact - 1e-9, "upper bound {} below exact {}", acc.log_upper, exact);
        }
    }

    #[test]
    fn test_far_query_with_compact_kernel_is_zero() {
        let rows = vec![vec![0.0], vec![0.5], vec![1.0]];
        let config = KdeConfig::default().with_kernel(KernelType::Tophat).with_bandwidth(0.5);
        let tree = SpatialTree::from_rows(&rows, TreeKind::KdTree, config.metric, 1).expect("tree builds");
        let params = TraversalParams::new(&config, 3, 1);
        let acc = evaluate_point(&tree, &[10.0], &params);
        assert_eq!(acc.log_estimate, f64::NEG_INFINITY, "no sample is within the tophat support");
    }

    #[test]
    fn test_tolerance_is_respected() {
        let mut rng = StdRng::seed_from_u64(23);
        let rows = random_rows(&mut rng, 2000, 2);
        let config = KdeConfig::default().with_bandwidth(0.3).with_rel_tol(1e-2);
        let tree = SpatialTree::from_rows(&rows, TreeKind::KdTree, config.metric, 16).expect("tree builds");
        let params = TraversalParams::new(&config, rows.len(), 2);
        for _ in 0..30 {
            let q: Vec<f64> = (0..2).map(|_| rng.gen_range(-3.0..3.0)).collect();
            let estimate = evaluate_point(&tree, &q, &params).log_estimate.exp();
            let exact = exact_log_kernel_sum(tree.points(), &q, &params).exp();
            assert!(
                (estimate - exact).abs() <= 1e-2 * exact * (1.0 + 1e-9),
                "estimate {estimate} strays more than 1% from {exact}"
            );
        }
    }

    #[test]
    fn test_bounds_bracket_exact_sum_over_wide_dynamic_range() {
        // A narrow bandwidth over a wide sample spread, with queries well
        // outside the samples: kernel sums span thousands of orders of
        // magnitude between neighbouring subtrees.
        let mut rng = StdRng::seed_from_u64(24);
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|_| vec![rng.gen_range(0.0..20.0), rng.gen_range(0.0..20.0)])
            .collect();
        let config = KdeConfig::default().with_bandwidth(0.05).with_rel_tol(1e-3);
        let params = TraversalParams::new(&config, rows.len(), 2);
        for kind in [TreeKind::KdTree, TreeKind::BallTree] {
            let tree = SpatialTree::from_rows(&rows, kind, config.metric, 5).expect("tree builds");
            for _ in 0..50 {
                let q = vec![rng.gen_range(-10.0..30.0), rng.gen_range(-10.0..30.0)];
                let acc = evaluate_point(&tree, &q, &params);
                let exact = exact_log_kernel_sum(tree.points(), &q, &params);
                let slack = 1e-9 * exact.abs().max(1.0);
                assert!(acc.log_lower <= exact + slack, "{kind}: lower {} above exact {exact}", acc.log_lower);
                assert!(acc.log_upper >= exact - slack, "{kind}: upper {} below exact {exact}", acc.log_upper);
            }
        }
    }
}
