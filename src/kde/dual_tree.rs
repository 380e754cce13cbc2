//! Dual-tree evaluation: the queries get a tree of their own, and pairs of
//! (query node, sample node) are resolved as whole blocks when the bound on
//! their mutual contribution is tight enough for every query in the block.

use crate::common_types::{Coordinate, PointSet};
use crate::error::Result;
use crate::kde::log_math::{DensityAccumulator, log_add_exp, log_sum_exp};
use crate::kde::traversal::TraversalParams;
use crate::spatial::{Node, NodeId, PARALLEL_BUILD_THRESHOLD, SpatialTree};
use log::debug;
use ordered_float::OrderedFloat;

/// Query blocks at least this large recurse into their halves in parallel.
const PARALLEL_QUERY_THRESHOLD: usize = PARALLEL_BUILD_THRESHOLD;

/// Log kernel sums for every query, in query order. The query tree is built
/// with the same kind and leaf size as `reference`.
pub(crate) fn log_kernel_sums<F: Coordinate>(
    reference: &SpatialTree<F>,
    queries: PointSet<F>,
    params: &TraversalParams,
) -> Result<Vec<DensityAccumulator>> {
    evaluate(reference, queries, params).map(|(accs, _)| accs)
}

/// Like [`log_kernel_sums`], also returning how many kernels were evaluated
/// exactly.
fn evaluate<F: Coordinate>(
    reference: &SpatialTree<F>,
    queries: PointSet<F>,
    params: &TraversalParams,
) -> Result<(Vec<DensityAccumulator>, usize)> {
    if queries.is_empty() {
        return Ok((Vec::new(), 0));
    }
    let query_tree = SpatialTree::build(queries, reference.kind(), params.metric, reference.leaf_size())?;
    let traversal = DualTraversal {
        reference,
        queries: &query_tree,
        params,
    };

    let root_bounds = traversal.pair_bounds(query_tree.root(), reference.root()).1;
    let mut accs = vec![DensityAccumulator::new(); query_tree.num_points()];
    let visit = traversal.pair(
        SpatialTree::<F>::ROOT,
        SpatialTree::<F>::ROOT,
        root_bounds,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
        &mut accs,
    );
    debug!(
        "dual-tree traversal: {} queries x {} samples, {} exact kernel evaluations",
        query_tree.num_points(),
        reference.num_points(),
        visit.kernel_evaluations
    );

    let mut ordered = vec![DensityAccumulator::new(); accs.len()];
    for (pos, acc) in accs.into_iter().enumerate() {
        ordered[query_tree.original_index(pos)] = acc;
    }
    Ok((ordered, visit.kernel_evaluations))
}

/// What a pair recursion leaves behind for its caller.
#[derive(Debug, Clone, Copy)]
struct Visit {
    /// Smallest resolved lower bound over the query block's accumulators.
    floor: f64,
    kernel_evaluations: usize,
}

struct DualTraversal<'a, F> {
    reference: &'a SpatialTree<F>,
    queries: &'a SpatialTree<F>,
    params: &'a TraversalParams,
}

impl<F: Coordinate> DualTraversal<'_, F> {
    /// `(min distance, (ln lower, ln upper))` of the `reference` block's
    /// contribution to any single query inside `query`.
    #[inline]
    fn pair_bounds(&self, query: &Node, reference: &Node) -> (f64, (f64, f64)) {
        let (min_distance, max_distance) = query.region().distance_bounds(reference.region(), self.params.metric);
        (
            min_distance,
            self.params.block_log_bounds(reference.count(), min_distance, max_distance),
        )
    }

    /// Resolves or splits the pair of query node `q_id` and reference node
    /// `r_id`.
    ///
    /// `accs` covers exactly the tree positions of `q_id`. `bounds` hold for
    /// every query in the block; `pending_lower` bounds the reference nodes
    /// still waiting on the stack, and `floor` is at most the smallest
    /// resolved lower bound in `accs`. Together they give a lower bound on
    /// every query's total, which is what the relative rule is tested against.
    fn pair(
        &self,
        q_id: NodeId,
        r_id: NodeId,
        bounds: (f64, f64),
        pending_lower: f64,
        floor: f64,
        accs: &mut [DensityAccumulator],
    ) -> Visit {
        let q = self.queries.node(q_id);
        let r = self.reference.node(r_id);

        let (lower, upper) = bounds;
        let weakest_total = log_add_exp(floor, log_add_exp(lower, pending_lower));
        if self.params.can_prune(r.count(), lower, upper, weakest_total) {
            for acc in accs.iter_mut() {
                acc.resolve_bounded(lower, upper);
            }
            return Visit {
                floor: log_add_exp(floor, lower),
                kernel_evaluations: 0,
            };
        }

        match (q.children(), r.children()) {
            (None, None) => self.base_case(q, r, accs),
            (None, Some(r_children)) => self.split_reference(q_id, r_children, pending_lower, floor, accs),
            (Some(_), Some(r_children)) if r.count() >= q.count() => {
                self.split_reference(q_id, r_children, pending_lower, floor, accs)
            }
            (Some(q_children), _) => self.split_query(q_children, r_id, bounds, pending_lower, floor, accs),
        }
    }

    fn base_case(&self, q: &Node, r: &Node, accs: &mut [DensityAccumulator]) -> Visit {
        let query_points = self.queries.points();
        let reference_points = self.reference.points();
        for (pos, acc) in q.range().zip(accs.iter_mut()) {
            let query = query_points.point(pos);
            let exact = log_sum_exp(r.range().map(|rpos| {
                self.params
                    .log_kernel_at(self.params.metric.distance(query, reference_points.point(rpos)))
            }));
            acc.resolve_exact(exact);
        }
        Visit {
            floor: min_lower(accs),
            kernel_evaluations: q.count() * r.count(),
        }
    }

    /// Visits the closer reference child first, with its sibling's lower
    /// bound added to the pending sum.
    fn split_reference(
        &self,
        q_id: NodeId,
        (r_left, r_right): (NodeId, NodeId),
        pending_lower: f64,
        floor: f64,
        accs: &mut [DensityAccumulator],
    ) -> Visit {
        let q = self.queries.node(q_id);
        let (left_distance, left_bounds) = self.pair_bounds(q, self.reference.node(r_left));
        let (right_distance, right_bounds) = self.pair_bounds(q, self.reference.node(r_right));
        let (first, first_bounds, second, second_bounds) = if left_distance <= right_distance {
            (r_left, left_bounds, r_right, right_bounds)
        } else {
            (r_right, right_bounds, r_left, left_bounds)
        };

        let near = self.pair(
            q_id,
            first,
            first_bounds,
            log_add_exp(pending_lower, second_bounds.0),
            floor,
            accs,
        );
        let far = self.pair(q_id, second, second_bounds, pending_lower, near.floor, accs);
        Visit {
            floor: far.floor,
            kernel_evaluations: near.kernel_evaluations + far.kernel_evaluations,
        }
    }

    /// Hands each query child its own slice of accumulators and its own,
    /// tighter bounds against the reference node.
    fn split_query(
        &self,
        (q_left, q_right): (NodeId, NodeId),
        r_id: NodeId,
        bounds: (f64, f64),
        pending_lower: f64,
        floor: f64,
        accs: &mut [DensityAccumulator],
    ) -> Visit {
        let r = self.reference.node(r_id);
        let left_node = self.queries.node(q_left);
        let right_node = self.queries.node(q_right);
        let left_bounds = intersect(bounds, self.pair_bounds(left_node, r).1);
        let right_bounds = intersect(bounds, self.pair_bounds(right_node, r).1);

        let (left_accs, right_accs) = accs.split_at_mut(left_node.count());
        let (left, right) = if left_accs.len() + right_accs.len() >= PARALLEL_QUERY_THRESHOLD {
            rayon::join(
                || self.pair(q_left, r_id, left_bounds, pending_lower, floor, left_accs),
                || self.pair(q_right, r_id, right_bounds, pending_lower, floor, right_accs),
            )
        } else {
            (
                self.pair(q_left, r_id, left_bounds, pending_lower, floor, left_accs),
                self.pair(q_right, r_id, right_bounds, pending_lower, floor, right_accs),
            )
        };
        Visit {
            floor: left.floor.min(right.floor),
            kernel_evaluations: left.kernel_evaluations + right.kernel_evaluations,
        }
    }
}

/// Both intervals bound the same sum, so their intersection does too.
#[inline]
fn intersect(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0.max(b.0), a.1.min(b.1))
}

fn min_lower(accs: &[DensityAccumulator]) -> f64 {
    accs.iter()
        .map(|acc| OrderedFloat(acc.log_lower))
        .min()
        .map_or(f64::NEG_INFINITY, |lowest| lowest.0)
}
