//! Exact evaluation against every sample, used as the reference the tree
//! evaluators are checked against.

use crate::common_types::{Coordinate, PointSet};
use crate::error::Result;
use crate::kde::config::KdeConfig;
use crate::kde::log_math::log_sum_exp;
use crate::kde::traversal::TraversalParams;
use rayon::prelude::*;

/// `ln Σ K(d(query, x) / h)` over all of `points`.
pub(crate) fn exact_log_kernel_sum<F: Coordinate>(
    points: &PointSet<F>,
    query: &[F],
    params: &TraversalParams,
) -> f64 {
    log_sum_exp((0..points.len()).map(|i| params.log_kernel_at(params.metric.distance(query, points.point(i)))))
}

/// Exact log-density of `samples` at every query point, ignoring the
/// configured tolerances, evaluation mode and leaf size.
///
/// Fails like training does on bad samples or configuration, and with
/// `DimensionMismatch` on queries of the wrong width.
pub fn brute_force_log_density<F: Coordinate>(
    samples: &[Vec<F>],
    queries: &[Vec<F>],
    config: &KdeConfig,
) -> Result<Vec<f64>> {
    config.validate()?;
    let samples = PointSet::from_rows(samples)?;
    let queries = PointSet::from_queries(queries, samples.dim())?;
    let params = TraversalParams::new(config, samples.len(), samples.dim());
    Ok((0..queries.len())
        .into_par_iter()
        .map(|i| params.log_density(exact_log_kernel_sum(&samples, queries.point(i), &params)))
        .collect())
}
