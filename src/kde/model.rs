//! A trained density model: the sample tree plus the configuration it was
//! built for. Models are immutable; reconfiguring produces a new one.

use crate::common_types::{Coordinate, PointSet};
use crate::error::{Error, Result};
use crate::kde::config::KdeConfig;
use crate::kde::kernel::KernelType;
use crate::kde::log_math::DensityAccumulator;
use crate::kde::metric::DistanceMetric;
use crate::kde::traversal::TraversalParams;
use crate::kde::{dual_tree, single_tree};
use crate::spatial::SpatialTree;
use num_traits::NumCast;
use rand::Rng;
use rand_distr::StandardNormal;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DensityModel<F> {
    tree: Arc<SpatialTree<F>>,
    config: KdeConfig,
    params: TraversalParams,
}

impl<F: Coordinate> DensityModel<F> {
    /// Validates `config` and builds the sample tree it asks for.
    pub fn fit(samples: &[Vec<F>], config: KdeConfig) -> Result<Self> {
        config.validate()?;
        let points = PointSet::from_rows(samples)?;
        let tree = SpatialTree::build(points, config.mode.tree_kind(), config.metric, config.leaf_size)?;
        Ok(Self::from_tree(Arc::new(tree), config))
    }

    fn from_tree(tree: Arc<SpatialTree<F>>, config: KdeConfig) -> Self {
        let params = TraversalParams::new(&config, tree.num_points(), tree.dim());
        DensityModel { tree, config, params }
    }

    /// Same samples under a new configuration. The tree is shared when its
    /// shape does not depend on what changed.
    pub fn reconfigure(&self, config: KdeConfig) -> Result<Self> {
        config.validate()?;
        let same_shape = self.tree.kind() == config.mode.tree_kind()
            && self.tree.leaf_size() == config.leaf_size
            && self.tree.metric() == config.metric;
        if same_shape {
            return Ok(Self::from_tree(Arc::clone(&self.tree), config));
        }
        let tree = SpatialTree::build(
            self.tree.points().clone(),
            config.mode.tree_kind(),
            config.metric,
            config.leaf_size,
        )?;
        Ok(Self::from_tree(Arc::new(tree), config))
    }

    pub fn config(&self) -> &KdeConfig {
        &self.config
    }

    pub fn tree(&self) -> &SpatialTree<F> {
        &self.tree
    }

    pub fn dimension(&self) -> usize {
        self.tree.dim()
    }

    pub fn num_samples(&self) -> usize {
        self.tree.num_points()
    }

    fn accumulate(&self, queries: &[Vec<F>]) -> Result<Vec<DensityAccumulator>> {
        let queries = PointSet::from_queries(queries, self.dimension())?;
        if self.config.mode.is_dual() {
            dual_tree::log_kernel_sums(&self.tree, queries, &self.params)
        } else {
            Ok(single_tree::log_kernel_sums(&self.tree, &queries, &self.params))
        }
    }

    /// Natural-log density estimate at each query point, in query order.
    pub fn log_density(&self, queries: &[Vec<F>]) -> Result<Vec<f64>> {
        Ok(self
            .accumulate(queries)?
            .iter()
            .map(|acc| self.params.log_density(acc.log_estimate))
            .collect())
    }

    /// `(lower, upper)` bounds on the exact log-density that the traversal
    /// established for each query point.
    pub fn log_density_bounds(&self, queries: &[Vec<F>]) -> Result<Vec<(f64, f64)>> {
        Ok(self
            .accumulate(queries)?
            .iter()
            .map(|acc| {
                (
                    self.params.log_density(acc.log_lower),
                    self.params.log_density(acc.log_upper),
                )
            })
            .collect())
    }

    /// Total log-likelihood of `queries`.
    pub fn score(&self, queries: &[Vec<F>]) -> Result<f64> {
        Ok(self.log_density(queries)?.iter().sum())
    }

    /// Draws `n` points from the estimated density.
    ///
    /// Only the Gaussian and tophat kernels under the Euclidean metric have a
    /// direct sampler; other combinations fail with `UnsupportedOption`.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<Vec<F>>> {
        if self.config.metric != DistanceMetric::Euclidean {
            return Err(Error::unsupported("distance_metric", self.config.metric.name()));
        }
        let kernel = self.config.kernel;
        if !matches!(kernel, KernelType::Gaussian | KernelType::Tophat) {
            return Err(Error::unsupported("kernel_type", kernel.name()));
        }

        let points = self.tree.points();
        let dim = self.dimension();
        let bandwidth = self.config.bandwidth;
        (0..n)
            .map(|_| {
                let center = points.point(rng.gen_range(0..points.len()));
                let mut offset: Vec<f64> = (0..dim).map(|_| rng.sample(StandardNormal)).collect();
                match kernel {
                    KernelType::Tophat => {
                        // Uniform in the ball: Gaussian direction, radius h · U^{1/D}.
                        let norm = offset.iter().map(|x| x * x).sum::<f64>().sqrt();
                        let radius = bandwidth * rng.r#gen::<f64>().powf(1.0 / dim as f64);
                        let scale = if norm > 0.0 { radius / norm } else { 0.0 };
                        offset.iter_mut().for_each(|x| *x *= scale);
                    }
                    _ => offset.iter_mut().for_each(|x| *x *= bandwidth),
                }
                center
                    .iter()
                    .zip(&offset)
                    .map(|(&c, &o)| {
                        let c: f64 = c.as_();
                        <F as NumCast>::from(c + o).ok_or_else(|| {
                            Error::InvalidArgument(format!("sampled coordinate {} is not representable", c + o))
                        })
                    })
                    .collect::<Result<Vec<F>>>()
            })
            .collect()
    }
}
