//! Quantities shared by the single-tree and dual-tree evaluators: kernel
//! bounds for a block of samples, and the pruning rule.
//!
//! Everything here lives in the unnormalized kernel-sum domain
//! `S(q) = Σ K(d(q, x_i) / h)`. The density is `S(q) / (n · Z)`, so a density
//! tolerance `t` corresponds to a kernel-sum tolerance `t · n · Z`.

use crate::kde::config::KdeConfig;
use crate::kde::kernel::KernelType;
use crate::kde::log_math::log_sub_exp;
use crate::kde::metric::DistanceMetric;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TraversalParams {
    pub kernel: KernelType,
    pub metric: DistanceMetric,
    pub inv_bandwidth: f64,
    /// `ln n` for the number of training samples.
    pub log_n: f64,
    /// `ln Z`, the kernel normalizing constant.
    pub log_norm: f64,
    /// Absolute tolerance rescaled to the kernel-sum domain.
    pub log_abs_tol: f64,
    pub log_rel_tol: f64,
}

impl TraversalParams {
    pub fn new(config: &KdeConfig, num_samples: usize, dim: usize) -> Self {
        let log_n = (num_samples as f64).ln();
        let log_norm = config.kernel.log_normalization(dim, config.metric, config.bandwidth);
        TraversalParams {
            kernel: config.kernel,
            metric: config.metric,
            inv_bandwidth: config.bandwidth.recip(),
            log_n,
            log_norm,
            // ln 0 = -inf disables that half of the criterion.
            log_abs_tol: config.abs_tol.ln() + log_n + log_norm,
            log_rel_tol: config.rel_tol.ln(),
        }
    }

    #[inline]
    pub fn log_kernel_at(&self, distance: f64) -> f64 {
        self.kernel.log_kernel(distance * self.inv_bandwidth)
    }

    /// `(ln lower, ln upper)` on the kernel sum of `count` samples that all
    /// lie between `min_distance` and `max_distance` of the query.
    #[inline]
    pub fn block_log_bounds(&self, count: usize, min_distance: f64, max_distance: f64) -> (f64, f64) {
        let log_count = (count as f64).ln();
        (
            log_count + self.log_kernel_at(max_distance),
            log_count + self.log_kernel_at(min_distance),
        )
    }

    /// Whether a block of `count` samples may be resolved from its bounds.
    ///
    /// Each block gets the fraction `count / n` of the total error budget
    /// `max(abs, rel · lower_total)`; the block's midpoint is off by at most
    /// half its width, so the resolved blocks of one query never exceed the
    /// budget together. Equal bounds always pass, since the midpoint is
    /// then exact.
    #[inline]
    pub fn can_prune(&self, count: usize, log_lower: f64, log_upper: f64, log_lower_total: f64) -> bool {
        let width = log_sub_exp(log_upper, log_lower);
        if width == f64::NEG_INFINITY {
            return true;
        }
        let budget = self.log_abs_tol.max(self.log_rel_tol + log_lower_total);
        width <= budget + (count as f64).ln() - self.log_n
    }

    /// Converts a log kernel sum into a log density.
    #[inline]
    pub fn log_density(&self, log_kernel_sum: f64) -> f64 {
        log_kernel_sum - self.log_n - self.log_norm
    }
}
