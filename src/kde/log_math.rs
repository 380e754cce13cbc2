//! Log-domain arithmetic and the per-query density accumulator.
//!
//! Kernel sums for far query points can be smaller than the smallest positive
//! `f64`, so every bound and partial sum is carried as a natural logarithm.

use std::f64::consts::{LN_2, PI};

/// `ln(e^a + e^b)` without overflow or underflow.
#[inline]
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    hi + (lo - hi).exp().ln_1p()
}

/// `ln(e^a - e^b)`, clamped to `-inf` when `b >= a`.
#[inline]
pub fn log_sub_exp(a: f64, b: f64) -> f64 {
    if b >= a {
        return f64::NEG_INFINITY;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    a + (-(b - a).exp()).ln_1p()
}

/// `ln(Σ e^x)` over an iterator, in one streaming pass that rescales the
/// running sum whenever a new maximum appears.
pub fn log_sum_exp<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for v in values {
        if v == f64::NEG_INFINITY {
            continue;
        }
        if v <= max {
            sum += (v - max).exp();
        } else {
            sum = sum * (max - v).exp() + 1.0;
            max = v;
        }
    }
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + sum.ln()
}

/// `ln Γ(k/2)` for a positive integer `k`, via `Γ(x+1) = xΓ(x)` from
/// `Γ(1/2) = √π` or `Γ(1) = 1`.
pub fn ln_gamma_half(k: usize) -> f64 {
    debug_assert!(k > 0, "ln_gamma_half is only defined for k >= 1");
    let mut x = if k % 2 == 0 { 1.0 } else { 0.5 };
    let mut acc = if k % 2 == 0 { 0.0 } else { 0.5 * PI.ln() };
    while 2.0 * x < k as f64 {
        acc += x.ln();
        x += 1.0;
    }
    acc
}

/// `ln(n!)`.
pub fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|i| (i as f64).ln()).sum()
}

/// Running state for one query point.
///
/// All three quantities are log kernel sums (unnormalized) over the blocks of
/// samples resolved so far, and they only ever grow. `log_estimate` is the
/// estimate of those blocks, `log_lower`/`log_upper` bracket their exact sum.
/// Blocks still pending are tracked by the traversal, so a running lower
/// bound on the whole total is `log_lower ⊕ pending`; once the traversal
/// finishes, `log_lower` and `log_upper` bracket the exact total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityAccumulator {
    pub log_estimate: f64,
    pub log_lower: f64,
    pub log_upper: f64,
}

impl Default for DensityAccumulator {
    fn default() -> Self {
        DensityAccumulator {
            log_estimate: f64::NEG_INFINITY,
            log_lower: f64::NEG_INFINITY,
            log_upper: f64::NEG_INFINITY,
        }
    }
}

impl DensityAccumulator {
    /// Nothing resolved yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a block from its bound interval, contributing the midpoint.
    #[inline]
    pub fn resolve_bounded(&mut self, lower: f64, upper: f64) {
        let midpoint = log_add_exp(lower, upper) - LN_2;
        self.log_estimate = log_add_exp(self.log_estimate, midpoint);
        self.log_lower = log_add_exp(self.log_lower, lower);
        self.log_upper = log_add_exp(self.log_upper, upper);
    }

    /// Resolves a block with its exact kernel sum.
    #[inline]
    pub fn resolve_exact(&mut self, exact: f64) {
        self.log_estimate = log_add_exp(self.log_estimate, exact);
        self.log_lower = log_add_exp(self.log_lower, exact);
        self.log_upper = log_add_exp(self.log_upper, exact);
    }

    /// Lower bound on the whole total given the lower bound of everything
    /// not yet resolved.
    #[inline]
    pub fn lower_with(&self, log_pending_lower: f64) -> f64 {
        log_add_exp(self.log_lower, log_pending_lower)
    }
}
