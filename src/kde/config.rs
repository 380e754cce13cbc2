//! Estimator configuration: the option set, its defaults and validation.

use crate::error::{Error, Result};
use crate::kde::kernel::KernelType;
use crate::kde::metric::DistanceMetric;
use crate::spatial::TreeKind;
use std::fmt;
use std::str::FromStr;

/// Selects both the tree variant and the traversal algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvaluationMode {
    #[default]
    KdTreeSingle,
    KdTreeDual,
    BallTreeSingle,
    BallTreeDual,
}

impl EvaluationMode {
    pub const ALL: [EvaluationMode; 4] = [
        EvaluationMode::KdTreeSingle,
        EvaluationMode::KdTreeDual,
        EvaluationMode::BallTreeSingle,
        EvaluationMode::BallTreeDual,
    ];

    pub fn tree_kind(&self) -> TreeKind {
        match self {
            EvaluationMode::KdTreeSingle | EvaluationMode::KdTreeDual => TreeKind::KdTree,
            EvaluationMode::BallTreeSingle | EvaluationMode::BallTreeDual => TreeKind::BallTree,
        }
    }

    /// Whether queries are organized into their own tree.
    pub fn is_dual(&self) -> bool {
        matches!(self, EvaluationMode::KdTreeDual | EvaluationMode::BallTreeDual)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvaluationMode::KdTreeSingle => "KDTreeSingle",
            EvaluationMode::KdTreeDual => "KDTreeDual",
            EvaluationMode::BallTreeSingle => "BallTreeSingle",
            EvaluationMode::BallTreeDual => "BallTreeDual",
        }
    }
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvaluationMode {
    type Err = Error;

    /// Case-insensitive; `_` and `-` are ignored, so `kd_tree_dual` and
    /// `KDTreeDual` name the same mode.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "kdtreesingle" => Ok(EvaluationMode::KdTreeSingle),
            "kdtreedual" => Ok(EvaluationMode::KdTreeDual),
            "balltreesingle" => Ok(EvaluationMode::BallTreeSingle),
            "balltreedual" => Ok(EvaluationMode::BallTreeDual),
            _ => Err(Error::unsupported("evaluation_mode", s)),
        }
    }
}

/// Options of a [`KernelDensity`](crate::KernelDensity) estimator.
///
/// Tolerances are in density units: a query's estimate may differ from the
/// exact density by at most `max(abs_tol, rel_tol * density)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KdeConfig {
    pub bandwidth: f64,
    pub kernel: KernelType,
    pub metric: DistanceMetric,
    pub mode: EvaluationMode,
    pub leaf_size: usize,
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Default for KdeConfig {
    fn default() -> Self {
        KdeConfig {
            bandwidth: 1.0,
            kernel: KernelType::Gaussian,
            metric: DistanceMetric::Euclidean,
            mode: EvaluationMode::KdTreeSingle,
            leaf_size: 40,
            abs_tol: 0.0,
            rel_tol: 1e-8,
        }
    }
}

impl KdeConfig {
    pub fn with_bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelType) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    /// Checks the numeric options; tag options are valid by construction.
    pub fn validate(&self) -> Result<()> {
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "bandwidth must be positive and finite, got {}",
                self.bandwidth
            )));
        }
        if self.leaf_size == 0 {
            return Err(Error::InvalidArgument("leaf_size must be at least 1".to_string()));
        }
        for (name, value) in [("abs_tol", self.abs_tol), ("rel_tol", self.rel_tol)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidArgument(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Sets one option from its string form. On error `self` is unchanged.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match key.trim() {
            "bandwidth" => updated.bandwidth = parse_number(key, value)?,
            "kernel_type" => updated.kernel = value.parse()?,
            "distance_metric" => updated.metric = value.parse()?,
            "evaluation_mode" => updated.mode = value.parse()?,
            "leaf_size" => updated.leaf_size = parse_number(key, value)?,
            "abs_tol" => updated.abs_tol = parse_number(key, value)?,
            "rel_tol" => updated.rel_tol = parse_number(key, value)?,
            _ => return Err(Error::unsupported("option", key)),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("cannot parse '{value}' as a value for {key}")))
}
