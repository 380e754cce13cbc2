//! Distance metrics between points, and the per-axis combination rule used
//! for box bounds.

use crate::common_types::Coordinate;
use crate::error::{Error, Result};
use crate::kde::log_math::{ln_factorial, ln_gamma_half};
use std::f64::consts::{LN_2, PI};
use std::fmt;
use std::str::FromStr;

/// Pairwise distance. Both variants are Minkowski norms, so they satisfy the
/// triangle inequality the ball bounds rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    /// Distance between two points of equal dimension.
    #[inline]
    pub fn distance<A: Coordinate, B: Coordinate>(&self, a: &[A], b: &[B]) -> f64 {
        debug_assert_eq!(a.len(), b.len(), "points must have the same dimension");
        self.combine(a.iter().zip(b.iter()).map(|(&x, &y)| {
            let x: f64 = x.as_();
            let y: f64 = y.as_();
            (x - y).abs()
        }))
    }

    /// Folds non-negative per-axis offsets into a distance: this is how the
    /// box-to-point and box-to-box bounds turn per-dimension gaps into a norm.
    #[inline]
    pub fn combine<I: Iterator<Item = f64>>(&self, offsets: I) -> f64 {
        match self {
            DistanceMetric::Euclidean => offsets.map(|g| g * g).sum::<f64>().sqrt(),
            DistanceMetric::Manhattan => offsets.sum(),
        }
    }

    /// `ln` of the volume of the unit ball of this metric in `dim` dimensions.
    pub fn log_unit_ball_volume(&self, dim: usize) -> f64 {
        let d = dim as f64;
        match self {
            // π^{D/2} / Γ(D/2 + 1)
            DistanceMetric::Euclidean => 0.5 * d * PI.ln() - ln_gamma_half(dim + 2),
            // 2^D / D!
            DistanceMetric::Manhattan => d * LN_2 - ln_factorial(dim),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Manhattan => "manhattan",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "manhattan" | "l1" | "cityblock" => Ok(DistanceMetric::Manhattan),
            _ => Err(Error::unsupported("distance_metric", s)),
        }
    }
}
