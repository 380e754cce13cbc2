//! Radial smoothing kernels.
//!
//! Every kernel is a non-increasing function of the scaled distance
//! `u = d / h`, which is what makes the min/max-distance bounds of a tree node
//! translate directly into upper/lower kernel bounds.

use crate::error::{Error, Result};
use crate::kde::log_math::{ln_factorial, ln_gamma_half};
use crate::kde::metric::DistanceMetric;
use std::f64::consts::LN_2;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KernelType {
    /// `exp(-u²/2)`
    #[default]
    Gaussian,
    /// `1 - u²` on `u < 1`
    Epanechnikov,
    /// `1` on `u <= 1`
    Tophat,
    /// `exp(-u)`
    Exponential,
    /// `1 - u` on `u < 1`
    Linear,
}

impl KernelType {
    /// `ln K(u)`; `-inf` outside the kernel's support.
    #[inline]
    pub fn log_kernel(&self, u: f64) -> f64 {
        match self {
            KernelType::Gaussian => -0.5 * u * u,
            KernelType::Epanechnikov => {
                if u < 1.0 { (1.0 - u * u).ln() } else { f64::NEG_INFINITY }
            }
            KernelType::Tophat => {
                if u <= 1.0 { 0.0 } else { f64::NEG_INFINITY }
            }
            KernelType::Exponential => -u,
            KernelType::Linear => {
                if u < 1.0 { (1.0 - u).ln() } else { f64::NEG_INFINITY }
            }
        }
    }

    /// `K(u)` in the linear domain.
    #[inline]
    pub fn kernel(&self, u: f64) -> f64 {
        self.log_kernel(u).exp()
    }

    /// `ln ∫_0^∞ K(r) r^{D-1} dr`, the radial moment that turns into the
    /// normalizing constant once multiplied by the unit-ball surface.
    fn log_radial_moment(&self, dim: usize) -> f64 {
        let d = dim as f64;
        match self {
            // 2^{D/2-1} Γ(D/2)
            KernelType::Gaussian => (0.5 * d - 1.0) * LN_2 + ln_gamma_half(dim),
            // 1/D - 1/(D+2)
            KernelType::Epanechnikov => LN_2 - d.ln() - (d + 2.0).ln(),
            // 1/D
            KernelType::Tophat => -d.ln(),
            // Γ(D)
            KernelType::Exponential => ln_factorial(dim - 1),
            // 1/D - 1/(D+1)
            KernelType::Linear => -d.ln() - (d + 1.0).ln(),
        }
    }

    /// `ln Z` such that `K(d(x, c)/h) / Z` integrates to one over `R^D`
    /// under `metric`.
    pub fn log_normalization(&self, dim: usize, metric: DistanceMetric, bandwidth: f64) -> f64 {
        metric.log_unit_ball_volume(dim)
            + (dim as f64).ln()
            + self.log_radial_moment(dim)
            + dim as f64 * bandwidth.ln()
    }

    pub fn name(&self) -> &'static str {
        match self {
            KernelType::Gaussian => "gaussian",
            KernelType::Epanechnikov => "epanechnikov",
            KernelType::Tophat => "tophat",
            KernelType::Exponential => "exponential",
            KernelType::Linear => "linear",
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(KernelType::Gaussian),
            "epanechnikov" => Ok(KernelType::Epanechnikov),
            "tophat" => Ok(KernelType::Tophat),
            "exponential" => Ok(KernelType::Exponential),
            "linear" => Ok(KernelType::Linear),
            _ => Err(Error::unsupported("kernel_type", s)),
        }
    }
}
