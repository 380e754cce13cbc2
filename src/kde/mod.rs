//! Kernel density estimation over a spatial tree.
//!
//! [`KernelDensity`] owns the train/query lifecycle; [`DensityModel`] is the
//! immutable trained state it hands out. The evaluators only see a tree, a
//! query set and the traversal parameters derived from the configuration.

pub mod brute_force;
pub mod config;
pub(crate) mod dual_tree;
pub mod estimator;
pub mod kernel;
pub mod log_math;
pub mod metric;
pub mod model;
pub(crate) mod single_tree;
pub(crate) mod traversal;

pub use brute_force::brute_force_log_density;
pub use config::{EvaluationMode, KdeConfig};
pub use estimator::{KernelDensity, State};
pub use kernel::KernelType;
pub use metric::DistanceMetric;
pub use model::DensityModel;
