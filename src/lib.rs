//! Tree-accelerated kernel density estimation.
//!
//! Samples are indexed by a k-d tree or a ball tree, and densities are
//! evaluated either one query at a time (single-tree) or with the queries in
//! a tree of their own (dual-tree). Node bounds let whole subtrees be
//! resolved without visiting their samples whenever the configured absolute
//! or relative tolerance allows it. All accumulation happens in the log
//! domain, so far-away queries get a finite log-density instead of zero.

pub mod common_types;
pub mod error;
pub mod kde;
pub mod spatial;

pub use common_types::{Coordinate, PointSet};
pub use error::{Error, Result};
pub use kde::{
    DensityModel, DistanceMetric, EvaluationMode, KdeConfig, KernelDensity, KernelType, State,
    brute_force_log_density,
};
pub use spatial::{SpatialTree, TreeKind};
