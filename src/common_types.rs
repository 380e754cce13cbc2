//! This module contains common data structures used by the trees and the estimator.

use crate::error::{Error, Result};
use num_traits::{AsPrimitive, Float};
use std::fmt::Debug;
use std::iter::Sum;

/// Scalar type of a sample coordinate (e.g. `f64`, `f32`).
///
/// Distances and densities are always computed in `f64`; coordinates are
/// converted with `as_()` at the point of use.
pub trait Coordinate: Float + AsPrimitive<f64> + Sum + Send + Sync + Debug + 'static {}

impl<T> Coordinate for T where T: Float + AsPrimitive<f64> + Sum + Send + Sync + Debug + 'static {}

/// A set of fixed-dimension points stored row-major in one contiguous buffer.
///
/// Points are addressed by index; nothing in the tree or the evaluators ever
/// copies a single point out of the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet<F> {
    coords: Vec<F>,
    dim: usize,
}

impl<F: Coordinate> PointSet<F> {
    /// Packs `rows` into a point set, checking that every row has the same,
    /// non-zero number of finite coordinates.
    pub fn from_rows(rows: &[Vec<F>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| Error::InvalidArgument("sample set is empty".to_string()))?;
        let dim = first.len();
        if dim == 0 {
            return Err(Error::InvalidArgument(
                "samples must have at least one dimension".to_string(),
            ));
        }

        let mut coords = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(Error::InvalidArgument(format!(
                    "sample {i} has {} coordinates, expected {dim}",
                    row.len()
                )));
            }
            if row.iter().any(|c| !c.is_finite()) {
                return Err(Error::InvalidArgument(format!(
                    "sample {i} has a non-finite coordinate"
                )));
            }
            coords.extend_from_slice(row);
        }
        Ok(PointSet { coords, dim })
    }

    /// Like [`PointSet::from_rows`], but reports a wrong row width as
    /// [`Error::DimensionMismatch`] against an already known dimensionality.
    pub fn from_queries(rows: &[Vec<F>], expected_dim: usize) -> Result<Self> {
        let mut coords = Vec::with_capacity(rows.len() * expected_dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != expected_dim {
                return Err(Error::DimensionMismatch {
                    expected: expected_dim,
                    got: row.len(),
                });
            }
            if row.iter().any(|c| !c.is_finite()) {
                return Err(Error::InvalidArgument(format!(
                    "query point {i} has a non-finite coordinate"
                )));
            }
            coords.extend_from_slice(row);
        }
        Ok(PointSet {
            coords,
            dim: expected_dim,
        })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.coords.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Dimensionality of every point.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Coordinates of point `i`.
    #[inline]
    pub fn point(&self, i: usize) -> &[F] {
        &self.coords[i * self.dim..(i + 1) * self.dim]
    }

    /// New point set holding the points at `order`, in that order.
    pub(crate) fn gather(&self, order: &[usize]) -> PointSet<F> {
        let mut coords = Vec::with_capacity(order.len() * self.dim);
        for &i in order {
            coords.extend_from_slice(self.point(i));
        }
        PointSet { coords, dim: self.dim }
    }

    /// Copies the points back out as rows.
    pub fn to_rows(&self) -> Vec<Vec<F>> {
        self.coords.chunks(self.dim).map(<[F]>::to_vec).collect()
    }
}
