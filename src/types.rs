//! Common types and traits for n-dimensional geometry.
//!
//! Shared helpers for axis masks, axis orderings and coordinate validation,
//! plus the small trait set every spatial type in the crate implements.

use std::cmp::Ordering;

use crate::error::{PackingError, Result};

/// Axis treated as "up" for support checks unless configured otherwise.
pub const DEFAULT_VERTICAL_AXIS: usize = 1;

/// Axis along which the maximum reached extent is recorded by default.
pub const DEFAULT_METRIC_AXIS: usize = 0;

/// Builds a boolean mask of `dimension` entries with the listed axes set.
///
/// Axes outside `0..dimension` are ignored.
///
/// # Examples
/// ```
/// use pdp_packer::types::axis_mask;
///
/// assert_eq!(axis_mask(3, &[0, 1]), vec![true, true, false]);
/// assert_eq!(axis_mask(2, &[1, 5]), vec![false, true]);
/// ```
pub fn axis_mask(dimension: usize, axes: &[usize]) -> Vec<bool> {
    let mut mask = vec![false; dimension];
    for &axis in axes {
        if let Some(flag) = mask.get_mut(axis) {
            *flag = true;
        }
    }
    mask
}

/// Returns the natural axis order `0, 1, .., dimension - 1`.
#[inline]
pub fn natural_axis_order(dimension: usize) -> Vec<usize> {
    (0..dimension).collect()
}

/// Compares two coordinate tuples lexicographically, reading axes in `axes` order.
///
/// Incomparable values (NaN) compare equal so that stable sorts keep input order.
pub fn compare_by_axes(a: &[f64], b: &[f64], axes: &[usize]) -> Ordering {
    for &axis in axes {
        let ordering = a[axis].partial_cmp(&b[axis]).unwrap_or(Ordering::Equal);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Trait for objects with an extent along each axis.
pub trait Dimensional {
    /// Per-axis lengths.
    fn extent(&self) -> &[f64];

    /// Number of axes.
    fn dimension(&self) -> usize {
        self.extent().len()
    }

    /// Product of all lengths.
    fn hypervolume(&self) -> f64 {
        self.extent().iter().product()
    }
}

/// Trait for objects anchored at a lower corner.
pub trait Positioned {
    /// Lower corner coordinates.
    fn position(&self) -> &[f64];
}

/// Trait for objects with weight.
pub trait Weighted {
    fn weight(&self) -> f64;
}

/// Sums the hypervolumes of a slice of dimensional values.
pub fn total_hypervolume<T: Dimensional>(values: &[T]) -> f64 {
    values.iter().map(Dimensional::hypervolume).sum()
}

/// Sums the weights of a slice of weighted values.
pub fn total_weight<T: Weighted>(values: &[T]) -> f64 {
    values.iter().map(Weighted::weight).sum()
}

/// Validation helpers shared by the geometry and configuration layers.
pub mod validation {
    use super::*;

    /// Ensures every coordinate is finite.
    pub fn validate_coordinates(values: &[f64], name: &str) -> Result<()> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(PackingError::InvalidExtent(format!(
                "{} must be finite, got: {}",
                name, bad
            )));
        }
        Ok(())
    }

    /// Ensures every length is finite and non-negative.
    pub fn validate_lengths(values: &[f64], name: &str) -> Result<()> {
        validate_coordinates(values, name)?;
        if let Some(bad) = values.iter().find(|v| **v < 0.0) {
            return Err(PackingError::InvalidExtent(format!(
                "{} must not be negative, got: {}",
                name, bad
            )));
        }
        Ok(())
    }

    /// Ensures a tuple has exactly `expected` entries.
    pub fn validate_axis_count<T>(values: &[T], expected: usize, name: &str) -> Result<()> {
        if values.len() != expected {
            return Err(PackingError::dimension_mismatch(
                expected,
                values.len(),
                name,
            ));
        }
        Ok(())
    }

    /// Ensures an axis ordering only names existing axes.
    pub fn validate_axis_order(order: &[usize], dimension: usize, name: &str) -> Result<()> {
        if order.is_empty() {
            return Err(PackingError::InvalidConfiguration(format!(
                "{} must name at least one axis",
                name
            )));
        }
        if let Some(bad) = order.iter().find(|axis| **axis >= dimension) {
            return Err(PackingError::InvalidConfiguration(format!(
                "{} refers to axis {} but the space has {} axes",
                name, bad, dimension
            )));
        }
        Ok(())
    }
}
