//! Axis-aligned hyperrectangles and the free-space arithmetic built on them.
//!
//! Every predicate here is computed with exact comparisons on the supplied
//! coordinates. Two boxes are compared through a single separation value
//! (positive: apart, zero: touching, negative: overlapping), which keeps the
//! touch and intersect checks consistent with each other.

use serde::Serialize;

use crate::error::{PackingError, Result};
use crate::types::validation::{validate_coordinates, validate_lengths};
use crate::types::{Dimensional, Positioned};

/// An n-dimensional axis-aligned box given by its lower corner and extent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hyperrectangle {
    position: Vec<f64>,
    extent: Vec<f64>,
}

impl Hyperrectangle {
    /// Creates a box after checking that both tuples have the same length and
    /// that the extent is non-negative.
    ///
    /// # Examples
    /// ```
    /// use pdp_packer::geometry::Hyperrectangle;
    ///
    /// assert!(Hyperrectangle::new(vec![0.0, 1.0], vec![2.0, 2.0]).is_ok());
    /// assert!(Hyperrectangle::new(vec![0.0], vec![2.0, 2.0]).is_err());
    /// ```
    pub fn new(position: Vec<f64>, extent: Vec<f64>) -> Result<Self> {
        if position.len() != extent.len() {
            return Err(PackingError::dimension_mismatch(
                extent.len(),
                position.len(),
                "box position",
            ));
        }
        validate_coordinates(&position, "Position")?;
        validate_lengths(&extent, "Extent")?;
        Ok(Self { position, extent })
    }

    /// Creates a box anchored at the origin.
    pub fn at_origin(extent: Vec<f64>) -> Result<Self> {
        Self::new(vec![0.0; extent.len()], extent)
    }

    /// Zero-dimensional box, used by geometry-less unpack instructions.
    pub(crate) fn empty() -> Self {
        Self {
            position: Vec::new(),
            extent: Vec::new(),
        }
    }

    /// Returns a copy moved to `position`. The caller guarantees matching length.
    pub(crate) fn moved_to(&self, position: &[f64]) -> Self {
        debug_assert_eq!(position.len(), self.extent.len());
        Self {
            position: position.to_vec(),
            extent: self.extent.clone(),
        }
    }

    /// Returns a copy with a new extent. The caller guarantees matching length.
    pub(crate) fn resized_to(&self, extent: Vec<f64>) -> Self {
        debug_assert_eq!(extent.len(), self.position.len());
        Self {
            position: self.position.clone(),
            extent,
        }
    }

    /// Corner opposite to the anchor (`position + extent`).
    pub fn far_corner(&self) -> Vec<f64> {
        self.position
            .iter()
            .zip(&self.extent)
            .map(|(p, e)| p + e)
            .collect()
    }

    /// Geometric center.
    pub fn center(&self) -> Vec<f64> {
        self.position
            .iter()
            .zip(&self.extent)
            .map(|(p, e)| p + e / 2.0)
            .collect()
    }

    /// Checks whether `point` lies inside the box, boundary included.
    pub fn includes_point(&self, point: &[f64]) -> bool {
        point.len() == self.dimension()
            && point
                .iter()
                .zip(self.position.iter().zip(&self.extent))
                .all(|(p, (low, len))| *p >= *low && *p <= low + len)
    }

    /// Checks whether `other` lies completely inside the box.
    pub fn includes(&self, other: &Self) -> bool {
        self.includes_point(&other.position) && self.includes_point(&other.far_corner())
    }

    /// Separation value of two boxes of equal dimensionality.
    ///
    /// Per axis the gaps `other.low - self.high` and `self.low - other.high`
    /// are taken; the result is the largest of them. Positive means the boxes
    /// are apart, zero that they touch, negative that they overlap.
    pub fn separation_value(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.dimension(), other.dimension());
        let mut value = f64::NEG_INFINITY;
        for i in 0..self.dimension() {
            let ahead = other.position[i] - self.position[i] - self.extent[i];
            let behind = self.position[i] - other.position[i] - other.extent[i];
            value = value.max(ahead).max(behind);
        }
        value
    }

    /// The boxes share boundary but no interior.
    pub fn touches(&self, other: &Self) -> bool {
        self.separation_value(other) == 0.0
    }

    /// The boxes share interior.
    pub fn intersects(&self, other: &Self) -> bool {
        self.separation_value(other) < 0.0
    }

    /// Checks whether `other`'s extent fits into this box's extent, ignoring positions.
    pub fn can_accept(&self, other: &Self) -> bool {
        self.dimension() == other.dimension()
            && self
                .extent
                .iter()
                .zip(&other.extent)
                .all(|(own, theirs)| own - theirs >= 0.0)
    }

    /// Maximal free sub-boxes left after `placed` is put into this box.
    ///
    /// For every axis at most two regions are produced: the slab beyond the
    /// placed box's far face and the slab before its near face. The regions
    /// may overlap each other; degenerate ones are dropped.
    ///
    /// ```text
    /// +-------------------+
    /// |   high side (y)   |
    /// +--------+          |
    /// | placed | high (x) |
    /// +--------+----------+
    /// ```
    pub fn free_regions_after_placing(&self, placed: &Self) -> Vec<Self> {
        debug_assert_eq!(self.dimension(), placed.dimension());
        let n = self.dimension();
        let own_far = self.far_corner();
        let placed_far = placed.far_corner();
        let mut regions = Vec::with_capacity(2 * n);

        for i in 0..n {
            if placed_far[i] < own_far[i] {
                let mut position = self.position.clone();
                position[i] = placed_far[i];
                let extent = own_far.iter().zip(&position).map(|(f, p)| f - p).collect();
                regions.push(Self { position, extent });
            }
            if placed.position[i] > self.position[i] {
                let mut extent = self.extent.clone();
                extent[i] = placed.position[i] - self.position[i];
                regions.push(Self {
                    position: self.position.clone(),
                    extent,
                });
            }
        }

        regions.retain(|region| region.extent.iter().all(|len| *len > 0.0));
        regions
    }

    /// Checks whether `other` sits in the path swept by this box along the
    /// flagged axes.
    ///
    /// The sweep grows this box axis by axis (in axis order) by `other`'s far
    /// coordinate and reports a hit as soon as a grown box overlaps `other`.
    ///
    /// ```
    /// use pdp_packer::geometry::Hyperrectangle;
    ///
    /// let gate = Hyperrectangle::at_origin(vec![2.0, 2.0]).unwrap();
    /// let ahead = Hyperrectangle::new(vec![3.0, 1.0], vec![1.0, 1.0]).unwrap();
    /// let above = Hyperrectangle::new(vec![0.0, 2.0], vec![1.0, 1.0]).unwrap();
    ///
    /// assert!(gate.is_blocked_by(&ahead, &[true, false]));
    /// assert!(!gate.is_blocked_by(&above, &[true, false]));
    /// assert!(gate.is_blocked_by(&above, &[true, true]));
    /// ```
    pub fn is_blocked_by(&self, other: &Self, axis_mask: &[bool]) -> bool {
        debug_assert_eq!(self.dimension(), other.dimension());
        let mut swept = self.clone();
        for (i, flagged) in axis_mask.iter().enumerate().take(self.dimension()) {
            if *flagged {
                swept.extent[i] += other.position[i] + other.extent[i];
            }
            if other.intersects(&swept) {
                return true;
            }
        }
        false
    }

    /// Checks whether this box directly carries `other` along the flagged axes:
    /// the boxes touch and this box, grown towards `other`, contains it.
    pub fn is_basis_for(&self, other: &Self, axis_mask: &[bool]) -> bool {
        debug_assert_eq!(self.dimension(), other.dimension());
        if !self.touches(other) {
            return false;
        }
        let mut grown = self.clone();
        for (i, flagged) in axis_mask.iter().enumerate().take(self.dimension()) {
            if *flagged {
                grown.extent[i] += other.position[i] + other.extent[i];
            }
        }
        grown.includes(other)
    }
}

impl Dimensional for Hyperrectangle {
    fn extent(&self) -> &[f64] {
        &self.extent
    }
}

impl Positioned for Hyperrectangle {
    fn position(&self) -> &[f64] {
        &self.position
    }
}
