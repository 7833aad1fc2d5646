//! Data model for pickup-and-delivery packing runs.
//!
//! This module defines the values the engine consumes and produces:
//! - `Item`: a named box, either a solid object, an unpack instruction or a free region
//! - `Action`: a pack or unpack step of the externally supplied sequence
//! - `PackedItem`: a placed item together with the step that placed it
//!
//! All of them are plain values; the engine never shares them mutably.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{PackingError, Result};
use crate::geometry::Hyperrectangle;
use crate::types::{Dimensional, Positioned, Weighted};

/// Role of a box in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxKind {
    /// A physical object that occupies space once packed.
    Solid,
    /// A removal instruction that refers to a solid item by name.
    Unpack,
    /// Unoccupied space available for placement.
    Free,
}

fn validate_weight(weight: f64) -> Result<()> {
    if weight < 0.0 || !weight.is_finite() {
        return Err(PackingError::InvalidExtent(format!(
            "Weight must be a non-negative number, got: {}",
            weight
        )));
    }
    Ok(())
}

/// A named box with geometry, kind and weight.
///
/// # Fields
/// * `name` - Identity used to match pack and unpack actions
/// * `kind` - Role of the box
/// * `weight` - Weight of the object, 0 when not given
/// * `bounds` - Anchor and extent
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Item {
    pub name: String,
    pub kind: BoxKind,
    pub weight: f64,
    #[serde(flatten)]
    pub bounds: Hyperrectangle,
}

impl Item {
    /// Creates a weightless solid item anchored at the origin.
    ///
    /// # Examples
    /// ```
    /// use pdp_packer::model::Item;
    ///
    /// assert!(Item::new("a", vec![1.0, 2.0, 3.0]).is_ok());
    /// assert!(Item::new("b", vec![-1.0, 2.0]).is_err());
    /// ```
    pub fn new(name: impl Into<String>, extent: Vec<f64>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            kind: BoxKind::Solid,
            weight: 0.0,
            bounds: Hyperrectangle::at_origin(extent)?,
        })
    }

    /// Creates a solid item with a weight.
    pub fn weighted(name: impl Into<String>, extent: Vec<f64>, weight: f64) -> Result<Self> {
        validate_weight(weight)?;
        let mut item = Self::new(name, extent)?;
        item.weight = weight;
        Ok(item)
    }

    /// Creates a solid item at an explicit position.
    pub fn solid(
        name: impl Into<String>,
        position: Vec<f64>,
        extent: Vec<f64>,
        weight: f64,
    ) -> Result<Self> {
        validate_weight(weight)?;
        Ok(Self {
            name: name.into(),
            kind: BoxKind::Solid,
            weight,
            bounds: Hyperrectangle::new(position, extent)?,
        })
    }

    /// Wraps a free region.
    pub fn free(region: Hyperrectangle) -> Self {
        Self {
            name: String::new(),
            kind: BoxKind::Free,
            weight: 0.0,
            bounds: region,
        }
    }

    /// Creates an unpack instruction for the item called `name`.
    ///
    /// The instruction carries no geometry.
    pub fn unpack_marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BoxKind::Unpack,
            weight: 0.0,
            bounds: Hyperrectangle::empty(),
        }
    }

    /// Returns a copy of this item with new bounds.
    pub(crate) fn with_bounds(&self, bounds: Hyperrectangle) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            weight: self.weight,
            bounds,
        }
    }

    /// Corner opposite to the anchor.
    #[inline]
    pub fn far_corner(&self) -> Vec<f64> {
        self.bounds.far_corner()
    }

    /// Geometric center.
    #[inline]
    pub fn center(&self) -> Vec<f64> {
        self.bounds.center()
    }
}

impl Dimensional for Item {
    fn extent(&self) -> &[f64] {
        self.bounds.extent()
    }
}

impl Positioned for Item {
    fn position(&self) -> &[f64] {
        self.bounds.position()
    }
}

impl Weighted for Item {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// What a step of the sequence does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Pack,
    Unpack,
}

/// One step of the pack/unpack sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Action {
    pub verb: Verb,
    pub item: Item,
}

impl Action {
    /// Packs `item`.
    pub fn pack(item: Item) -> Self {
        Self {
            verb: Verb::Pack,
            item,
        }
    }

    /// Unpacks the item called `name`.
    pub fn unpack(name: impl Into<String>) -> Self {
        Self {
            verb: Verb::Unpack,
            item: Item::unpack_marker(name),
        }
    }

    /// Name of the item the action refers to.
    #[inline]
    pub fn name(&self) -> &str {
        &self.item.name
    }

    /// Checks whether this action unpacks the item called `name`.
    #[inline]
    pub fn unpacks(&self, name: &str) -> bool {
        self.verb == Verb::Unpack && self.item.name == name
    }
}

/// An item currently in the packed set.
///
/// # Fields
/// * `item` - The placed item with its final geometry
/// * `packed_at` - Index of the action that placed it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PackedItem {
    pub item: Item,
    pub packed_at: usize,
}

impl Dimensional for PackedItem {
    fn extent(&self) -> &[f64] {
        self.item.extent()
    }
}

impl Weighted for PackedItem {
    fn weight(&self) -> f64 {
        self.item.weight
    }
}
