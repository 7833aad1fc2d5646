//! Orientation packers: decide whether and how one item fits one container.
//!
//! Both strategies anchor the item at the container's lower corner and
//! return a new placed item; neither touches its inputs.

use serde::{Deserialize, Serialize};

use crate::geometry::Hyperrectangle;
use crate::model::Item;
use crate::types::{Dimensional, Positioned, compare_by_axes, natural_axis_order};

/// Places one item into one candidate container.
pub trait OrientationPacker {
    /// Returns the placed item, or `None` when the item does not fit.
    fn pack(&self, container: &Hyperrectangle, item: &Item) -> Option<Item>;
}

/// Packer that keeps the item's extent as given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedPacker;

impl OrientationPacker for FixedPacker {
    fn pack(&self, container: &Hyperrectangle, item: &Item) -> Option<Item> {
        if !container.can_accept(&item.bounds) {
            return None;
        }
        Some(item.with_bounds(item.bounds.moved_to(container.position())))
    }
}

/// Packer that may permute the item's axes.
///
/// # Fields
/// * `rotation_priority` - Axis order used to rank orientations (smallest extents first)
/// * `allowed_rotation_axes` - Axes whose length may change under rotation
#[derive(Clone, Debug, PartialEq)]
pub struct RotatingPacker {
    rotation_priority: Vec<usize>,
    allowed_rotation_axes: Vec<bool>,
}

impl RotatingPacker {
    /// Creates a packer. The caller guarantees that the priority only names
    /// existing axes.
    pub fn new(rotation_priority: Vec<usize>, allowed_rotation_axes: Vec<bool>) -> Self {
        Self {
            rotation_priority,
            allowed_rotation_axes,
        }
    }

    /// Packer that may rotate around every axis, ranking by natural axis order.
    pub fn unrestricted(dimension: usize) -> Self {
        Self::new(natural_axis_order(dimension), vec![true; dimension])
    }

    /// Legal orientations of `extent`, best first.
    ///
    /// Permutations are enumerated in lexicographic order of axis indices; an
    /// orientation is legal when every locked axis keeps its length. The list
    /// is then stably sorted by extents read in rotation-priority order.
    pub fn orientations(&self, extent: &[f64]) -> Vec<Vec<f64>> {
        let mut legal: Vec<Vec<f64>> = index_permutations(extent.len())
            .into_iter()
            .map(|perm| perm.into_iter().map(|axis| extent[axis]).collect::<Vec<f64>>())
            .filter(|candidate| {
                self.allowed_rotation_axes
                    .iter()
                    .enumerate()
                    .filter(|(_, allowed)| !**allowed)
                    .all(|(axis, _)| candidate.get(axis) == extent.get(axis))
            })
            .collect();

        legal.sort_by(|a, b| compare_by_axes(a, b, &self.rotation_priority));
        legal
    }
}

impl OrientationPacker for RotatingPacker {
    fn pack(&self, container: &Hyperrectangle, item: &Item) -> Option<Item> {
        self.orientations(item.extent())
            .into_iter()
            .map(|extent| item.bounds.resized_to(extent))
            .find(|candidate| container.can_accept(candidate))
            .map(|candidate| item.with_bounds(candidate.moved_to(container.position())))
    }
}

/// Index permutations of `0..n` in lexicographic order.
fn index_permutations(n: usize) -> Vec<Vec<usize>> {
    fn walk(n: usize, current: &mut Vec<usize>, used: &mut [bool], out: &mut Vec<Vec<usize>>) {
        if current.len() == n {
            out.push(current.clone());
            return;
        }
        for axis in 0..n {
            if used[axis] {
                continue;
            }
            used[axis] = true;
            current.push(axis);
            walk(n, current, used, out);
            current.pop();
            used[axis] = false;
        }
    }

    let mut out = Vec::new();
    walk(n, &mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

/// Packer choice exposed through configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackerKind {
    #[default]
    Fixed,
    Rotating,
}

impl PackerKind {
    pub fn code(&self) -> &'static str {
        match self {
            PackerKind::Fixed => "fixed",
            PackerKind::Rotating => "rotating",
        }
    }

    /// Parses the configuration spelling of a packer.
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" | "oriented" => Some(PackerKind::Fixed),
            "rotating" | "orthogonal" => Some(PackerKind::Rotating),
            _ => None,
        }
    }
}

/// Closed set of packer strategies with a uniform call signature.
#[derive(Clone, Debug, PartialEq)]
pub enum PackerStrategy {
    Fixed(FixedPacker),
    Rotating(RotatingPacker),
}

impl OrientationPacker for PackerStrategy {
    fn pack(&self, container: &Hyperrectangle, item: &Item) -> Option<Item> {
        match self {
            PackerStrategy::Fixed(packer) => packer.pack(container, item),
            PackerStrategy::Rotating(packer) => packer.pack(container, item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(position: &[f64], extent: &[f64]) -> Hyperrectangle {
        Hyperrectangle::new(position.to_vec(), extent.to_vec()).unwrap()
    }

    #[test]
    fn fixed_packer_anchors_at_container_corner() {
        let c = container(&[1.0, 1.0], &[2.0, 3.0]);
        let item = Item::new("p", vec![1.0, 3.0]).unwrap();

        let placed = FixedPacker.pack(&c, &item).expect("item should fit");
        assert_eq!(placed.position(), &[1.0, 1.0]);
        assert_eq!(placed.extent(), &[1.0, 3.0]);
        assert_eq!(item.position(), &[0.0, 0.0]);
        assert_eq!(c.position(), &[1.0, 1.0]);

        let c3 = container(&[1.0, 2.0, 0.0], &[3.0, 3.0, 3.0]);
        let cube = Item::new("q", vec![2.0, 2.0, 2.0]).unwrap();
        let placed = FixedPacker.pack(&c3, &cube).expect("cube should fit");
        assert_eq!(placed.position(), &[1.0, 2.0, 0.0]);
        assert_eq!(placed.extent(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn fixed_packer_rejects_oversized_items() {
        let c = container(&[1.0, 1.0], &[2.0, 3.0]);
        assert!(FixedPacker.pack(&c, &Item::new("p", vec![1.0, 3.1]).unwrap()).is_none());

        let c3 = container(&[1.0, 2.0, 0.0], &[3.0, 3.0, 3.0]);
        assert!(FixedPacker.pack(&c3, &Item::new("q", vec![4.0, 1.0, 1.0]).unwrap()).is_none());
    }

    #[test]
    fn fixed_packer_scenario_unit_square() {
        let c = container(&[1.0, 1.0], &[2.0, 2.0]);
        let placed = FixedPacker
            .pack(&c, &Item::new("p", vec![1.0, 1.0]).unwrap())
            .expect("unit square fits");
        assert_eq!(placed.position(), &[1.0, 1.0]);
    }

    #[test]
    fn permutations_are_lexicographic() {
        assert_eq!(
            index_permutations(3),
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert_eq!(index_permutations(1), vec![vec![0]]);
    }

    #[test]
    fn rotating_packer_keeps_locked_axis() {
        let c = container(&[0.0, 0.0, 0.0], &[5.0, 5.0, 5.0]);
        let item = Item::new("b", vec![2.0, 3.0, 1.0]).unwrap();
        let packer = RotatingPacker::new(vec![0, 1, 2], vec![true, false, true]);

        assert_eq!(
            packer.orientations(item.extent()),
            vec![vec![1.0, 3.0, 2.0], vec![2.0, 3.0, 1.0]]
        );

        let placed = packer.pack(&c, &item).expect("item fits after rotation");
        assert_eq!(placed.extent(), &[1.0, 3.0, 2.0]);
        assert_eq!(placed.position(), &[0.0, 0.0, 0.0]);
        assert_eq!(item.extent(), &[2.0, 3.0, 1.0]);
    }

    #[test]
    fn rotating_packer_follows_priority_order() {
        let packer = RotatingPacker::new(vec![1, 0], vec![true, true]);
        assert_eq!(
            packer.orientations(&[1.0, 4.0]),
            vec![vec![4.0, 1.0], vec![1.0, 4.0]]
        );
    }

    #[test]
    fn rotating_packer_falls_back_to_later_orientations() {
        let c = container(&[2.0, 0.0], &[4.0, 1.0]);
        let item = Item::new("long", vec![1.0, 4.0]).unwrap();

        assert!(FixedPacker.pack(&c, &item).is_none());
        let placed = RotatingPacker::unrestricted(2)
            .pack(&c, &item)
            .expect("rotated item fits");
        assert_eq!(placed.extent(), &[4.0, 1.0]);
        assert_eq!(placed.position(), &[2.0, 0.0]);
    }

    #[test]
    fn rotating_packer_without_freedom_is_fixed() {
        let c = container(&[0.0, 0.0], &[4.0, 1.0]);
        let item = Item::new("long", vec![1.0, 4.0]).unwrap();
        let locked = RotatingPacker::new(vec![0, 1], vec![false, false]);
        assert!(locked.pack(&c, &item).is_none());
    }

    #[test]
    fn strategy_dispatch() {
        let c = container(&[0.0, 0.0], &[4.0, 1.0]);
        let item = Item::new("long", vec![1.0, 4.0]).unwrap();
        assert!(PackerStrategy::Fixed(FixedPacker).pack(&c, &item).is_none());
        assert!(
            PackerStrategy::Rotating(RotatingPacker::unrestricted(2))
                .pack(&c, &item)
                .is_some()
        );
    }

    #[test]
    fn packer_codes() {
        assert_eq!(PackerKind::from_code(" Rotating "), Some(PackerKind::Rotating));
        assert_eq!(PackerKind::from_code("fixed"), Some(PackerKind::Fixed));
        assert_eq!(PackerKind::from_code("spinning"), None);
        assert_eq!(PackerKind::Rotating.code(), "rotating");
    }
}
