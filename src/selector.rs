//! Container selection: picks the free region an item goes into.
//!
//! Three policies of increasing strictness share one call signature:
//! - `BasicSelector`: any fitting region, lowest first coordinate wins
//! - `NonBlockingSelector`: additionally respects the unload order of the sequence
//! - `StableNonBlockingSelector`: additionally requires support from below

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geometry::Hyperrectangle;
use crate::model::{Item, PackedItem};
use crate::packer::OrientationPacker;
use crate::sequence::SequenceCursor;
use crate::types::{
    DEFAULT_VERTICAL_AXIS, Positioned, axis_mask, compare_by_axes, natural_axis_order,
};

/// Options shared by all selectors.
///
/// # Fields
/// * `blocking_axes` - Axes along which access paths are swept
/// * `support_axis` - Axis that points "up" for the support check
/// * `axis_priority` - Axis order used to rank candidate regions
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionOptions {
    pub blocking_axes: Vec<bool>,
    pub support_axis: usize,
    pub axis_priority: Vec<usize>,
}

impl SelectionOptions {
    /// Defaults for a space with `dimension` axes: block along axes 0 and 1,
    /// support along axis 1 (axis 0 in a one-dimensional space), rank in
    /// natural axis order.
    pub fn for_dimension(dimension: usize) -> Self {
        Self {
            blocking_axes: axis_mask(dimension, &[0, 1]),
            support_axis: DEFAULT_VERTICAL_AXIS.min(dimension.saturating_sub(1)),
            axis_priority: natural_axis_order(dimension),
        }
    }

    /// Mask with only the support axis set.
    pub fn support_mask(&self) -> Vec<bool> {
        axis_mask(self.blocking_axes.len(), &[self.support_axis])
    }
}

/// Outcome of a successful selection.
///
/// # Fields
/// * `container_index` - Index of the chosen region in the free-space list
/// * `placed` - The item with its final geometry
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub container_index: usize,
    pub placed: Item,
}

/// Everything a selector may look at besides the free regions.
pub struct SelectionContext<'a> {
    pub packed: &'a [PackedItem],
    pub cursor: SequenceCursor<'a>,
    pub options: &'a SelectionOptions,
}

/// Chooses one free region for an item.
pub trait ContainerSelector {
    /// Returns the chosen region and placement, or `None` when no region
    /// satisfies the selector's predicates.
    fn select<P: OrientationPacker>(
        &self,
        containers: &[Hyperrectangle],
        item: &Item,
        packer: &P,
        context: &SelectionContext<'_>,
    ) -> Option<Selection>;
}

/// Every placement the packer accepts, in free-space order.
fn fitting<'c, P: OrientationPacker>(
    containers: &'c [Hyperrectangle],
    item: &'c Item,
    packer: &'c P,
) -> impl Iterator<Item = (usize, &'c Hyperrectangle, Item)> + 'c {
    containers
        .iter()
        .enumerate()
        .filter_map(move |(index, container)| {
            packer
                .pack(container, item)
                .map(|placed| (index, container, placed))
        })
}

/// Lowest first coordinate wins; ties keep free-space order.
fn first_by_leading_axis<'c>(
    candidates: impl Iterator<Item = (usize, &'c Hyperrectangle, Item)>,
) -> Option<Selection> {
    candidates
        .min_by(|(_, a, _), (_, b, _)| {
            a.position()[0]
                .partial_cmp(&b.position()[0])
                .unwrap_or(Ordering::Equal)
        })
        .map(|(container_index, _, placed)| Selection {
            container_index,
            placed,
        })
}

/// Checks a candidate placement against the unload order.
///
/// Items unloaded while the candidate is still present must keep a free
/// path past it; items unloaded after the candidate must not stand in its path.
fn respects_unload_order(placed: &Item, context: &SelectionContext<'_>) -> bool {
    let mask = &context.options.blocking_axes;
    let blocks_earlier = context
        .cursor
        .must_not_block(&placed.name, context.packed)
        .into_iter()
        .any(|earlier| earlier.item.bounds.is_blocked_by(&placed.bounds, mask));
    if blocks_earlier {
        return false;
    }
    !context
        .cursor
        .must_not_be_blocked_by(&placed.name, context.packed)
        .into_iter()
        .any(|later| placed.bounds.is_blocked_by(&later.item.bounds, mask))
}

/// Selector that only checks geometric fit.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicSelector;

impl ContainerSelector for BasicSelector {
    fn select<P: OrientationPacker>(
        &self,
        containers: &[Hyperrectangle],
        item: &Item,
        packer: &P,
        _context: &SelectionContext<'_>,
    ) -> Option<Selection> {
        first_by_leading_axis(fitting(containers, item, packer))
    }
}

/// Selector that keeps unload paths clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonBlockingSelector;

impl ContainerSelector for NonBlockingSelector {
    fn select<P: OrientationPacker>(
        &self,
        containers: &[Hyperrectangle],
        item: &Item,
        packer: &P,
        context: &SelectionContext<'_>,
    ) -> Option<Selection> {
        first_by_leading_axis(
            fitting(containers, item, packer)
                .filter(|(_, _, placed)| respects_unload_order(placed, context)),
        )
    }
}

/// Selector that keeps unload paths clear and only places on the floor or
/// directly on top of packed items.
#[derive(Clone, Copy, Debug, Default)]
pub struct StableNonBlockingSelector;

impl StableNonBlockingSelector {
    /// Lowest anchor along the support axis over all free regions.
    fn floor(containers: &[Hyperrectangle], support_axis: usize) -> Option<f64> {
        containers
            .iter()
            .filter_map(|c| c.position().get(support_axis).copied())
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }

    fn is_supported(
        placed: &Item,
        floor: Option<f64>,
        support_mask: &[bool],
        context: &SelectionContext<'_>,
    ) -> bool {
        let axis = context.options.support_axis;
        (floor.is_some() && floor == placed.position().get(axis).copied())
            || context
                .packed
                .iter()
                .any(|p| p.item.bounds.is_basis_for(&placed.bounds, support_mask))
    }
}

impl ContainerSelector for StableNonBlockingSelector {
    fn select<P: OrientationPacker>(
        &self,
        containers: &[Hyperrectangle],
        item: &Item,
        packer: &P,
        context: &SelectionContext<'_>,
    ) -> Option<Selection> {
        let priority = &context.options.axis_priority;
        let support_mask = context.options.support_mask();
        let floor = Self::floor(containers, context.options.support_axis);
        let first_load = context.packed.is_empty();

        fitting(containers, item, packer)
            .filter(|(_, _, placed)| {
                first_load
                    || (Self::is_supported(placed, floor, &support_mask, context)
                        && respects_unload_order(placed, context))
            })
            .min_by(|(_, a, _), (_, b, _)| compare_by_axes(a.position(), b.position(), priority))
            .map(|(container_index, _, placed)| Selection {
                container_index,
                placed,
            })
    }
}

/// Selector choice exposed through configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    #[default]
    Basic,
    NonBlocking,
    StableNonBlocking,
}

impl SelectorKind {
    pub fn code(&self) -> &'static str {
        match self {
            SelectorKind::Basic => "basic",
            SelectorKind::NonBlocking => "non_blocking",
            SelectorKind::StableNonBlocking => "stable_non_blocking",
        }
    }

    /// Parses the configuration spelling of a selector; `-` and `_` are interchangeable.
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "basic" => Some(SelectorKind::Basic),
            "non_blocking" => Some(SelectorKind::NonBlocking),
            "stable_non_blocking" | "stable" => Some(SelectorKind::StableNonBlocking),
            _ => None,
        }
    }
}

impl ContainerSelector for SelectorKind {
    fn select<P: OrientationPacker>(
        &self,
        containers: &[Hyperrectangle],
        item: &Item,
        packer: &P,
        context: &SelectionContext<'_>,
    ) -> Option<Selection> {
        match self {
            SelectorKind::Basic => BasicSelector.select(containers, item, packer, context),
            SelectorKind::NonBlocking => {
                NonBlockingSelector.select(containers, item, packer, context)
            }
            SelectorKind::StableNonBlocking => {
                StableNonBlockingSelector.select(containers, item, packer, context)
            }
        }
    }
}
