//! The live list of free regions owned by one packing run.

use serde::Serialize;

use crate::geometry::Hyperrectangle;
use crate::model::Item;
use crate::types::Dimensional;

/// Ordered list of free regions.
///
/// Order matters: selectors break ties by list position, so every operation
/// here keeps the relative order of surviving regions and appends new ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FreeSpace {
    regions: Vec<Hyperrectangle>,
}

impl FreeSpace {
    pub fn new(regions: Vec<Hyperrectangle>) -> Self {
        Self { regions }
    }

    #[inline]
    pub fn regions(&self) -> &[Hyperrectangle] {
        &self.regions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Removes and returns the region at `index`.
    pub fn take(&mut self, index: usize) -> Option<Hyperrectangle> {
        (index < self.regions.len()).then(|| self.regions.remove(index))
    }

    /// Appends regions at the end of the list.
    pub fn extend(&mut self, regions: impl IntoIterator<Item = Hyperrectangle>) {
        self.regions.extend(regions);
    }

    /// Drops every region that lies inside another one.
    ///
    /// Of two identical regions the earlier one survives. Returns the number
    /// of dropped regions.
    pub fn prune_included(&mut self) -> usize {
        let keep: Vec<bool> = self
            .regions
            .iter()
            .enumerate()
            .map(|(i, region)| {
                !self.regions.iter().enumerate().any(|(j, other)| {
                    j != i && other.includes(region) && (j < i || other != region)
                })
            })
            .collect();

        let before = self.regions.len();
        let mut flags = keep.into_iter();
        self.regions.retain(|_| flags.next().unwrap_or(true));
        before - self.regions.len()
    }

    /// Replaces every region that overlaps `occupied` by its residual regions.
    ///
    /// Residuals take the place of the region they came from.
    pub fn split_against(&mut self, occupied: &Hyperrectangle) {
        if !self.regions.iter().any(|r| r.intersects(occupied)) {
            return;
        }
        self.regions = std::mem::take(&mut self.regions)
            .into_iter()
            .flat_map(|region| {
                if region.intersects(occupied) {
                    region.free_regions_after_placing(occupied)
                } else {
                    vec![region]
                }
            })
            .collect();
    }

    /// Sum of region volumes; overlapping regions are counted repeatedly.
    pub fn total_hypervolume(&self) -> f64 {
        self.regions.iter().map(Dimensional::hypervolume).sum()
    }

    /// The regions as free items, for reporting.
    pub fn snapshot(&self) -> Vec<Item> {
        self.regions.iter().cloned().map(Item::free).collect()
    }
}
