//! Lookahead over the pack/unpack sequence.
//!
//! The access constraint only depends on the order of actions: which packed
//! items leave while the current one is still loaded, and which stay longer.

use crate::error::{PackingError, Result};
use crate::model::{Action, Item, PackedItem, Verb};

/// Position of the run inside the action sequence.
#[derive(Clone, Copy, Debug)]
pub struct SequenceCursor<'a> {
    actions: &'a [Action],
    step: usize,
}

impl<'a> SequenceCursor<'a> {
    /// Creates a cursor pointing at `step` of `actions`.
    pub fn new(actions: &'a [Action], step: usize) -> Self {
        Self { actions, step }
    }

    /// First step after `after` that unpacks `name`.
    pub fn unpack_step(&self, name: &str, after: usize) -> Option<usize> {
        self.actions
            .iter()
            .enumerate()
            .skip(after + 1)
            .find(|(_, action)| action.unpacks(name))
            .map(|(index, _)| index)
    }

    /// Packed items the current item must not obstruct.
    ///
    /// These were loaded earlier and are unloaded while the current item is
    /// still present: `packed < current < unpack(packed) < unpack(current)`.
    pub fn must_not_block<'p>(&self, name: &str, packed: &'p [PackedItem]) -> Vec<&'p PackedItem> {
        let Some(own_unpack) = self.unpack_step(name, self.step) else {
            return Vec::new();
        };
        packed
            .iter()
            .filter(|p| p.packed_at < self.step)
            .filter(|p| {
                self.unpack_step(&p.item.name, p.packed_at)
                    .is_some_and(|unpack| self.step < unpack && unpack < own_unpack)
            })
            .collect()
    }

    /// Packed items that must not obstruct the current item.
    ///
    /// These were loaded earlier and stay after the current item is unloaded:
    /// `packed < current < unpack(current) < unpack(packed)`.
    pub fn must_not_be_blocked_by<'p>(
        &self,
        name: &str,
        packed: &'p [PackedItem],
    ) -> Vec<&'p PackedItem> {
        let Some(own_unpack) = self.unpack_step(name, self.step) else {
            return Vec::new();
        };
        packed
            .iter()
            .filter(|p| p.packed_at < self.step)
            .filter(|p| {
                self.unpack_step(&p.item.name, p.packed_at)
                    .is_some_and(|unpack| own_unpack < unpack)
            })
            .collect()
    }
}

/// Turns a route of 1-based node indices into an action sequence.
///
/// With `n` items, node `k <= n` packs item `k` and node `k > n` unpacks item
/// `k - n`. This is how an external ordering search hands a candidate route
/// to the engine.
///
/// # Examples
/// ```
/// use pdp_packer::model::{Item, Verb};
/// use pdp_packer::sequence::actions_from_route;
///
/// let items = vec![
///     Item::new("a", vec![1.0, 1.0]).unwrap(),
///     Item::new("b", vec![1.0, 1.0]).unwrap(),
/// ];
/// let actions = actions_from_route(&items, &[1, 2, 3, 4]).unwrap();
/// assert_eq!(actions[2].verb, Verb::Unpack);
/// assert_eq!(actions[2].name(), "a");
/// ```
pub fn actions_from_route(items: &[Item], route: &[usize]) -> Result<Vec<Action>> {
    let n = items.len();
    route
        .iter()
        .map(|&node| match node {
            0 => Err(PackingError::InvalidConfiguration(
                "Route nodes are 1-based, got 0".to_string(),
            )),
            k if k <= n => Ok(Action::pack(items[k - 1].clone())),
            k if k <= 2 * n => Ok(Action::unpack(items[k - n - 1].name.clone())),
            k => Err(PackingError::InvalidConfiguration(format!(
                "Route node {} exceeds the {} pack and unpack nodes",
                k,
                2 * n
            ))),
        })
        .collect()
}

/// Number of pack actions in a sequence.
pub fn pack_count(actions: &[Action]) -> usize {
    actions.iter().filter(|a| a.verb == Verb::Pack).count()
}
