//! Packing orchestrator for pickup-and-delivery sequences.
//!
//! The engine walks an externally supplied sequence of pack and unpack
//! actions and keeps three pieces of state in step with it:
//! - the free-space list (maximal free regions, refreshed after every action)
//! - the packed set (items currently loaded)
//! - the action log and a metrics sample per executed action
//!
//! A pack action that finds no region ends the run early. This is an ordinary
//! outcome, reported through [`PackingOutcome::halted`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PackingError, Result};
use crate::free_space::FreeSpace;
use crate::geometry::Hyperrectangle;
use crate::model::{Action, BoxKind, Item, PackedItem, Verb};
use crate::packer::{FixedPacker, PackerKind, PackerStrategy, RotatingPacker};
use crate::selector::{ContainerSelector, SelectionContext, SelectionOptions, SelectorKind};
use crate::sequence::{SequenceCursor, actions_from_route, pack_count};
use crate::types::validation::{validate_axis_count, validate_axis_order};
use crate::types::{
    DEFAULT_METRIC_AXIS, DEFAULT_VERTICAL_AXIS, Dimensional, Positioned, axis_mask,
    natural_axis_order, total_hypervolume, total_weight,
};

/// Configuration of a packing run.
///
/// Axis lists left at `None` resolve to defaults that depend on the run's
/// dimensionality; see [`EngineConfig::resolve`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Orientation strategy
    pub packer: PackerKind,
    /// Region selection policy
    pub selector: SelectorKind,
    /// Axis order for ranking candidate regions (stable selector)
    pub axis_priority: Option<Vec<usize>>,
    /// Axis order for ranking orientations (rotating packer)
    pub rotation_priority: Option<Vec<usize>>,
    /// Axes whose length may change under rotation
    pub allowed_rotation_axes: Option<Vec<bool>>,
    /// Axes along which access paths are swept
    pub blocking_axes: Option<Vec<bool>>,
    /// Axis that points "up"
    pub support_axis: usize,
    /// Axis along which the maximum reached extent is recorded
    pub metric_axis: usize,
    /// Drop free regions that lie inside other free regions
    pub prune_included_containers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            packer: PackerKind::default(),
            selector: SelectorKind::default(),
            axis_priority: None,
            rotation_priority: None,
            allowed_rotation_axes: None,
            blocking_axes: None,
            support_axis: DEFAULT_VERTICAL_AXIS,
            metric_axis: DEFAULT_METRIC_AXIS,
            prune_included_containers: false,
        }
    }
}

impl EngineConfig {
    /// Creates a builder for a custom configuration.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Resolves defaults for a space with `dimension` axes and validates the result.
    pub fn resolve(&self, dimension: usize) -> Result<ResolvedConfig> {
        let axis_priority = self
            .axis_priority
            .clone()
            .unwrap_or_else(|| natural_axis_order(dimension));
        validate_axis_order(&axis_priority, dimension, "Axis priority")?;

        let blocking_axes = self
            .blocking_axes
            .clone()
            .unwrap_or_else(|| axis_mask(dimension, &[0, 1]));
        validate_axis_count(&blocking_axes, dimension, "blocking axes")?;

        if self.metric_axis >= dimension {
            return Err(PackingError::InvalidConfiguration(format!(
                "Metric axis {} does not exist in a space with {} axes",
                self.metric_axis, dimension
            )));
        }
        if self.selector == SelectorKind::StableNonBlocking && self.support_axis >= dimension {
            return Err(PackingError::InvalidConfiguration(format!(
                "Support axis {} does not exist in a space with {} axes",
                self.support_axis, dimension
            )));
        }

        let packer = match self.packer {
            PackerKind::Fixed => PackerStrategy::Fixed(FixedPacker),
            PackerKind::Rotating => {
                let priority = self
                    .rotation_priority
                    .clone()
                    .unwrap_or_else(|| natural_axis_order(dimension));
                validate_axis_order(&priority, dimension, "Rotation priority")?;
                let allowed = self
                    .allowed_rotation_axes
                    .clone()
                    .unwrap_or_else(|| vec![true; dimension]);
                validate_axis_count(&allowed, dimension, "allowed rotation axes")?;
                PackerStrategy::Rotating(RotatingPacker::new(priority, allowed))
            }
        };

        Ok(ResolvedConfig {
            packer,
            selector: self.selector,
            options: SelectionOptions {
                blocking_axes,
                support_axis: self.support_axis,
                axis_priority,
            },
            metric_axis: self.metric_axis,
            prune_included_containers: self.prune_included_containers,
        })
    }
}

/// Builder for [`EngineConfig`].
#[derive(Clone, Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn packer(mut self, packer: PackerKind) -> Self {
        self.config.packer = packer;
        self
    }

    pub fn selector(mut self, selector: SelectorKind) -> Self {
        self.config.selector = selector;
        self
    }

    pub fn axis_priority(mut self, axes: Vec<usize>) -> Self {
        self.config.axis_priority = Some(axes);
        self
    }

    pub fn rotation_priority(mut self, axes: Vec<usize>) -> Self {
        self.config.rotation_priority = Some(axes);
        self
    }

    pub fn allowed_rotation_axes(mut self, mask: Vec<bool>) -> Self {
        self.config.allowed_rotation_axes = Some(mask);
        self
    }

    pub fn blocking_axes(mut self, mask: Vec<bool>) -> Self {
        self.config.blocking_axes = Some(mask);
        self
    }

    pub fn support_axis(mut self, axis: usize) -> Self {
        self.config.support_axis = axis;
        self
    }

    pub fn metric_axis(mut self, axis: usize) -> Self {
        self.config.metric_axis = axis;
        self
    }

    pub fn prune_included_containers(mut self, enabled: bool) -> Self {
        self.config.prune_included_containers = enabled;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

/// Configuration with every default filled in for one dimensionality.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub packer: PackerStrategy,
    pub selector: SelectorKind,
    pub options: SelectionOptions,
    pub metric_axis: usize,
    pub prune_included_containers: bool,
}

/// Events emitted while a run progresses, for live observers (SSE, logs, tests).
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// The run is about to execute its first action.
    RunStarted {
        actions: usize,
        packs: usize,
        containers: usize,
        dimension: usize,
    },
    /// An item was placed.
    ItemPacked {
        step: usize,
        name: String,
        position: Vec<f64>,
        extent: Vec<f64>,
        container_index: usize,
        loading: f64,
        total_weight: f64,
    },
    /// An item was removed.
    ItemUnpacked {
        step: usize,
        name: String,
        free_regions: usize,
    },
    /// An unpack action named an item that is not loaded.
    UnknownUnpack { step: usize, name: String },
    /// No region accepted the item; the run stops here.
    Halted { step: usize, name: String },
    /// The run ended.
    Finished {
        executed: usize,
        packed: usize,
        halted: bool,
    },
}

/// Quality figures after one executed action.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MetricSample {
    pub step: usize,
    /// Largest far coordinate of a packed item along the metric axis
    pub max_extent: f64,
    /// Packed volume divided by total container volume
    pub loading: f64,
    /// Total weight on board
    pub weight: f64,
}

/// Metrics time series of a run, one sample per logged action.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    pub metric_axis: usize,
    pub samples: Vec<MetricSample>,
}

impl RunMetrics {
    pub fn max_extent_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.max_extent).collect()
    }

    pub fn loading_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.loading).collect()
    }

    pub fn weight_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.weight).collect()
    }

    /// Highest load weight over the run, 0 when nothing was logged.
    pub fn peak_weight(&self) -> f64 {
        self.samples.iter().map(|s| s.weight).fold(0.0, f64::max)
    }
}

/// One executed action together with the geometry it acted on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggedAction {
    pub step: usize,
    pub verb: Verb,
    pub item: Item,
}

/// Where and why a run stopped early.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Halt {
    pub step: usize,
    pub name: String,
}

/// Result of a packing run; always consistent, also after an early halt.
#[derive(Clone, Debug, Serialize)]
pub struct PackingOutcome {
    /// Items still loaded at the end
    pub packed: Vec<PackedItem>,
    /// Executed actions in order
    pub actions: Vec<LoggedAction>,
    pub metrics: RunMetrics,
    /// Remaining free regions
    pub free_space: FreeSpace,
    /// Set when a pack action found no region
    pub halted: Option<Halt>,
    /// Length of the input sequence
    pub total_actions: usize,
}

impl PackingOutcome {
    /// The run processed every action without halting.
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }

    /// Number of logged actions.
    pub fn executed_count(&self) -> usize {
        self.actions.len()
    }

    /// Checks whether the run delivered its route.
    ///
    /// A partial route only has to execute every action. A full route must
    /// also end empty and never exceed `capacity` on the way.
    pub fn is_delivery_complete(&self, capacity: f64, partial_route: bool) -> bool {
        let all_executed = self.actions.len() == self.total_actions;
        if partial_route {
            return all_executed;
        }
        all_executed
            && self.packed.is_empty()
            && self.metrics.samples.iter().all(|s| s.weight <= capacity)
    }

    /// Final free space as free items.
    pub fn free_items(&self) -> Vec<Item> {
        self.free_space.snapshot()
    }
}

/// Runs `actions` against `containers`.
pub fn pack_sequence(
    actions: &[Action],
    containers: &[Hyperrectangle],
    config: &EngineConfig,
) -> Result<PackingOutcome> {
    pack_sequence_with_progress(actions, containers, config, |_| {})
}

/// Runs `actions` against `containers` and reports every step to `on_event`.
///
/// Fails before executing anything when the input is malformed; afterwards
/// the run always produces an outcome.
pub fn pack_sequence_with_progress(
    actions: &[Action],
    containers: &[Hyperrectangle],
    config: &EngineConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> Result<PackingOutcome> {
    let dimension = validate_input(actions, containers)?;
    let resolved = config.resolve(dimension)?;

    on_event(&PackEvent::RunStarted {
        actions: actions.len(),
        packs: pack_count(actions),
        containers: containers.len(),
        dimension,
    });

    let mut run = PackingRun::new(actions, containers, &resolved);
    for step in 0..actions.len() {
        if !run.execute(step, &mut on_event) {
            break;
        }
    }
    let outcome = run.finish();

    info!(
        executed = outcome.actions.len(),
        total = outcome.total_actions,
        packed = outcome.packed.len(),
        halted = outcome.halted.is_some(),
        "Packing run finished"
    );
    on_event(&PackEvent::Finished {
        executed: outcome.actions.len(),
        packed: outcome.packed.len(),
        halted: outcome.halted.is_some(),
    });
    Ok(outcome)
}

/// Checks dimensions of every container and packed item; returns the dimension.
fn validate_input(actions: &[Action], containers: &[Hyperrectangle]) -> Result<usize> {
    let Some(first) = containers.first() else {
        return Err(PackingError::InvalidConfiguration(
            "At least one container is required".to_string(),
        ));
    };
    let dimension = first.dimension();
    if dimension == 0 {
        return Err(PackingError::InvalidConfiguration(
            "Containers need at least one axis".to_string(),
        ));
    }

    for (index, container) in containers.iter().enumerate() {
        validate_axis_count(
            container.extent(),
            dimension,
            &format!("container {}", index),
        )?;
    }

    for (step, action) in actions.iter().enumerate() {
        if action.verb != Verb::Pack {
            continue;
        }
        if action.item.kind != BoxKind::Solid {
            return Err(PackingError::InvalidConfiguration(format!(
                "Pack action {} must carry a solid item, '{}' is {:?}",
                step, action.item.name, action.item.kind
            )));
        }
        validate_axis_count(
            action.item.extent(),
            dimension,
            &format!("item '{}' at step {}", action.item.name, step),
        )?;
    }
    Ok(dimension)
}

/// Mutable state of one run.
struct PackingRun<'a> {
    actions: &'a [Action],
    containers: &'a [Hyperrectangle],
    config: &'a ResolvedConfig,
    container_volume: f64,
    free_space: FreeSpace,
    packed: Vec<PackedItem>,
    log: Vec<LoggedAction>,
    metrics: RunMetrics,
    halted: Option<Halt>,
}

impl<'a> PackingRun<'a> {
    fn new(
        actions: &'a [Action],
        containers: &'a [Hyperrectangle],
        config: &'a ResolvedConfig,
    ) -> Self {
        Self {
            actions,
            containers,
            config,
            container_volume: total_hypervolume(containers),
            free_space: FreeSpace::new(containers.to_vec()),
            packed: Vec::new(),
            log: Vec::with_capacity(actions.len()),
            metrics: RunMetrics {
                metric_axis: config.metric_axis,
                samples: Vec::with_capacity(actions.len()),
            },
            halted: None,
        }
    }

    /// Executes one action; returns `false` when the run has to stop.
    fn execute(&mut self, step: usize, on_event: &mut impl FnMut(&PackEvent)) -> bool {
        let actions = self.actions;
        let action = &actions[step];
        match action.verb {
            Verb::Pack => self.pack(step, &action.item, on_event),
            Verb::Unpack => {
                self.unpack(step, &action.item.name, on_event);
                true
            }
        }
    }

    fn pack(&mut self, step: usize, item: &Item, on_event: &mut impl FnMut(&PackEvent)) -> bool {
        let context = SelectionContext {
            packed: &self.packed,
            cursor: SequenceCursor::new(self.actions, step),
            options: &self.config.options,
        };
        let selection = self.config.selector.select(
            self.free_space.regions(),
            item,
            &self.config.packer,
            &context,
        );

        let Some(selection) = selection else {
            warn!(step, name = %item.name, "No free region accepts the item, halting");
            on_event(&PackEvent::Halted {
                step,
                name: item.name.clone(),
            });
            self.halted = Some(Halt {
                step,
                name: item.name.clone(),
            });
            return false;
        };

        let placed = selection.placed;
        debug!(
            step,
            name = %placed.name,
            position = ?placed.position(),
            extent = ?placed.extent(),
            "Item packed"
        );

        self.packed.push(PackedItem {
            item: placed.clone(),
            packed_at: step,
        });
        self.log.push(LoggedAction {
            step,
            verb: Verb::Pack,
            item: placed.clone(),
        });
        let sample = self.record_sample(step);

        if let Some(chosen) = self.free_space.take(selection.container_index) {
            self.free_space
                .extend(chosen.free_regions_after_placing(&placed.bounds));
        }
        if self.config.prune_included_containers {
            self.free_space.prune_included();
        }
        self.free_space.split_against(&placed.bounds);

        on_event(&PackEvent::ItemPacked {
            step,
            name: placed.name.clone(),
            position: placed.position().to_vec(),
            extent: placed.extent().to_vec(),
            container_index: selection.container_index,
            loading: sample.loading,
            total_weight: sample.weight,
        });
        true
    }

    fn unpack(&mut self, step: usize, name: &str, on_event: &mut impl FnMut(&PackEvent)) {
        let found = self
            .packed
            .iter()
            .position(|p| p.item.name == name && p.item.kind == BoxKind::Solid);
        let Some(index) = found else {
            warn!(step, name, "Unpack refers to an item that is not loaded");
            on_event(&PackEvent::UnknownUnpack {
                step,
                name: name.to_string(),
            });
            return;
        };

        let removed = self.packed.remove(index).item;
        if let Some(vacated) = self.vacated_region(&removed) {
            self.free_space.extend([vacated]);
            if self.config.prune_included_containers {
                self.free_space.prune_included();
            }
            for still_packed in &self.packed {
                self.free_space.split_against(&still_packed.item.bounds);
            }
        }
        debug!(step, name, free_regions = self.free_space.len(), "Item unpacked");

        self.log.push(LoggedAction {
            step,
            verb: Verb::Unpack,
            item: removed,
        });
        self.record_sample(step);

        on_event(&PackEvent::ItemUnpacked {
            step,
            name: name.to_string(),
            free_regions: self.free_space.len(),
        });
    }

    /// Region from the removed item's anchor to the far corner of the first
    /// container holding it.
    fn vacated_region(&self, removed: &Item) -> Option<Hyperrectangle> {
        let container = self
            .containers
            .iter()
            .find(|c| c.includes(&removed.bounds))?;
        let extent = container
            .far_corner()
            .iter()
            .zip(removed.position())
            .map(|(far, low)| far - low)
            .collect();
        Hyperrectangle::new(removed.position().to_vec(), extent).ok()
    }

    fn record_sample(&mut self, step: usize) -> MetricSample {
        let axis = self.config.metric_axis;
        let max_extent = self
            .packed
            .iter()
            .map(|p| p.item.position()[axis] + p.item.extent()[axis])
            .fold(None, |best: Option<f64>, value| {
                Some(best.map_or(value, |b| b.max(value)))
            })
            .unwrap_or(0.0);
        let loading = if self.packed.is_empty() || self.container_volume <= 0.0 {
            0.0
        } else {
            total_hypervolume(&self.packed) / self.container_volume
        };
        let sample = MetricSample {
            step,
            max_extent,
            loading,
            weight: total_weight(&self.packed),
        };
        self.metrics.samples.push(sample);
        sample
    }

    fn finish(self) -> PackingOutcome {
        PackingOutcome {
            packed: self.packed,
            actions: self.log,
            metrics: self.metrics,
            free_space: self.free_space,
            halted: self.halted,
            total_actions: self.actions.len(),
        }
    }
}

/// A route that passed the delivery check.
#[derive(Clone, Debug)]
pub struct FeasibleRoute {
    /// Index of the route in the candidate list
    pub index: usize,
    pub outcome: PackingOutcome,
}

/// Tries candidate routes in order and returns the first one that delivers.
///
/// Every route is a list of 1-based node indices over `items` (see
/// [`actions_from_route`]). Malformed routes or inputs abort the scan.
pub fn first_feasible_route(
    items: &[Item],
    routes: &[Vec<usize>],
    containers: &[Hyperrectangle],
    config: &EngineConfig,
    capacity: f64,
    partial_route: bool,
) -> Result<Option<FeasibleRoute>> {
    for (index, route) in routes.iter().enumerate() {
        let actions = actions_from_route(items, route)?;
        let outcome = pack_sequence(&actions, containers, config)?;
        if outcome.is_delivery_complete(capacity, partial_route) {
            debug!(index, "Feasible route found");
            return Ok(Some(FeasibleRoute { index, outcome }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(position: &[f64], extent: &[f64]) -> Hyperrectangle {
        Hyperrectangle::new(position.to_vec(), extent.to_vec()).unwrap()
    }

    fn cube(name: &str) -> Item {
        Item::new(name, vec![1.0, 1.0, 1.0]).unwrap()
    }

    fn positions(outcome: &PackingOutcome) -> Vec<Vec<f64>> {
        outcome
            .actions
            .iter()
            .filter(|a| a.verb == Verb::Pack)
            .map(|a| a.item.position().to_vec())
            .collect()
    }

    /// a b c -a -c -b
    fn nested_delivery() -> Vec<Action> {
        vec![
            Action::pack(cube("a")),
            Action::pack(cube("b")),
            Action::pack(cube("c")),
            Action::unpack("a"),
            Action::unpack("c"),
            Action::unpack("b"),
        ]
    }

    #[test]
    fn single_item_lands_on_container_anchor() {
        let containers = [rect(&[1.0, 1.0], &[2.0, 2.0])];
        let actions = [Action::pack(Item::new("p", vec![1.0, 1.0]).unwrap())];

        let outcome = pack_sequence(&actions, &containers, &EngineConfig::default()).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.packed.len(), 1);
        assert_eq!(outcome.packed[0].item.position(), &[1.0, 1.0]);
    }

    #[test]
    fn basic_selector_fills_column_then_side() {
        let containers = [rect(&[0.0, 0.0], &[5.0, 8.0])];
        let actions: Vec<Action> = [[4.0, 2.0], [3.0, 3.0], [2.0, 4.0]]
            .iter()
            .enumerate()
            .map(|(i, extent)| Action::pack(Item::new(format!("i{}", i), extent.to_vec()).unwrap()))
            .collect();

        let outcome = pack_sequence(&actions, &containers, &EngineConfig::default()).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(
            positions(&outcome),
            vec![vec![0.0, 0.0], vec![0.0, 2.0], vec![3.0, 2.0]]
        );
        assert_eq!(outcome.metrics.max_extent_series(), vec![4.0, 4.0, 5.0]);
        assert_eq!(outcome.metrics.loading_series(), vec![0.2, 0.425, 0.625]);
    }

    #[test]
    fn nested_delivery_with_stable_selector() {
        let containers = [rect(&[0.0, 0.0, 0.0], &[30.0, 10.0, 10.0])];
        let config = EngineConfig::builder()
            .selector(SelectorKind::StableNonBlocking)
            .build();

        let outcome = pack_sequence(&nested_delivery(), &containers, &config).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(
            positions(&outcome),
            vec![
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 2.0],
            ]
        );
        assert_eq!(outcome.actions.len(), 6);
        assert!(outcome.packed.is_empty());
        assert_eq!(
            outcome.metrics.max_extent_series(),
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.0]
        );
        assert!(outcome.is_delivery_complete(0.0, false));
    }

    #[test]
    fn rotating_packer_through_the_engine() {
        let containers = [rect(&[0.0, 0.0, 0.0], &[5.0, 5.0, 5.0])];
        let actions = [Action::pack(Item::new("b", vec![2.0, 3.0, 1.0]).unwrap())];
        let config = EngineConfig::builder()
            .packer(PackerKind::Rotating)
            .allowed_rotation_axes(vec![true, false, true])
            .rotation_priority(vec![0, 1, 2])
            .build();

        let outcome = pack_sequence(&actions, &containers, &config).unwrap();
        assert_eq!(outcome.packed[0].item.extent(), &[1.0, 3.0, 2.0]);
    }

    #[test]
    fn unplaceable_item_halts_with_partial_results() {
        let containers = [rect(&[0.0, 0.0], &[2.0, 2.0])];
        let actions = [
            Action::pack(Item::new("a", vec![2.0, 1.0]).unwrap()),
            Action::pack(Item::new("b", vec![2.0, 2.0]).unwrap()),
            Action::pack(Item::new("c", vec![1.0, 1.0]).unwrap()),
        ];

        let mut events = Vec::new();
        let outcome = pack_sequence_with_progress(
            &actions,
            &containers,
            &EngineConfig::default(),
            |event| events.push(event.clone()),
        )
        .unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(
            outcome.halted,
            Some(Halt {
                step: 1,
                name: "b".to_string()
            })
        );
        assert_eq!(outcome.packed.len(), 1);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.metrics.samples.len(), 1);
        assert!(!outcome.is_delivery_complete(100.0, true));
        assert!(matches!(
            events.first(),
            Some(PackEvent::RunStarted {
                actions: 3,
                packs: 3,
                ..
            })
        ));
        assert!(events.iter().any(|e| matches!(e, PackEvent::Halted { step: 1, .. })));
        assert!(matches!(
            events.last(),
            Some(PackEvent::Finished {
                executed: 1,
                halted: true,
                ..
            })
        ));
    }

    #[test]
    fn unknown_unpack_is_skipped() {
        let containers = [rect(&[0.0, 0.0], &[4.0, 4.0])];
        let actions = [
            Action::pack(Item::new("a", vec![1.0, 1.0]).unwrap()),
            Action::unpack("ghost"),
            Action::unpack("a"),
        ];

        let mut unknown = 0;
        let outcome = pack_sequence_with_progress(
            &actions,
            &containers,
            &EngineConfig::default(),
            |event| {
                if let PackEvent::UnknownUnpack { name, .. } = event {
                    assert_eq!(name, "ghost");
                    unknown += 1;
                }
            },
        )
        .unwrap();

        assert_eq!(unknown, 1);
        assert!(outcome.is_complete());
        assert_eq!(outcome.actions.len(), 2);
        assert_eq!(outcome.metrics.samples.len(), 2);
        assert_eq!(outcome.actions[1].step, 2);
        assert!(outcome.packed.is_empty());
        assert!(!outcome.is_delivery_complete(10.0, true));
    }

    #[test]
    fn pack_then_unpack_restores_free_space_when_pruning() {
        let container = rect(&[0.0, 0.0, 0.0], &[30.0, 10.0, 10.0]);
        let actions = [
            Action::pack(Item::new("a", vec![3.0, 2.0, 1.0]).unwrap()),
            Action::unpack("a"),
        ];
        let config = EngineConfig::builder()
            .prune_included_containers(true)
            .build();

        let outcome = pack_sequence(&actions, &[container.clone()], &config).unwrap();
        assert_eq!(outcome.free_space.regions(), &[container]);
        assert_eq!(outcome.metrics.loading_series(), vec![0.002, 0.0]);
    }

    #[test]
    fn unpack_from_interior_reopens_space_to_far_corner() {
        let container = rect(&[0.0, 0.0], &[4.0, 2.0]);
        let actions = [
            Action::pack(Item::new("a", vec![1.0, 2.0]).unwrap()),
            Action::pack(Item::new("b", vec![1.0, 2.0]).unwrap()),
            Action::unpack("b"),
        ];
        let config = EngineConfig::builder()
            .prune_included_containers(true)
            .build();

        let outcome = pack_sequence(&actions, &[container], &config).unwrap();
        assert_eq!(outcome.packed.len(), 1);
        assert_eq!(outcome.free_space.regions(), &[rect(&[1.0, 0.0], &[3.0, 2.0])]);

        let free = outcome.free_items();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].kind, BoxKind::Free);
    }

    #[test]
    fn weights_are_tracked_and_capped() {
        let containers = [rect(&[0.0, 0.0], &[4.0, 4.0])];
        let actions = [
            Action::pack(Item::weighted("a", vec![1.0, 1.0], 10.0).unwrap()),
            Action::pack(Item::weighted("b", vec![1.0, 1.0], 5.0).unwrap()),
            Action::unpack("a"),
            Action::unpack("b"),
        ];

        let outcome = pack_sequence(&actions, &containers, &EngineConfig::default()).unwrap();
        assert_eq!(outcome.metrics.weight_series(), vec![10.0, 15.0, 5.0, 0.0]);
        assert_eq!(outcome.metrics.peak_weight(), 15.0);
        assert!(outcome.is_delivery_complete(15.0, false));
        assert!(!outcome.is_delivery_complete(12.0, false));
    }

    #[test]
    fn mismatched_dimensions_abort_before_running() {
        let containers = [rect(&[0.0, 0.0], &[4.0, 4.0])];
        let actions = [
            Action::pack(Item::new("a", vec![1.0, 1.0]).unwrap()),
            Action::pack(Item::new("b", vec![1.0, 1.0, 1.0]).unwrap()),
        ];

        let mut events = 0;
        let result = pack_sequence_with_progress(
            &actions,
            &containers,
            &EngineConfig::default(),
            |_| events += 1,
        );
        assert!(matches!(
            result,
            Err(PackingError::DimensionMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
        assert_eq!(events, 0);

        let mixed = [rect(&[0.0, 0.0], &[4.0, 4.0]), rect(&[0.0], &[4.0])];
        assert!(matches!(
            pack_sequence(&[], &mixed, &EngineConfig::default()),
            Err(PackingError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let containers = [rect(&[0.0, 0.0], &[4.0, 4.0])];
        assert!(matches!(
            pack_sequence(&[], &[], &EngineConfig::default()),
            Err(PackingError::InvalidConfiguration(_))
        ));

        let bad_priority = EngineConfig::builder().axis_priority(vec![0, 2]).build();
        assert!(matches!(
            pack_sequence(&[], &containers, &bad_priority),
            Err(PackingError::InvalidConfiguration(_))
        ));

        let bad_mask = EngineConfig::builder()
            .blocking_axes(vec![true, true, false])
            .build();
        assert!(matches!(
            pack_sequence(&[], &containers, &bad_mask),
            Err(PackingError::DimensionMismatch { .. })
        ));

        let bad_metric = EngineConfig::builder().metric_axis(2).build();
        assert!(pack_sequence(&[], &containers, &bad_metric).is_err());
    }

    #[test]
    fn runs_are_deterministic() {
        let containers = [rect(&[0.0, 0.0, 0.0], &[6.0, 4.0, 4.0])];
        let items: Vec<Item> = [[2.0, 1.0, 1.0], [1.0, 2.0, 1.0], [1.0, 1.0, 2.0], [2.0, 2.0, 2.0]]
            .iter()
            .enumerate()
            .map(|(i, extent)| Item::new(format!("i{}", i), extent.to_vec()).unwrap())
            .collect();
        let actions = actions_from_route(&items, &[1, 2, 3, 5, 4, 7, 6, 8]).unwrap();
        let config = EngineConfig::builder()
            .selector(SelectorKind::StableNonBlocking)
            .packer(PackerKind::Rotating)
            .build();

        let first = pack_sequence(&actions, &containers, &config).unwrap();
        let second = pack_sequence(&actions, &containers, &config).unwrap();
        assert_eq!(first.actions, second.actions);
        assert_eq!(first.metrics, second.metrics);
        assert_eq!(first.free_space, second.free_space);
    }

    #[test]
    fn first_feasible_route_skips_blocked_orders() {
        // One slot: a route that loads both items at once cannot work.
        let containers = [rect(&[0.0, 0.0], &[1.0, 1.0])];
        let items = vec![
            Item::new("a", vec![1.0, 1.0]).unwrap(),
            Item::new("b", vec![1.0, 1.0]).unwrap(),
        ];
        let routes = vec![vec![1, 2, 3, 4], vec![1, 3, 2, 4]];

        let found = first_feasible_route(
            &items,
            &routes,
            &containers,
            &EngineConfig::default(),
            10.0,
            false,
        )
        .unwrap()
        .expect("second route delivers");
        assert_eq!(found.index, 1);
        assert!(found.outcome.packed.is_empty());

        let none = first_feasible_route(
            &items,
            &routes[..1],
            &containers,
            &EngineConfig::default(),
            10.0,
            false,
        )
        .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn outcome_serializes_for_collaborators() {
        let containers = [rect(&[0.0, 0.0], &[2.0, 2.0])];
        let actions = [Action::pack(Item::new("a", vec![1.0, 1.0]).unwrap())];
        let outcome = pack_sequence(&actions, &containers, &EngineConfig::default()).unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["actions"][0]["verb"], "pack");
        assert_eq!(json["actions"][0]["item"]["name"], "a");
        assert_eq!(json["metrics"]["samples"][0]["max_extent"], 1.0);
        assert!(json["free_space"].is_array());

        let event = serde_json::to_value(PackEvent::Halted {
            step: 3,
            name: "x".to_string(),
        })
        .unwrap();
        assert_eq!(event["type"], "Halted");
    }
}
