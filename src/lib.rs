//! Sequential pickup-and-delivery packing of axis-aligned boxes in any
//! number of dimensions.
//!
//! A run takes a list of containers and an ordered list of pack and unpack
//! actions. Every pack places one item into the free space, every unpack
//! returns its volume. The run stops at the first item that finds no place.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod free_space;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod selector;
pub mod sequence;
pub mod types;

pub use engine::{
    EngineConfig, PackEvent, PackingOutcome, first_feasible_route, pack_sequence,
    pack_sequence_with_progress,
};
pub use error::PackingError;
pub use geometry::Hyperrectangle;
pub use model::{Action, Item};
