//! Forest Module
//!
//! Per-list task forest split into specialized sub-modules:
//! - index: arena lookup, traversal and structural edits
//! - gate: completion rule
//! - engine: validated, atomic mutations of one list
//! - transfer: moving a root item between two lists
//! - snapshot: flat and nested views for callers

mod engine;
mod gate;
mod index;
mod snapshot;
mod transfer;

pub use engine::ListEngine;
pub use gate::{can_complete, GateDecision};
pub use index::{Ancestors, Subtree, TreeIndex};
pub use snapshot::{build_forest, flatten_forest, ItemNode, ItemSummary, ListSnapshot};
pub use transfer::move_root;
