//! Cross-list moves
//!
//! Only root items move. The subtree travels with its root: every record takes
//! the destination list id while levels and child order stay as they were.

use super::engine::ListEngine;
use super::snapshot::ItemSummary;
use crate::domain::{EngineError, EngineResult, ItemId, Level};

impl ListEngine {
    /// Reject anything but an existing level-1 item of this list
    pub fn check_movable(&self, id: ItemId) -> EngineResult<()> {
        if self.index.level(id)? != Level::One {
            return Err(EngineError::MoveNotAllowed);
        }
        Ok(())
    }
}

/// Move root item `id` from `source` to the end of `destination`'s roots
///
/// Both engines are validated before either is touched.
pub fn move_root(
    source: &mut ListEngine,
    destination: &mut ListEngine,
    id: ItemId,
) -> EngineResult<ItemSummary> {
    source.check_movable(id)?;

    let mut records = source.index.remove_subtree(id)?;
    let list_id = destination.id();
    for record in &mut records {
        record.list_id = list_id;
    }
    let moved = records.len();
    destination.index.graft_root(records);

    log::debug!(
        "Moved item {} ({} records) from list {} to list {}",
        id,
        moved,
        source.id(),
        list_id
    );
    destination.summary(id)
}
