//! Domain Layer - Core Entity Trait and Identifiers
//!
//! Every entity has a unique, immutable identifier. Identifiers are handed out
//! by a shared `IdAllocator` and are never reused, even after deletion.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Identifier of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub u64);

/// Identifier of an item, unique across all lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source shared by every list of a registry
#[derive(Debug)]
pub struct IdAllocator {
    next_list: AtomicU64,
    next_item: AtomicU64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_list: AtomicU64::new(1),
            next_item: AtomicU64::new(1),
        }
    }

    pub fn next_list_id(&self) -> ListId {
        ListId(self.next_list.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_item_id(&self) -> ItemId {
        ItemId(self.next_item.fetch_add(1, Ordering::Relaxed))
    }

    /// Record an id that already exists (e.g. loaded from storage) so it is never handed out again
    pub fn observe_list(&self, id: ListId) {
        self.next_list.fetch_max(id.0 + 1, Ordering::Relaxed);
    }

    pub fn observe_item(&self, id: ItemId) {
        self.next_item.fetch_max(id.0 + 1, Ordering::Relaxed);
    }
}

/// Trim user text, rejecting it when nothing is left
pub fn normalize_text(raw: &str) -> EngineResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyContent);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_never_reused() {
        let ids = IdAllocator::new();
        let a = ids.next_item_id();
        let b = ids.next_item_id();
        assert_ne!(a, b);

        ids.observe_item(ItemId(41));
        assert_eq!(ids.next_item_id(), ItemId(42));

        // observing an older id must not move the counter backwards
        ids.observe_item(ItemId(3));
        assert_eq!(ids.next_item_id(), ItemId(43));
    }

    #[test]
    fn test_list_and_item_counters_are_independent() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_list_id(), ListId(1));
        assert_eq!(ids.next_item_id(), ItemId(1));
        assert_eq!(ids.next_list_id(), ListId(2));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Buy milk \n").unwrap(), "Buy milk");
        assert_eq!(normalize_text("   "), Err(EngineError::EmptyContent));
        assert_eq!(normalize_text(""), Err(EngineError::EmptyContent));
    }
}
