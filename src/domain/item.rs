//! Item Entity
//!
//! Represents a task node inside a list's forest. Items are stored flat: each
//! record knows its parent and the ordered ids of its children.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, ItemId, ListId};

/// Nesting depth of an item (root = 1, deepest = 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Level {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Level {
    pub const MAX: Level = Level::Three;

    /// Level for an item with `depth` ancestors above it
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => Some(Level::One),
            1 => Some(Level::Two),
            2 => Some(Level::Three),
            _ => None,
        }
    }

    /// Level of a child placed under an item of this level
    pub fn child(self) -> Option<Self> {
        match self {
            Level::One => Some(Level::Two),
            Level::Two => Some(Level::Three),
            Level::Three => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_root(self) -> bool {
        self == Level::One
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.as_u8()
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            other => Err(format!("level must be 1, 2 or 3, got {}", other)),
        }
    }
}

/// A task item
///
/// `level` is not stored; it is derived from the parent chain by the tree index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Owning list, changed only by a move
    pub list_id: ListId,
    pub content: String,
    pub completed: bool,
    /// Presentation-only flag, never consulted by mutations
    pub collapsed: bool,
    /// Parent item (None = root level)
    pub parent_id: Option<ItemId>,
    /// Direct children in insertion order
    pub children: Vec<ItemId>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Create a new root item
    pub fn new(id: ItemId, list_id: ListId, content: String) -> Self {
        Self {
            id,
            list_id,
            content,
            completed: false,
            collapsed: false,
            parent_id: None,
            children: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a new child item under a parent
    pub fn new_child(id: ItemId, list_id: ListId, content: String, parent_id: ItemId) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::new(id, list_id, content)
        }
    }

    /// Check if this is a root item (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
