//! Engine error taxonomy
//!
//! `EngineError` covers every expected, recoverable rejection. Structural
//! corruption is reported separately as `InvariantViolation`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::{ItemId, ListId};

/// Common result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Which kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    List,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::List => write!(f, "List"),
            EntityKind::Item => write!(f, "Item"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("Maximum nesting level reached")]
    DepthExceeded,

    #[error("Only top-level tasks can be moved to another list")]
    MoveNotAllowed,

    #[error("Cannot mark this task as complete. {}", unfinished_phrase(.count))]
    Blocked { count: usize, ids: Vec<ItemId> },

    #[error("Content cannot be empty")]
    EmptyContent,

    /// Internal inconsistency; the operation was halted without repair
    #[error("Internal error: {0}")]
    Corrupted(#[from] InvariantViolation),
}

fn unfinished_phrase(count: &usize) -> String {
    if *count == 1 {
        "1 subtask is not finished.".to_string()
    } else {
        format!("{} subtasks are not finished.", count)
    }
}

impl EngineError {
    pub fn list_not_found(id: ListId) -> Self {
        EngineError::NotFound {
            kind: EntityKind::List,
            id: id.0,
        }
    }

    pub fn item_not_found(id: ItemId) -> Self {
        EngineError::NotFound {
            kind: EntityKind::Item,
            id: id.0,
        }
    }

    /// Stable code for transports to map onto their own status representation
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::DepthExceeded => "depth_exceeded",
            EngineError::MoveNotAllowed => "move_not_allowed",
            EngineError::Blocked { .. } => "blocked",
            EngineError::EmptyContent => "empty_content",
            EngineError::Corrupted(_) => "internal",
        }
    }

    /// False only for internal inconsistencies
    pub fn is_user_error(&self) -> bool {
        !matches!(self, EngineError::Corrupted(_))
    }
}

/// A broken structural invariant of a list's forest
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("item {item} is nested deeper than three levels")]
    DepthOverflow { item: ItemId },

    #[error("item {item} belongs to list {found} but is stored in list {expected}")]
    ForeignItem {
        item: ItemId,
        expected: ListId,
        found: ListId,
    },

    #[error("item {item} refers to missing parent {parent}")]
    DanglingParent { item: ItemId, parent: ItemId },

    #[error("item {parent} lists missing child {child}")]
    DanglingChild { parent: ItemId, child: ItemId },

    #[error("item {child} appears {occurrences} times among the children of {parent}")]
    ChildLinkMismatch {
        parent: ItemId,
        child: ItemId,
        occurrences: usize,
    },

    #[error("item {child} is listed under {parent} but points to another parent")]
    WrongParent { parent: ItemId, child: ItemId },

    #[error("root entry {item} is not a root item or is listed more than once")]
    MisplacedRoot { item: ItemId },

    #[error("item {item} is not reachable from any root")]
    Unreachable { item: ItemId },

    #[error("item id {item} is used more than once")]
    DuplicateId { item: ItemId },

    #[error("list id {list} is used more than once")]
    DuplicateList { list: ListId },
}
