//! Forest Snapshots
//!
//! Immutable views handed to callers: flat item summaries and the nested
//! forest of a list. Conversions in both directions are iterative.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::index::TreeIndex;
use crate::domain::{
    EngineError, EngineResult, InvariantViolation, Item, ItemId, Level, ListId, TodoList,
};

/// Flat view of one item, as returned by mutations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub list_id: ListId,
    pub parent_id: Option<ItemId>,
    pub content: String,
    pub completed: bool,
    pub collapsed: bool,
    pub level: Level,
    pub created_at: DateTime<Utc>,
}

impl ItemSummary {
    pub fn new(item: &Item, level: Level) -> Self {
        Self {
            id: item.id,
            list_id: item.list_id,
            parent_id: item.parent_id,
            content: item.content.clone(),
            completed: item.completed,
            collapsed: item.collapsed,
            level,
            created_at: item.created_at,
        }
    }
}

/// An item with its children already nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemNode {
    pub id: ItemId,
    pub content: String,
    pub completed: bool,
    pub collapsed: bool,
    pub level: Level,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub children: Vec<ItemNode>,
}

/// A list together with its nested forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub list: TodoList,
    pub items: Vec<ItemNode>,
}

impl ListSnapshot {
    /// Number of items at every depth
    pub fn item_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&ItemNode> = self.items.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Find a node anywhere in the forest
    pub fn find(&self, id: ItemId) -> Option<&ItemNode> {
        let mut stack: Vec<&ItemNode> = self.items.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}

/// Nest every item of the index under its parent
///
/// Children are assembled before their parent by walking the pre-order
/// sequence backwards.
pub fn build_forest(index: &TreeIndex) -> EngineResult<Vec<ItemNode>> {
    let order: Vec<&Item> = index.preorder().collect();
    let mut built: HashMap<ItemId, ItemNode> = HashMap::with_capacity(order.len());

    for item in order.into_iter().rev() {
        let level = index.level(item.id)?;
        let children = item
            .children
            .iter()
            .map(|child| take_built(&mut built, item.id, *child))
            .collect::<Result<Vec<_>, _>>()?;
        built.insert(
            item.id,
            ItemNode {
                id: item.id,
                content: item.content.clone(),
                completed: item.completed,
                collapsed: item.collapsed,
                level,
                created_at: item.created_at,
                children,
            },
        );
    }

    index
        .roots()
        .iter()
        .map(|root| take_built(&mut built, *root, *root).map_err(EngineError::from))
        .collect()
}

fn take_built(
    built: &mut HashMap<ItemId, ItemNode>,
    parent: ItemId,
    child: ItemId,
) -> Result<ItemNode, InvariantViolation> {
    built
        .remove(&child)
        .ok_or(InvariantViolation::DanglingChild { parent, child })
}

/// Flatten a nested forest into records in pre-order
///
/// Stored levels are ignored; the index derives them from the parent links.
pub fn flatten_forest(list_id: ListId, nodes: Vec<ItemNode>) -> Vec<Item> {
    let mut records = Vec::new();
    let mut stack: Vec<(ItemNode, Option<ItemId>)> =
        nodes.into_iter().rev().map(|node| (node, None)).collect();

    while let Some((node, parent_id)) = stack.pop() {
        let ItemNode {
            id,
            content,
            completed,
            collapsed,
            created_at,
            children,
            ..
        } = node;
        stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        records.push(Item {
            id,
            list_id,
            content,
            completed,
            collapsed,
            parent_id,
            children: Vec::new(),
            created_at,
        });
    }
    records
}
