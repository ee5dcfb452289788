//! Structural validation of a list's forest
//!
//! Mutations are built to preserve these invariants, so this is run on load
//! and by tests rather than after every write.

use std::collections::{HashMap, HashSet, VecDeque};

use super::entity::{ItemId, ListId};
use super::error::InvariantViolation;
use super::item::{Item, Level};

/// Check depth, ownership and parent/child link consistency of one list
pub fn validate(
    list_id: ListId,
    roots: &[ItemId],
    items: &HashMap<ItemId, Item>,
) -> Result<(), InvariantViolation> {
    let mut root_set = HashSet::with_capacity(roots.len());
    for &root in roots {
        let is_root = items.get(&root).is_some_and(Item::is_root);
        if !is_root || !root_set.insert(root) {
            return Err(InvariantViolation::MisplacedRoot { item: root });
        }
    }

    for item in items.values() {
        if item.list_id != list_id {
            return Err(InvariantViolation::ForeignItem {
                item: item.id,
                expected: list_id,
                found: item.list_id,
            });
        }

        match item.parent_id {
            Some(parent_id) => {
                let parent = items.get(&parent_id).ok_or(InvariantViolation::DanglingParent {
                    item: item.id,
                    parent: parent_id,
                })?;
                let occurrences = parent.children.iter().filter(|&&c| c == item.id).count();
                if occurrences != 1 {
                    return Err(InvariantViolation::ChildLinkMismatch {
                        parent: parent_id,
                        child: item.id,
                        occurrences,
                    });
                }
            }
            None if !root_set.contains(&item.id) => {
                return Err(InvariantViolation::Unreachable { item: item.id });
            }
            None => {}
        }

        for &child_id in &item.children {
            let child = items.get(&child_id).ok_or(InvariantViolation::DanglingChild {
                parent: item.id,
                child: child_id,
            })?;
            if child.parent_id != Some(item.id) {
                return Err(InvariantViolation::WrongParent {
                    parent: item.id,
                    child: child_id,
                });
            }
        }
    }

    // Breadth-first from the roots: every item must be reached exactly once within depth 3
    let mut visited = HashSet::with_capacity(items.len());
    let mut queue: VecDeque<(ItemId, usize)> = roots.iter().map(|&id| (id, 0)).collect();
    while let Some((id, depth)) = queue.pop_front() {
        if Level::from_depth(depth).is_none() {
            return Err(InvariantViolation::DepthOverflow { item: id });
        }
        if !visited.insert(id) {
            return Err(InvariantViolation::DuplicateId { item: id });
        }
        if let Some(item) = items.get(&id) {
            queue.extend(item.children.iter().map(|&child| (child, depth + 1)));
        }
    }

    if let Some(orphan) = items.keys().find(|id| !visited.contains(id)) {
        return Err(InvariantViolation::Unreachable { item: *orphan });
    }

    Ok(())
}
