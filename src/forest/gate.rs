//! Completion Gate
//!
//! An item may be marked complete only when all of its direct children are
//! complete. Grandchildren are not consulted, and un-completing is never gated.

use crate::domain::{EngineError, EngineResult, Item, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Blocked { count: usize, ids: Vec<ItemId> },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }

    pub fn into_result(self) -> EngineResult<()> {
        match self {
            GateDecision::Allowed => Ok(()),
            GateDecision::Blocked { count, ids } => Err(EngineError::Blocked { count, ids }),
        }
    }
}

/// Decide whether `item` may transition to completed
pub fn can_complete<'a>(
    item: &Item,
    direct_children: impl IntoIterator<Item = &'a Item>,
) -> GateDecision {
    let ids: Vec<ItemId> = direct_children
        .into_iter()
        .filter(|child| !child.completed)
        .map(|child| child.id)
        .collect();

    if ids.is_empty() {
        GateDecision::Allowed
    } else {
        log::trace!("completion of item {} blocked by {:?}", item.id, ids);
        GateDecision::Blocked {
            count: ids.len(),
            ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListId;

    fn task(id: u64, completed: bool) -> Item {
        let mut item = Item::new(ItemId(id), ListId(1), format!("Task {}", id));
        item.completed = completed;
        item
    }

    #[test]
    fn test_leaf_can_always_complete() {
        assert_eq!(can_complete(&task(1, false), []), GateDecision::Allowed);
    }

    #[test]
    fn test_all_children_complete() {
        let children = [task(2, true), task(3, true)];
        assert!(can_complete(&task(1, false), &children).is_allowed());
    }

    #[test]
    fn test_blocked_lists_incomplete_children() {
        let children = [task(2, true), task(3, false), task(4, false)];
        assert_eq!(
            can_complete(&task(1, false), &children),
            GateDecision::Blocked {
                count: 2,
                ids: vec![ItemId(3), ItemId(4)]
            }
        );
    }

    #[test]
    fn test_into_result() {
        let blocked = can_complete(&task(1, false), &[task(2, false)]).into_result();
        assert_eq!(
            blocked,
            Err(EngineError::Blocked {
                count: 1,
                ids: vec![ItemId(2)]
            })
        );
    }
}
