//! List Registry
//!
//! Owns every list and dispatches item operations to the engine of the list
//! that owns the item. Single-threaded; see `service` for a concurrent host.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{
    normalize_text, EngineError, EngineResult, IdAllocator, InvariantViolation, ItemId, ListId,
    TodoList,
};
use crate::forest::{move_root, ItemNode, ItemSummary, ListEngine, ListSnapshot, Subtree};

#[derive(Debug, Default)]
pub struct ListRegistry {
    ids: Arc<IdAllocator>,
    lists: BTreeMap<ListId, ListEngine>,
    /// Owning list of every live item
    owners: HashMap<ItemId, ListId>,
}

impl ListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stored list with its nested forest
    pub fn load(
        &mut self,
        list: TodoList,
        items: Vec<ItemNode>,
    ) -> Result<ListId, InvariantViolation> {
        if self.lists.contains_key(&list.id) {
            return Err(InvariantViolation::DuplicateList { list: list.id });
        }
        let engine = ListEngine::load_nested(list, items, self.ids.clone())?;
        let list_id = engine.id();
        let items = engine.item_ids();
        if let Some(taken) = items.iter().find(|item| self.owners.contains_key(*item)) {
            return Err(InvariantViolation::DuplicateId { item: *taken });
        }
        self.owners.extend(items.into_iter().map(|item| (item, list_id)));
        self.lists.insert(list_id, engine);
        Ok(list_id)
    }

    pub fn create_list(&mut self, title: &str) -> EngineResult<TodoList> {
        let title = normalize_text(title)?;
        let list = TodoList::new(self.ids.next_list_id(), title);
        log::info!("Created list {} {:?}", list.id, list.title);
        self.lists
            .insert(list.id, ListEngine::new(list.clone(), self.ids.clone()));
        Ok(list)
    }

    pub fn rename_list(&mut self, list_id: ListId, title: &str) -> EngineResult<TodoList> {
        self.engine_mut(list_id)?.rename(title)
    }

    /// Delete a list and every item it owns; returns the removed item ids
    pub fn delete_list(&mut self, list_id: ListId) -> EngineResult<Vec<ItemId>> {
        let engine = self
            .lists
            .remove(&list_id)
            .ok_or(EngineError::list_not_found(list_id))?;
        let removed = engine.item_ids();
        for item in &removed {
            self.owners.remove(item);
        }
        log::info!("Deleted list {} with {} items", list_id, removed.len());
        Ok(removed)
    }

    /// Lists in creation order
    pub fn list_lists(&self) -> Vec<TodoList> {
        self.lists.values().map(|engine| engine.list().clone()).collect()
    }

    pub fn select_list(&self, list_id: ListId) -> EngineResult<ListSnapshot> {
        self.engine(list_id)?.snapshot()
    }

    pub fn get_item(&self, item_id: ItemId) -> EngineResult<ItemSummary> {
        self.engine(self.owner(item_id)?)?.summary(item_id)
    }

    /// Pre-order walk of an item's subtree within a given list
    pub fn subtree(&self, list_id: ListId, item_id: ItemId) -> EngineResult<Subtree<'_>> {
        self.engine(list_id)?.subtree(item_id)
    }

    pub fn create_item(
        &mut self,
        list_id: ListId,
        content: &str,
        parent_id: Option<ItemId>,
    ) -> EngineResult<ItemSummary> {
        let summary = self.engine_mut(list_id)?.create_item(content, parent_id)?;
        self.owners.insert(summary.id, list_id);
        Ok(summary)
    }

    pub fn update_content(&mut self, item_id: ItemId, content: &str) -> EngineResult<ItemSummary> {
        self.engine_for_item(item_id)?
            .update_content(item_id, content)
    }

    pub fn set_completed(&mut self, item_id: ItemId, completed: bool) -> EngineResult<ItemSummary> {
        self.engine_for_item(item_id)?
            .set_completed(item_id, completed)
    }

    pub fn set_collapsed(&mut self, item_id: ItemId, collapsed: bool) -> EngineResult<ItemSummary> {
        self.engine_for_item(item_id)?
            .set_collapsed(item_id, collapsed)
    }

    /// Delete an item and its subtree; returns the removed ids
    pub fn delete_item(&mut self, item_id: ItemId) -> EngineResult<Vec<ItemId>> {
        let removed = self.engine_for_item(item_id)?.delete_item(item_id)?;
        for item in &removed {
            self.owners.remove(item);
        }
        Ok(removed)
    }

    /// Move a root item (with its subtree) to the end of another list
    ///
    /// Moving to the list that already owns the item is accepted as a no-op.
    pub fn move_item(&mut self, item_id: ItemId, destination: ListId) -> EngineResult<ItemSummary> {
        let source_id = self.owner(item_id)?;
        if !self.lists.contains_key(&destination) {
            return Err(EngineError::list_not_found(destination));
        }

        if source_id == destination {
            let engine = self.engine(source_id)?;
            engine.check_movable(item_id)?;
            return engine.summary(item_id);
        }

        let mut source = self
            .lists
            .remove(&source_id)
            .ok_or(EngineError::list_not_found(source_id))?;
        let result = match self.lists.get_mut(&destination) {
            Some(target) => move_root(&mut source, target, item_id),
            None => Err(EngineError::list_not_found(destination)),
        };
        self.lists.insert(source_id, source);

        let summary = result?;
        let moved: Vec<ItemId> = self
            .engine(destination)?
            .subtree(item_id)?
            .map(|item| item.id)
            .collect();
        for item in moved {
            self.owners.insert(item, destination);
        }
        Ok(summary)
    }

    /// Structural check of every list plus the item ownership table
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for (list_id, engine) in &self.lists {
            engine.validate()?;
            for item in engine.index().items() {
                match self.owners.get(&item.id) {
                    Some(owner) if owner == list_id => {}
                    Some(owner) => {
                        return Err(InvariantViolation::ForeignItem {
                            item: item.id,
                            expected: *owner,
                            found: *list_id,
                        })
                    }
                    None => return Err(InvariantViolation::Unreachable { item: item.id }),
                }
            }
        }

        let stale = self.owners.iter().find(|(item, list_id)| {
            !self
                .lists
                .get(*list_id)
                .is_some_and(|engine| engine.index().contains(**item))
        });
        match stale {
            Some((item, _)) => Err(InvariantViolation::Unreachable { item: *item }),
            None => Ok(()),
        }
    }

    fn owner(&self, item_id: ItemId) -> EngineResult<ListId> {
        self.owners
            .get(&item_id)
            .copied()
            .ok_or(EngineError::item_not_found(item_id))
    }

    fn engine(&self, list_id: ListId) -> EngineResult<&ListEngine> {
        self.lists
            .get(&list_id)
            .ok_or(EngineError::list_not_found(list_id))
    }

    fn engine_mut(&mut self, list_id: ListId) -> EngineResult<&mut ListEngine> {
        self.lists
            .get_mut(&list_id)
            .ok_or(EngineError::list_not_found(list_id))
    }

    fn engine_for_item(&mut self, item_id: ItemId) -> EngineResult<&mut ListEngine> {
        let list_id = self.owner(item_id)?;
        self.engine_mut(list_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, Level};

    struct Fixture {
        registry: ListRegistry,
        work: ListId,
        home: ListId,
        a: ItemId,
        a1: ItemId,
        a1a: ItemId,
    }

    // Work: A ── A1 ── A1a      Home: (empty)
    fn fixture() -> Fixture {
        let mut registry = ListRegistry::new();
        let work = registry.create_list("Work").unwrap().id;
        let home = registry.create_list("Home").unwrap().id;
        let a = registry.create_item(work, "A", None).unwrap().id;
        let a1 = registry.create_item(work, "A1", Some(a)).unwrap().id;
        let a1a = registry.create_item(work, "A1a", Some(a1)).unwrap().id;
        Fixture {
            registry,
            work,
            home,
            a,
            a1,
            a1a,
        }
    }

    #[test]
    fn test_scenario_depth_limit() {
        let mut f = fixture();
        assert_eq!(f.registry.get_item(f.a1a).unwrap().level, Level::Three);
        assert_eq!(
            f.registry.create_item(f.work, "A1a-i", Some(f.a1a)),
            Err(EngineError::DepthExceeded)
        );
        assert_eq!(f.registry.validate(), Ok(()));
    }

    #[test]
    fn test_scenario_completion_gate() {
        let mut f = fixture();
        f.registry.delete_item(f.a1a).unwrap();

        assert!(matches!(
            f.registry.set_completed(f.a, true),
            Err(EngineError::Blocked { count: 1, .. })
        ));
        f.registry.set_completed(f.a1, true).unwrap();
        assert!(f.registry.set_completed(f.a, true).unwrap().completed);
    }

    #[test]
    fn test_scenario_cascade_delete() {
        let mut f = fixture();
        let removed = f.registry.delete_item(f.a).unwrap();
        assert_eq!(removed, vec![f.a, f.a1, f.a1a]);

        for id in [f.a, f.a1, f.a1a] {
            assert_eq!(f.registry.get_item(id), Err(EngineError::item_not_found(id)));
        }
        assert_eq!(f.registry.select_list(f.work).unwrap().item_count(), 0);
        assert_eq!(f.registry.validate(), Ok(()));
    }

    #[test]
    fn test_scenario_move_restriction() {
        let mut f = fixture();
        assert_eq!(
            f.registry.move_item(f.a1, f.home),
            Err(EngineError::MoveNotAllowed)
        );

        let moved = f.registry.move_item(f.a, f.home).unwrap();
        assert_eq!(moved.list_id, f.home);

        let a1 = f.registry.get_item(f.a1).unwrap();
        assert_eq!(a1.list_id, f.home);
        assert_eq!(a1.parent_id, Some(f.a));
        assert_eq!(a1.level, Level::Two);
        assert_eq!(f.registry.get_item(f.a1a).unwrap().level, Level::Three);

        assert_eq!(f.registry.select_list(f.work).unwrap().item_count(), 0);
        assert_eq!(f.registry.select_list(f.home).unwrap().item_count(), 3);
        assert_eq!(f.registry.validate(), Ok(()));
    }

    #[test]
    fn test_scenario_blank_content() {
        let mut f = fixture();
        assert_eq!(
            f.registry.create_item(f.work, "   ", None),
            Err(EngineError::EmptyContent)
        );
        assert_eq!(f.registry.create_list(" \t "), Err(EngineError::EmptyContent));
    }

    #[test]
    fn test_moved_root_lands_last_and_updates_owner() {
        let mut f = fixture();
        let chores = f.registry.create_item(f.home, "Chores", None).unwrap().id;
        f.registry.move_item(f.a, f.home).unwrap();

        let snapshot = f.registry.select_list(f.home).unwrap();
        let roots: Vec<_> = snapshot.items.iter().map(|node| node.id).collect();
        assert_eq!(roots, vec![chores, f.a]);

        // later edits resolve through the new owner
        f.registry.update_content(f.a1, "A1 at home").unwrap();
        let subtree: Vec<_> = f
            .registry
            .subtree(f.home, f.a)
            .unwrap()
            .map(|item| item.content.clone())
            .collect();
        assert_eq!(subtree, vec!["A", "A1 at home", "A1a"]);
    }

    #[test]
    fn test_move_to_missing_list() {
        let mut f = fixture();
        assert_eq!(
            f.registry.move_item(f.a, ListId(404)),
            Err(EngineError::NotFound {
                kind: EntityKind::List,
                id: 404
            })
        );
        assert_eq!(f.registry.get_item(f.a).unwrap().list_id, f.work);
    }

    #[test]
    fn test_move_within_same_list_is_noop() {
        let mut f = fixture();
        let moved = f.registry.move_item(f.a, f.work).unwrap();
        assert_eq!(moved.list_id, f.work);
        assert_eq!(
            f.registry.move_item(f.a1, f.work),
            Err(EngineError::MoveNotAllowed)
        );
    }

    #[test]
    fn test_delete_list_cascades() {
        let mut f = fixture();
        let removed = f.registry.delete_list(f.work).unwrap();
        assert_eq!(removed.len(), 3);
        for id in [f.a, f.a1, f.a1a] {
            assert!(f.registry.get_item(id).is_err());
        }
        assert_eq!(
            f.registry.select_list(f.work),
            Err(EngineError::list_not_found(f.work))
        );
        assert_eq!(f.registry.list_lists().len(), 1);
        assert_eq!(f.registry.validate(), Ok(()));
    }

    #[test]
    fn test_create_item_in_missing_list() {
        let mut f = fixture();
        assert_eq!(
            f.registry.create_item(ListId(99), "x", None),
            Err(EngineError::list_not_found(ListId(99)))
        );
        // parents must live in the target list
        assert_eq!(
            f.registry.create_item(f.home, "x", Some(f.a)),
            Err(EngineError::item_not_found(f.a))
        );
    }

    #[test]
    fn test_list_lists_in_creation_order() {
        let mut f = fixture();
        f.registry.rename_list(f.home, "House").unwrap();
        let titles: Vec<_> = f
            .registry
            .list_lists()
            .into_iter()
            .map(|list| list.title)
            .collect();
        assert_eq!(titles, vec!["Work", "House"]);
    }

    #[test]
    fn test_load_keeps_ids_unique() {
        let f = fixture();
        let snapshot = f.registry.select_list(f.work).unwrap();

        let mut restored = ListRegistry::new();
        restored
            .load(snapshot.list.clone(), snapshot.items.clone())
            .unwrap();
        assert_eq!(restored.select_list(f.work).unwrap(), snapshot);

        let fresh = restored.create_item(f.work, "B", None).unwrap();
        assert!(fresh.id > f.a1a);
        let list = restored.create_list("Later").unwrap();
        assert!(list.id > f.work);

        let mut copy = snapshot.list.clone();
        copy.id = ListId(900);
        assert_eq!(
            restored.load(copy, snapshot.items),
            Err(InvariantViolation::DuplicateId { item: f.a })
        );
    }

    #[test]
    fn test_load_rejects_registered_list_id() {
        let mut f = fixture();
        let other = TodoList::new(f.work, "Other".to_string());

        assert_eq!(
            f.registry.load(other, Vec::new()),
            Err(InvariantViolation::DuplicateList { list: f.work })
        );
        assert_eq!(f.registry.select_list(f.work).unwrap().list.title, "Work");
        assert_eq!(f.registry.get_item(f.a).unwrap().list_id, f.work);
        assert_eq!(f.registry.validate(), Ok(()));
    }
}
