//! In-memory backend
//!
//! Keeps flat rows the way a relational store would and nests them on fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::backend::{BackendError, BackendResult, TodoBackend};
use crate::domain::{Entity, Item, ItemId, ListId, TodoList};
use crate::forest::{build_forest, ItemNode, ItemSummary, TreeIndex};

#[derive(Debug, Clone)]
struct StoredItem {
    id: ItemId,
    list_id: ListId,
    parent_id: Option<ItemId>,
    content: String,
    completed: bool,
    collapsed: bool,
    created_at: DateTime<Utc>,
}

impl Entity for StoredItem {
    type Id = ItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl StoredItem {
    fn to_record(&self) -> Item {
        Item {
            id: self.id,
            list_id: self.list_id,
            content: self.content.clone(),
            completed: self.completed,
            collapsed: self.collapsed,
            parent_id: self.parent_id,
            children: Vec::new(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    lists: Vec<TodoList>,
    items: Vec<StoredItem>,
}

impl MemoryState {
    /// Ids of `id` and all rows below it
    fn subtree_ids(&self, id: ItemId) -> Vec<ItemId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            found.push(current);
            stack.extend(
                self.items
                    .iter()
                    .filter(|row| row.parent_id == Some(current))
                    .map(|row| row.id),
            );
        }
        found
    }
}

fn find_mut<E: Entity>(rows: &mut [E], id: E::Id) -> Option<&mut E> {
    rows.iter_mut().find(|row| row.id() == id)
}

fn exists<E: Entity>(rows: &[E], id: E::Id) -> bool {
    rows.iter().any(|row| row.id() == id)
}

fn missing_item(id: ItemId) -> BackendError {
    BackendError::Rejected(format!("Item {} not found", id))
}

fn missing_list(id: ListId) -> BackendError {
    BackendError::Rejected(format!("List {} not found", id))
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn list_count(&self) -> usize {
        self.state.lock().await.lists.len()
    }
}

#[async_trait]
impl TodoBackend for MemoryBackend {
    async fn fetch_lists(&self) -> BackendResult<Vec<TodoList>> {
        Ok(self.state.lock().await.lists.clone())
    }

    async fn fetch_items(&self, list_id: ListId) -> BackendResult<Vec<ItemNode>> {
        let state = self.state.lock().await;
        if !exists(&state.lists, list_id) {
            return Err(missing_list(list_id));
        }
        let records: Vec<Item> = state
            .items
            .iter()
            .filter(|row| row.list_id == list_id)
            .map(StoredItem::to_record)
            .collect();
        let index = TreeIndex::load(list_id, records)
            .map_err(|e| BackendError::Rejected(e.to_string()))?;
        build_forest(&index).map_err(|e| BackendError::Rejected(e.to_string()))
    }

    async fn create_list(&self, list: &TodoList) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        if exists(&state.lists, list.id) {
            return Err(BackendError::Rejected(format!("List {} already exists", list.id)));
        }
        state.lists.push(list.clone());
        Ok(())
    }

    async fn rename_list(&self, list: &TodoList) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        let stored = find_mut(&mut state.lists, list.id).ok_or(missing_list(list.id))?;
        stored.title = list.title.clone();
        Ok(())
    }

    async fn delete_list(&self, list_id: ListId) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        if !exists(&state.lists, list_id) {
            return Err(missing_list(list_id));
        }
        state.items.retain(|row| row.list_id != list_id);
        state.lists.retain(|list| list.id != list_id);
        Ok(())
    }

    async fn create_item(&self, item: &ItemSummary) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        if !exists(&state.lists, item.list_id) {
            return Err(missing_list(item.list_id));
        }
        if exists(&state.items, item.id) {
            return Err(BackendError::Rejected(format!("Item {} already exists", item.id)));
        }
        if let Some(parent_id) = item.parent_id {
            if !exists(&state.items, parent_id) {
                return Err(missing_item(parent_id));
            }
        }
        state.items.push(StoredItem {
            id: item.id,
            list_id: item.list_id,
            parent_id: item.parent_id,
            content: item.content.clone(),
            completed: item.completed,
            collapsed: item.collapsed,
            created_at: item.created_at,
        });
        Ok(())
    }

    async fn update_content(&self, id: ItemId, content: &str) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        find_mut(&mut state.items, id).ok_or(missing_item(id))?.content = content.to_string();
        Ok(())
    }

    async fn set_completed(&self, id: ItemId, completed: bool) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        find_mut(&mut state.items, id).ok_or(missing_item(id))?.completed = completed;
        Ok(())
    }

    async fn set_collapsed(&self, id: ItemId, collapsed: bool) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        find_mut(&mut state.items, id).ok_or(missing_item(id))?.collapsed = collapsed;
        Ok(())
    }

    async fn delete_item(&self, id: ItemId) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        if !exists(&state.items, id) {
            return Err(missing_item(id));
        }
        let doomed = state.subtree_ids(id);
        state.items.retain(|row| !doomed.contains(&row.id));
        Ok(())
    }

    async fn move_item(&self, id: ItemId, list_id: ListId) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        if !exists(&state.lists, list_id) {
            return Err(missing_list(list_id));
        }
        if !exists(&state.items, id) {
            return Err(missing_item(id));
        }
        let moved = state.subtree_ids(id);
        // moved rows go last so the root lands after the destination's roots
        let (mut travelling, staying): (Vec<_>, Vec<_>) = std::mem::take(&mut state.items)
            .into_iter()
            .partition(|row| moved.contains(&row.id));
        for row in &mut travelling {
            row.list_id = list_id;
        }
        state.items = staying;
        state.items.append(&mut travelling);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Level;

    fn summary(id: u64, list: u64, parent: Option<u64>, level: Level) -> ItemSummary {
        let mut item = Item::new(ItemId(id), ListId(list), format!("Item {}", id));
        item.parent_id = parent.map(ItemId);
        ItemSummary::new(&item, level)
    }

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.create_list(&TodoList::new(ListId(1), "Work".into())).await.unwrap();
        backend.create_list(&TodoList::new(ListId(2), "Home".into())).await.unwrap();
        backend.create_item(&summary(1, 1, None, Level::One)).await.unwrap();
        backend.create_item(&summary(2, 1, Some(1), Level::Two)).await.unwrap();
        backend.create_item(&summary(3, 1, Some(2), Level::Three)).await.unwrap();
        backend.create_item(&summary(4, 1, None, Level::One)).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_fetch_items_nests_rows() {
        let backend = seeded().await;
        let forest = backend.fetch_items(ListId(1)).await.unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children[0].children[0].id, ItemId(3));
        assert_eq!(forest[0].children[0].children[0].level, Level::Three);
        assert!(backend.fetch_items(ListId(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_item_removes_subtree_rows() {
        let backend = seeded().await;
        backend.delete_item(ItemId(1)).await.unwrap();
        assert_eq!(backend.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_move_item_reassigns_subtree_rows() {
        let backend = seeded().await;
        backend.move_item(ItemId(1), ListId(2)).await.unwrap();
        let home = backend.fetch_items(ListId(2)).await.unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].children[0].children.len(), 1);
        assert_eq!(backend.fetch_items(ListId(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_list_drops_its_rows() {
        let backend = seeded().await;
        backend.delete_list(ListId(1)).await.unwrap();
        assert_eq!(backend.item_count().await, 0);
        assert_eq!(backend.list_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_targets() {
        let backend = seeded().await;
        assert!(backend.set_completed(ItemId(99), true).await.is_err());
        assert!(backend.move_item(ItemId(1), ListId(9)).await.is_err());
        assert!(backend.create_item(&summary(5, 1, Some(42), Level::Two)).await.is_err());
    }
}
