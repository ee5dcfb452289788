//! Service Layer
//!
//! Concurrent host for the list engines plus the persistence seam.
//!
//! Each list has its own `RwLock`, so operations on different lists run in
//! parallel while one list only ever has a single writer. A move locks both
//! lists in ascending `ListId` order. Locks are always taken in the order
//! list map, list slots, owner table.
//!
//! A write is checked against the engine first, then sent to the backend, and
//! applied to the engine only after the backend accepted it. The list's write
//! lock is held throughout, so the final apply cannot fail.

mod backend;
mod memory;


pub use backend::{BackendError, BackendResult, TodoBackend};
pub use memory::MemoryBackend;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::domain::{
    normalize_text, EngineError, IdAllocator, InvariantViolation, ItemId, ListId, TodoList,
};
use crate::forest::{move_root, ItemSummary, ListEngine, ListSnapshot};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Stored data is inconsistent: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug)]
struct ListSlot {
    engine: ListEngine,
    /// Set once the list is gone; waiters holding the old `Arc` re-resolve
    deleted: bool,
}

type SlotRef = Arc<RwLock<ListSlot>>;

pub struct TodoService {
    backend: Arc<dyn TodoBackend>,
    ids: Arc<IdAllocator>,
    lists: RwLock<BTreeMap<ListId, SlotRef>>,
    owners: RwLock<HashMap<ItemId, ListId>>,
}

impl TodoService {
    /// Service with no lists on top of `backend`
    pub fn new(backend: Arc<dyn TodoBackend>) -> Self {
        Self {
            backend,
            ids: Arc::new(IdAllocator::new()),
            lists: RwLock::new(BTreeMap::new()),
            owners: RwLock::new(HashMap::new()),
        }
    }

    /// Service populated from everything `backend` currently stores
    pub async fn load(backend: Arc<dyn TodoBackend>) -> ServiceResult<Self> {
        let service = Self::new(backend);
        let lists = service.backend.fetch_lists().await?;
        {
            let mut map = service.lists.write().await;
            let mut owners = service.owners.write().await;
            for list in lists {
                if map.contains_key(&list.id) {
                    return Err(InvariantViolation::DuplicateList { list: list.id }.into());
                }
                let nodes = service.backend.fetch_items(list.id).await?;
                let engine = ListEngine::load_nested(list, nodes, service.ids.clone())?;
                let list_id = engine.id();
                for item in engine.item_ids() {
                    if owners.insert(item, list_id).is_some() {
                        return Err(InvariantViolation::DuplicateId { item }.into());
                    }
                }
                map.insert(list_id, Self::slot_for(engine));
            }
            log::info!("Loaded {} lists with {} items", map.len(), owners.len());
        }
        Ok(service)
    }

    /// Lists in creation order
    pub async fn list_lists(&self) -> Vec<TodoList> {
        let map = self.lists.read().await;
        let mut lists = Vec::with_capacity(map.len());
        for slot in map.values() {
            let slot = slot.read().await;
            if !slot.deleted {
                lists.push(slot.engine.list().clone());
            }
        }
        lists
    }

    pub async fn select_list(&self, list_id: ListId) -> ServiceResult<ListSnapshot> {
        let slot = self.read_list(list_id).await?;
        Ok(slot.engine.snapshot()?)
    }

    pub async fn get_item(&self, item_id: ItemId) -> ServiceResult<ItemSummary> {
        let slot = self.read_owner(item_id).await?;
        Ok(slot.engine.summary(item_id)?)
    }

    pub async fn create_list(&self, title: &str) -> ServiceResult<TodoList> {
        let title = normalize_text(title)?;
        let mut map = self.lists.write().await;
        let list = TodoList::new(self.ids.next_list_id(), title);
        self.backend
            .create_list(&list)
            .await
            .map_err(|e| rejected("create list", e))?;
        map.insert(
            list.id,
            Self::slot_for(ListEngine::new(list.clone(), self.ids.clone())),
        );
        log::info!("Created list {} {:?}", list.id, list.title);
        Ok(list)
    }

    pub async fn rename_list(&self, list_id: ListId, title: &str) -> ServiceResult<TodoList> {
        let mut slot = self.write_list(list_id).await?;
        let mut list = slot.engine.list().clone();
        list.title = normalize_text(title)?;
        self.backend
            .rename_list(&list)
            .await
            .map_err(|e| rejected("rename list", e))?;
        Ok(slot.engine.rename(&list.title)?)
    }

    /// Delete a list and every item it owns; returns the removed item ids
    pub async fn delete_list(&self, list_id: ListId) -> ServiceResult<Vec<ItemId>> {
        let mut map = self.lists.write().await;
        let slot = map
            .get(&list_id)
            .cloned()
            .ok_or(EngineError::list_not_found(list_id))?;
        let mut slot = slot.write_owned().await;
        self.backend
            .delete_list(list_id)
            .await
            .map_err(|e| rejected("delete list", e))?;

        map.remove(&list_id);
        slot.deleted = true;
        let removed = slot.engine.item_ids();
        let mut owners = self.owners.write().await;
        for item in &removed {
            owners.remove(item);
        }
        log::info!("Deleted list {} with {} items", list_id, removed.len());
        Ok(removed)
    }

    pub async fn create_item(
        &self,
        list_id: ListId,
        content: &str,
        parent_id: Option<ItemId>,
    ) -> ServiceResult<ItemSummary> {
        let mut slot = self.write_list(list_id).await?;
        let summary = slot.engine.plan_item(content, parent_id)?;
        self.backend
            .create_item(&summary)
            .await
            .map_err(|e| rejected("create item", e))?;
        slot.engine.insert_item(&summary)?;
        self.owners.write().await.insert(summary.id, list_id);
        Ok(summary)
    }

    pub async fn update_content(&self, item_id: ItemId, content: &str) -> ServiceResult<ItemSummary> {
        let mut slot = self.write_owner(item_id).await?;
        slot.engine.get(item_id)?;
        let content = normalize_text(content)?;
        self.backend
            .update_content(item_id, &content)
            .await
            .map_err(|e| rejected("update item", e))?;
        Ok(slot.engine.update_content(item_id, &content)?)
    }

    pub async fn set_completed(&self, item_id: ItemId, completed: bool) -> ServiceResult<ItemSummary> {
        let mut slot = self.write_owner(item_id).await?;
        slot.engine.check_completed(item_id, completed)?;
        self.backend
            .set_completed(item_id, completed)
            .await
            .map_err(|e| rejected("complete item", e))?;
        Ok(slot.engine.set_completed(item_id, completed)?)
    }

    pub async fn set_collapsed(&self, item_id: ItemId, collapsed: bool) -> ServiceResult<ItemSummary> {
        let mut slot = self.write_owner(item_id).await?;
        slot.engine.get(item_id)?;
        self.backend
            .set_collapsed(item_id, collapsed)
            .await
            .map_err(|e| rejected("collapse item", e))?;
        Ok(slot.engine.set_collapsed(item_id, collapsed)?)
    }

    /// Delete an item and its subtree; returns the removed ids
    pub async fn delete_item(&self, item_id: ItemId) -> ServiceResult<Vec<ItemId>> {
        let mut slot = self.write_owner(item_id).await?;
        slot.engine.get(item_id)?;
        self.backend
            .delete_item(item_id)
            .await
            .map_err(|e| rejected("delete item", e))?;
        let removed = slot.engine.delete_item(item_id)?;
        let mut owners = self.owners.write().await;
        for item in &removed {
            owners.remove(item);
        }
        Ok(removed)
    }

    /// Move a root item (with its subtree) to the end of another list
    ///
    /// Moving to the list that already owns the item is accepted as a no-op.
    pub async fn move_item(&self, item_id: ItemId, destination: ListId) -> ServiceResult<ItemSummary> {
        loop {
            let source_id = self.owner(item_id).await?;
            let (source_slot, target_slot) = {
                let map = self.lists.read().await;
                let source = map
                    .get(&source_id)
                    .cloned()
                    .ok_or(EngineError::item_not_found(item_id))?;
                let target = map
                    .get(&destination)
                    .cloned()
                    .ok_or(EngineError::list_not_found(destination))?;
                (source, target)
            };

            if source_id == destination {
                let slot = source_slot.read_owned().await;
                if !holds(&slot, item_id) {
                    self.check_stale(item_id, source_id).await?;
                    continue;
                }
                slot.engine.check_movable(item_id)?;
                return Ok(slot.engine.summary(item_id)?);
            }

            let (mut source, mut target) = if source_id < destination {
                let source = source_slot.write_owned().await;
                (source, target_slot.write_owned().await)
            } else {
                let target = target_slot.write_owned().await;
                (source_slot.write_owned().await, target)
            };
            if target.deleted {
                return Err(EngineError::list_not_found(destination).into());
            }
            if !holds(&source, item_id) {
                self.check_stale(item_id, source_id).await?;
                continue;
            }

            source.engine.check_movable(item_id)?;
            self.backend
                .move_item(item_id, destination)
                .await
                .map_err(|e| rejected("move item", e))?;
            let summary = move_root(&mut source.engine, &mut target.engine, item_id)?;

            let moved: Vec<ItemId> = target
                .engine
                .subtree(item_id)?
                .map(|item| item.id)
                .collect();
            let mut owners = self.owners.write().await;
            for item in moved {
                owners.insert(item, destination);
            }
            return Ok(summary);
        }
    }

    /// Structural check of every list plus the item ownership table
    pub async fn validate(&self) -> Result<(), InvariantViolation> {
        let map = self.lists.read().await;
        let mut guards = Vec::with_capacity(map.len());
        for slot in map.values() {
            guards.push(slot.read().await);
        }
        let owners = self.owners.read().await;
        for slot in &guards {
            let list_id = slot.engine.id();
            slot.engine.validate()?;
            for item in slot.engine.index().items() {
                match owners.get(&item.id) {
                    Some(owner) if *owner == list_id => {}
                    Some(owner) => {
                        return Err(InvariantViolation::ForeignItem {
                            item: item.id,
                            expected: *owner,
                            found: list_id,
                        })
                    }
                    None => return Err(InvariantViolation::Unreachable { item: item.id }),
                }
            }
        }

        let stale = owners.iter().find(|(item, list_id)| {
            !guards.iter().any(|slot| {
                slot.engine.id() == **list_id && slot.engine.index().contains(**item)
            })
        });
        match stale {
            Some((item, _)) => Err(InvariantViolation::Unreachable { item: *item }),
            None => Ok(()),
        }
    }

    fn slot_for(engine: ListEngine) -> SlotRef {
        Arc::new(RwLock::new(ListSlot {
            engine,
            deleted: false,
        }))
    }

    async fn owner(&self, item_id: ItemId) -> ServiceResult<ListId> {
        self.owners
            .read()
            .await
            .get(&item_id)
            .copied()
            .ok_or(EngineError::item_not_found(item_id).into())
    }

    /// Called while holding the lock of `list_id` after `item_id` was not
    /// found there; succeeds only if the item now lives in another list.
    async fn check_stale(&self, item_id: ItemId, list_id: ListId) -> ServiceResult<()> {
        match self.owner(item_id).await {
            Ok(owner) if owner != list_id => Ok(()),
            _ => Err(EngineError::item_not_found(item_id).into()),
        }
    }

    async fn slot(&self, list_id: ListId) -> ServiceResult<SlotRef> {
        self.lists
            .read()
            .await
            .get(&list_id)
            .cloned()
            .ok_or(EngineError::list_not_found(list_id).into())
    }

    async fn read_list(&self, list_id: ListId) -> ServiceResult<OwnedRwLockReadGuard<ListSlot>> {
        let slot = self.slot(list_id).await?.read_owned().await;
        if slot.deleted {
            return Err(EngineError::list_not_found(list_id).into());
        }
        Ok(slot)
    }

    async fn write_list(&self, list_id: ListId) -> ServiceResult<OwnedRwLockWriteGuard<ListSlot>> {
        let slot = self.slot(list_id).await?.write_owned().await;
        if slot.deleted {
            return Err(EngineError::list_not_found(list_id).into());
        }
        Ok(slot)
    }

    /// Read lock on the list that owns `item_id`, following concurrent moves
    async fn read_owner(&self, item_id: ItemId) -> ServiceResult<OwnedRwLockReadGuard<ListSlot>> {
        loop {
            let list_id = self.owner(item_id).await?;
            let slot = self.slot(list_id).await.map_err(|_| EngineError::item_not_found(item_id))?;
            let slot = slot.read_owned().await;
            if holds(&slot, item_id) {
                return Ok(slot);
            }
            self.check_stale(item_id, list_id).await?;
        }
    }

    /// Write lock on the list that owns `item_id`, following concurrent moves
    async fn write_owner(&self, item_id: ItemId) -> ServiceResult<OwnedRwLockWriteGuard<ListSlot>> {
        loop {
            let list_id = self.owner(item_id).await?;
            let slot = self.slot(list_id).await.map_err(|_| EngineError::item_not_found(item_id))?;
            let slot = slot.write_owned().await;
            if holds(&slot, item_id) {
                return Ok(slot);
            }
            self.check_stale(item_id, list_id).await?;
        }
    }
}

fn rejected(operation: &str, error: BackendError) -> ServiceError {
    log::warn!("Backend refused to {}, local state kept: {}", operation, error);
    ServiceError::Backend(error)
}

fn holds(slot: &ListSlot, item_id: ItemId) -> bool {
    !slot.deleted && slot.engine.index().contains(item_id)
}
