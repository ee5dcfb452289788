//! Persistence Seam
//!
//! Request/response contract of the external store. Implementations can be a
//! remote API, a database, or the in-memory `MemoryBackend`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ItemId, ListId, TodoList};
use crate::forest::{ItemNode, ItemSummary};

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend rejected request: {0}")]
    Rejected(String),
}

/// Storage operations mirrored by every engine mutation
///
/// All operations are async to support various backends.
#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn fetch_lists(&self) -> BackendResult<Vec<TodoList>>;

    /// Items of a list, already nested
    async fn fetch_items(&self, list_id: ListId) -> BackendResult<Vec<ItemNode>>;

    async fn create_list(&self, list: &TodoList) -> BackendResult<()>;

    async fn rename_list(&self, list: &TodoList) -> BackendResult<()>;

    /// Delete a list and all of its items
    async fn delete_list(&self, list_id: ListId) -> BackendResult<()>;

    async fn create_item(&self, item: &ItemSummary) -> BackendResult<()>;

    async fn update_content(&self, id: ItemId, content: &str) -> BackendResult<()>;

    async fn set_completed(&self, id: ItemId, completed: bool) -> BackendResult<()>;

    async fn set_collapsed(&self, id: ItemId, collapsed: bool) -> BackendResult<()>;

    /// Delete an item and its subtree
    async fn delete_item(&self, id: ItemId) -> BackendResult<()>;

    /// Reassign a root item (and its subtree) to another list
    async fn move_item(&self, id: ItemId, list_id: ListId) -> BackendResult<()>;
}
