//! Item Commands
//!
//! Handlers for item CRUD, completion, hierarchy and moves.

use crate::domain::{ItemId, ListId};
use crate::forest::ItemSummary;
use crate::service::{ServiceResult, TodoService};

use super::Removed;

pub async fn get_item(service: &TodoService, id: ItemId) -> ServiceResult<ItemSummary> {
    service.get_item(id).await
}

/// Create an item at the end of a list's roots or of a parent's children
pub async fn create_item(
    service: &TodoService,
    list_id: ListId,
    content: String,
    parent_id: Option<ItemId>,
) -> ServiceResult<ItemSummary> {
    service.create_item(list_id, &content, parent_id).await
}

pub async fn update_item(
    service: &TodoService,
    id: ItemId,
    content: String,
) -> ServiceResult<ItemSummary> {
    service.update_content(id, &content).await
}

/// Mark complete (gated on direct children) or incomplete
pub async fn set_completed(
    service: &TodoService,
    id: ItemId,
    completed: bool,
) -> ServiceResult<ItemSummary> {
    service.set_completed(id, completed).await
}

pub async fn set_collapsed(
    service: &TodoService,
    id: ItemId,
    collapsed: bool,
) -> ServiceResult<ItemSummary> {
    service.set_collapsed(id, collapsed).await
}

/// Delete an item with its subtree
pub async fn delete_item(service: &TodoService, id: ItemId) -> ServiceResult<Removed> {
    let removed = service.delete_item(id).await?;
    Ok(Removed { removed })
}

/// Move a top-level item to another list
pub async fn move_item(
    service: &TodoService,
    id: ItemId,
    list_id: ListId,
) -> ServiceResult<ItemSummary> {
    service.move_item(id, list_id).await
}
