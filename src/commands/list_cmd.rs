//! List Commands
//!
//! Handlers for list lifecycle operations.

use crate::domain::{ListId, TodoList};
use crate::forest::ListSnapshot;
use crate::service::{ServiceResult, TodoService};

use super::Removed;

/// All lists in creation order
pub async fn list_lists(service: &TodoService) -> ServiceResult<Vec<TodoList>> {
    Ok(service.list_lists().await)
}

/// A list with its nested forest
pub async fn select_list(service: &TodoService, list_id: ListId) -> ServiceResult<ListSnapshot> {
    service.select_list(list_id).await
}

pub async fn create_list(service: &TodoService, title: String) -> ServiceResult<TodoList> {
    service.create_list(&title).await
}

pub async fn rename_list(
    service: &TodoService,
    list_id: ListId,
    title: String,
) -> ServiceResult<TodoList> {
    service.rename_list(list_id, &title).await
}

/// Delete a list with all of its items
pub async fn delete_list(service: &TodoService, list_id: ListId) -> ServiceResult<Removed> {
    let removed = service.delete_list(list_id).await?;
    Ok(Removed { removed })
}
