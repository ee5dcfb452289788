//! Commands Layer
//!
//! JSON command envelope that bridges a transport to the service. Every
//! request carries an `op` tag; every reply is a `Response` with either
//! `data` or an `error` holding a stable code.

mod item_cmd;
mod list_cmd;

pub use item_cmd::*;
pub use list_cmd::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{EngineError, ItemId, ListId};
use crate::service::{ServiceError, ServiceResult, TodoService};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    ListLists,
    SelectList {
        #[serde(rename = "listId")]
        list_id: ListId,
    },
    CreateList {
        title: String,
    },
    RenameList {
        #[serde(rename = "listId")]
        list_id: ListId,
        title: String,
    },
    DeleteList {
        #[serde(rename = "listId")]
        list_id: ListId,
    },
    GetItem {
        id: ItemId,
    },
    CreateItem {
        #[serde(rename = "listId")]
        list_id: ListId,
        content: String,
        #[serde(rename = "parentId", default)]
        parent_id: Option<ItemId>,
    },
    UpdateItem {
        id: ItemId,
        content: String,
    },
    SetCompleted {
        id: ItemId,
        completed: bool,
    },
    SetCollapsed {
        id: ItemId,
        collapsed: bool,
    },
    DeleteItem {
        id: ItemId,
    },
    MoveItem {
        id: ItemId,
        #[serde(rename = "listId")]
        list_id: ListId,
    },
}

/// Ids removed by a cascading delete, in pre-order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removed {
    pub removed: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Unfinished direct children, only for `blocked`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            count: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<&ServiceError> for ErrorBody {
    fn from(error: &ServiceError) -> Self {
        match error {
            ServiceError::Engine(engine) => {
                let mut body = ErrorBody::new(engine.code(), engine.to_string());
                if let EngineError::Blocked { count, .. } = engine {
                    body.count = Some(*count);
                }
                body
            }
            ServiceError::Invariant(_) => ErrorBody::new("internal", error.to_string()),
            ServiceError::Backend(_) => ErrorBody::new("backend", error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

fn respond<T: Serialize>(result: ServiceResult<T>) -> Response {
    match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(value) => Response::success(value),
            Err(e) => Response::failure(ErrorBody::new("internal", e.to_string())),
        },
        Err(error) => {
            if !matches!(&error, ServiceError::Engine(e) if e.is_user_error()) {
                log::error!("Command failed: {}", error);
            }
            Response::failure(ErrorBody::from(&error))
        }
    }
}

/// Run one command against the service
pub async fn execute(service: &TodoService, command: Command) -> Response {
    log::trace!("Executing {:?}", command);
    match command {
        Command::ListLists => respond(list_lists(service).await),
        Command::SelectList { list_id } => respond(select_list(service, list_id).await),
        Command::CreateList { title } => respond(create_list(service, title).await),
        Command::RenameList { list_id, title } => {
            respond(rename_list(service, list_id, title).await)
        }
        Command::DeleteList { list_id } => respond(delete_list(service, list_id).await),
        Command::GetItem { id } => respond(get_item(service, id).await),
        Command::CreateItem {
            list_id,
            content,
            parent_id,
        } => respond(create_item(service, list_id, content, parent_id).await),
        Command::UpdateItem { id, content } => respond(update_item(service, id, content).await),
        Command::SetCompleted { id, completed } => {
            respond(set_completed(service, id, completed).await)
        }
        Command::SetCollapsed { id, collapsed } => {
            respond(set_collapsed(service, id, collapsed).await)
        }
        Command::DeleteItem { id } => respond(delete_item(service, id).await),
        Command::MoveItem { id, list_id } => respond(move_item(service, id, list_id).await),
    }
}

/// Parse one JSON request and run it; malformed input becomes `bad_request`
pub async fn execute_json(service: &TodoService, line: &str) -> Response {
    match serde_json::from_str::<Command>(line) {
        Ok(command) => execute(service, command).await,
        Err(e) => Response::failure(ErrorBody::bad_request(e.to_string())),
    }
}
