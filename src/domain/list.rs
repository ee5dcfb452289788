//! List domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, ListId};

/// A named container for a forest of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: ListId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for TodoList {
    type Id = ListId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl TodoList {
    pub fn new(id: ListId, title: String) -> Self {
        Self {
            id,
            title,
            created_at: Utc::now(),
        }
    }
}
