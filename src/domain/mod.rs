//! Domain Layer
//!
//! Contains the entities, identifiers and error taxonomy.
//! This layer has NO behaviour beyond structural checks.

mod entity;
mod error;
mod item;
mod list;
mod validate;

pub use entity::{normalize_text, Entity, IdAllocator, ItemId, ListId};
pub use error::{EngineError, EngineResult, EntityKind, InvariantViolation};
pub use item::{Item, Level};
pub use list::TodoList;
pub use validate::validate;
