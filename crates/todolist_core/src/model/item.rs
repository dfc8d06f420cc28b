//! To-do item domain model.
//!
//! # Responsibility
//! - Define the canonical record persisted by the item store.
//! - Own name validation shared by the repository and store layers.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `name` is never empty. Whitespace is a legitimate name.
//! - `created_at` never changes after creation.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one to-do item.
pub type ItemId = Uuid;

/// Validation failures for item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Name has no characters.
    EmptyName,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "item name must not be empty"),
        }
    }
}

impl Error for ItemValidationError {}

/// Durable to-do item.
///
/// Fields are private: records are only produced by the store (on create)
/// and the repository (when reading rows back), never by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    id: ItemId,
    name: String,
    /// Unix epoch milliseconds.
    created_at: i64,
}

impl ItemRecord {
    /// Builds a record after validating `name`.
    pub(crate) fn new(
        id: ItemId,
        name: impl Into<String>,
        created_at: i64,
    ) -> Result<Self, ItemValidationError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            id,
            name,
            created_at,
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time in Unix epoch milliseconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Ordering key used by every listing: `created_at ASC, id ASC`.
    pub fn sort_key(&self) -> (i64, ItemId) {
        (self.created_at, self.id)
    }
}

/// Checks that an item name is usable.
///
/// # Errors
/// - `EmptyName` when `name` has no characters.
pub fn validate_name(name: &str) -> Result<(), ItemValidationError> {
    if name.is_empty() {
        return Err(ItemValidationError::EmptyName);
    }
    Ok(())
}
