//! Domain model for the to-do list.
//!
//! # Responsibility
//! - Define the item record persisted by core and shown by callers.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Deletion is a hard delete; retired ids are tracked by storage.

pub mod item;
