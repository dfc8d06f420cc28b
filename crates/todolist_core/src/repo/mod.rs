//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable storage contract for items.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Repository writes validate item names before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to DB transport errors.

pub mod item_repo;
