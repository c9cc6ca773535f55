//! Repository layer for the `todos` collection.
//!
//! # Responsibility
//! - Define the storage contract the lifecycle core depends on.
//! - Keep SQL details behind that contract.
//!
//! # Invariants
//! - Repository writes validate field content before persistence.
//! - Identity is assigned here, never by callers.

pub mod todo_repo;
