//! Domain model for the `todos` collection.
//!
//! # Responsibility
//! - Define the canonical todo record and its write-side shapes.
//! - Own field-level validation shared by services and adapters.
//!
//! # Invariants
//! - Every todo is identified by a repository-assigned `TodoId`.
//! - `created_at <= updated_at` for every persisted todo.

pub mod todo;
