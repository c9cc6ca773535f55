//! Todo use-case services.
//!
//! # Responsibility
//! - Own the lifecycle invariants of a todo across create/update/toggle/delete.
//! - Own the cleanup sweep shared by on-demand and scheduled callers.
//! - Stay transport-agnostic; adapters translate results to responses.

pub mod cleanup;
pub mod todo_service;
