//! Todo lifecycle service.
//!
//! # Responsibility
//! - Validate caller input and apply field-level changes through the repository.
//! - Map repository outcomes to lifecycle errors (`Validation`, `NotFound`).
//!
//! # Invariants
//! - `create` stamps `created_at == updated_at == now` and `done == false`.
//! - `update` only writes `title` / `content`; `toggle` only writes `done`.
//! - No document state is cached between calls.
//! - `updated_at` on substantive writes is stamped by the update trigger,
//!   not by this service.

use crate::clock::Clock;
use crate::model::todo::{Todo, TodoDraft, TodoId, TodoPatch, TodoValidationError};
use crate::repo::todo_repo::{RepoError, TodoQuery, TodoRepository};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Lifecycle error surfaced to adapters and direct callers.
#[derive(Debug)]
pub enum ServiceError {
    /// Missing or malformed caller input.
    Validation(TodoValidationError),
    /// Referenced todo does not exist.
    NotFound(TodoId),
    /// Storage-layer failure; not retried here.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid request: {err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<TodoValidationError> for ServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Partial text update accepted by [`TodoService::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Lifecycle service over any todo repository.
pub struct TodoService<R: TodoRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: TodoRepository, C: Clock> TodoService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Creates one todo and returns its repository-assigned id.
    ///
    /// # Errors
    /// - `Validation` when `title` or `content` is blank.
    pub fn create(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> ServiceResult<TodoId> {
        let draft = TodoDraft::new(title, content, self.clock.now_ms())?;
        let todo = self.repo.insert_todo(&draft)?;
        info!(
            "event=todo_create module=service status=ok todo_id={} created_at={}",
            todo.id, todo.created_at
        );
        Ok(todo.id)
    }

    /// Returns every todo, oldest first. Each call reads a fresh snapshot.
    pub fn read_all(&self) -> ServiceResult<Vec<Todo>> {
        let todos = self.repo.list_todos(&TodoQuery::default())?;
        debug!(
            "event=todo_list module=service status=ok count={}",
            todos.len()
        );
        Ok(todos)
    }

    pub fn read_by_id(&self, id: TodoId) -> ServiceResult<Todo> {
        self.repo.get_todo(id)?.ok_or(ServiceError::NotFound(id))
    }

    /// Applies the provided text fields. Empty values count as absent.
    ///
    /// # Errors
    /// - `Validation(NothingToUpdate)` when no field carries text.
    /// - `NotFound` when `id` does not resolve.
    pub fn update(&self, id: TodoId, update: TodoUpdate) -> ServiceResult<()> {
        let patch = TodoPatch::text(update.title, update.content)?;
        self.repo.update_todo(id, &patch)?;
        info!(
            "event=todo_update module=service status=ok todo_id={id} title={} content={}",
            patch.title.is_some(),
            patch.content.is_some()
        );
        Ok(())
    }

    /// Sets the completion flag only.
    pub fn toggle(&self, id: TodoId, done: bool) -> ServiceResult<()> {
        self.repo.update_todo(id, &TodoPatch::done(done))?;
        info!("event=todo_toggle module=service status=ok todo_id={id} done={done}");
        Ok(())
    }

    /// Deletes one todo. Deleting an absent id succeeds.
    pub fn delete(&self, id: TodoId) -> ServiceResult<()> {
        let removed = self.repo.delete_todo(id)?;
        info!("event=todo_delete module=service status=ok todo_id={id} removed={removed}");
        Ok(())
    }
}
