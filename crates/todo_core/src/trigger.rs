//! Change triggers on the `todos` collection.
//!
//! # Responsibility
//! - Decorate a repository so every insert/update/delete dispatches the
//!   triggers registered for the affected collection.
//! - Stamp `updated_at` when an update changes `done`, `title` or `content`.
//!
//! # Invariants
//! - The stamp handler never reads or writes `created_at`.
//! - A stamp-only write re-enters dispatch but is not substantive, so the
//!   chain ends after one extra round.
//! - Trigger failures are logged; they never undo the committed mutation.

use crate::ai::AssistantRuntime;
use crate::clock::Clock;
use crate::context::BackendContext;
use crate::model::todo::{Todo, TodoDraft, TodoId, TodoPatch};
use crate::registry::{FunctionRegistry, FunctionResult};
use crate::repo::todo_repo::{RepoResult, TodoQuery, TodoRepository, TransactionWork};
use log::{debug, error};

/// Collection name of todo documents.
pub const TODOS_COLLECTION: &str = "todos";

/// Kind of write that fired a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MutationType {
    Insert,
    Update,
    Delete,
}

impl MutationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Document state around one mutation.
///
/// `before` is `None` for inserts; `after` is `None` for deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub collection: String,
    pub mutation: MutationType,
    pub before: Option<Todo>,
    pub after: Option<Todo>,
}

/// Stamps `updated_at` after a substantive update.
///
/// The new stamp is strictly greater than `before.updated_at` even when the
/// clock has not moved since the previous write.
pub fn on_update_todo(ctx: &BackendContext<'_>, request: &TriggerRequest) -> FunctionResult<()> {
    let (Some(before), Some(after)) = (&request.before, &request.after) else {
        return Ok(());
    };
    if !before.differs_substantively(after) {
        return Ok(());
    }

    let stamp = ctx
        .clock
        .now_ms()
        .max(before.updated_at.saturating_add(1));
    ctx.repo.update_todo(after.id, &TodoPatch::touch(stamp))?;
    debug!(
        "event=todo_touch module=trigger status=ok todo_id={} updated_at={stamp}",
        after.id
    );
    Ok(())
}

/// Repository decorator that dispatches registered triggers.
pub struct TriggeredTodoRepository<'a, R: TodoRepository> {
    inner: R,
    registry: &'a FunctionRegistry,
    clock: &'a dyn Clock,
    assistant: Option<&'a dyn AssistantRuntime>,
}

impl<'a, R: TodoRepository> TriggeredTodoRepository<'a, R> {
    pub fn new(
        inner: R,
        registry: &'a FunctionRegistry,
        clock: &'a dyn Clock,
        assistant: Option<&'a dyn AssistantRuntime>,
    ) -> Self {
        Self {
            inner,
            registry,
            clock,
            assistant,
        }
    }

    fn dispatch(&self, mutation: MutationType, before: Option<Todo>, after: Option<Todo>) {
        let mut triggers = self
            .registry
            .triggers_for(TODOS_COLLECTION, mutation)
            .peekable();
        if triggers.peek().is_none() {
            return;
        }

        let request = TriggerRequest {
            collection: TODOS_COLLECTION.to_string(),
            mutation,
            before,
            after,
        };
        let ctx = BackendContext {
            repo: self,
            clock: self.clock,
            registry: self.registry,
            assistant: self.assistant,
        };
        for trigger in triggers {
            if let Err(err) = (trigger.handler)(&ctx, &request) {
                error!(
                    "event=trigger_run module=trigger status=error trigger={} mutation={} error={}",
                    trigger.name,
                    mutation.as_str(),
                    err
                );
            }
        }
    }
}

impl<R: TodoRepository> TodoRepository for TriggeredTodoRepository<'_, R> {
    fn insert_todo(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        let todo = self.inner.insert_todo(draft)?;
        self.dispatch(MutationType::Insert, None, Some(todo.clone()));
        Ok(todo)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        self.inner.get_todo(id)
    }

    fn list_todos(&self, query: &TodoQuery) -> RepoResult<Vec<Todo>> {
        self.inner.list_todos(query)
    }

    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()> {
        let before = self.inner.get_todo(id)?;
        self.inner.update_todo(id, patch)?;
        let after = self.inner.get_todo(id)?;
        self.dispatch(MutationType::Update, before, after);
        Ok(())
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<bool> {
        let before = self.inner.get_todo(id)?;
        let removed = self.inner.delete_todo(id)?;
        if removed {
            self.dispatch(MutationType::Delete, before, None);
        }
        Ok(removed)
    }

    fn run_in_transaction(&self, work: &mut TransactionWork<'_>) -> RepoResult<()> {
        self.inner.run_in_transaction(&mut |scoped| {
            let triggered =
                TriggeredTodoRepository::new(scoped, self.registry, self.clock, self.assistant);
            work(&triggered)
        })
    }
}
