//! Core logic for the todo backend.
//! Owns the todo lifecycle, its automation hooks and the webhook surface.

pub mod ai;
pub mod backend;
pub mod clock;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod scheduler;
pub mod service;
pub mod trigger;
pub mod webhook;

pub use ai::openai::OpenAiAssistantRuntime;
pub use ai::{create_todos_with_ai, AssistantError, AssistantRuntime, FunctionInvoker};
pub use backend::TodoBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AssistantConfig, BackendConfig};
pub use context::BackendContext;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::todo::{
    parse_done_flag, parse_todo_id, Todo, TodoDraft, TodoField, TodoId, TodoPatch,
    TodoValidationError,
};
pub use registry::{FunctionError, FunctionKind, FunctionRegistry, FunctionResult, RegistryError};
pub use repo::todo_repo::{RepoError, RepoResult, SqliteTodoRepository, TodoQuery, TodoRepository};
pub use scheduler::{spawn_interval, IntervalHandle};
pub use service::cleanup::{clean_done_todos, CLEANUP_INTERVAL};
pub use service::todo_service::{ServiceError, ServiceResult, TodoService, TodoUpdate};
pub use trigger::{MutationType, TriggerRequest, TriggeredTodoRepository};
pub use webhook::{WebhookBody, WebhookRequest, WebhookResponse};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
