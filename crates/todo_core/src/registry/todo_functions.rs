//! Registration of every todo backend function.

use super::{FunctionError, FunctionRegistry, FunctionResult, RegistryError};
use crate::ai::{create_todo_from_assistant, create_todo_schema, create_todos_with_ai};
use crate::context::BackendContext;
use crate::service::cleanup::{clean_done_todos, CLEANUP_INTERVAL};
use crate::trigger::{on_update_todo, MutationType, TODOS_COLLECTION};
use crate::webhook::todos;
use serde_json::{json, Value};

/// Populates `registry` with the todo webhooks, trigger, schedule,
/// executables and assistant-callable function.
pub fn register_todo_functions(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register_webhook("createTodo", todos::create_todo)?;
    registry.register_webhook("getTodos", todos::get_todos)?;
    registry.register_webhook("getTodoById", todos::get_todo_by_id)?;
    registry.register_webhook("updateTodo", todos::update_todo)?;
    registry.register_webhook("toggleTodo", todos::toggle_todo)?;
    registry.register_webhook("deleteTodo", todos::delete_todo)?;
    registry.register_webhook("createTodoWithAI", todos::create_todo_with_ai)?;

    registry.register_trigger(
        "onUpdateTodo",
        TODOS_COLLECTION,
        MutationType::Update,
        on_update_todo,
    )?;

    registry.register_schedule("cleanTodosOnSchedule", CLEANUP_INTERVAL, clean_todos_on_schedule)?;

    registry.register_executable("cleanTodos", clean_todos)?;
    registry.register_executable("createTodosWithAI", create_todos_with_ai_executable)?;

    registry.register_ai_function(create_todo_schema(), create_todo_from_assistant)?;
    Ok(())
}

fn clean_todos(ctx: &BackendContext<'_>, _args: &Value) -> FunctionResult<Value> {
    let removed = clean_done_todos(ctx.repo)?;
    Ok(json!({ "removed": removed }))
}

fn clean_todos_on_schedule(ctx: &BackendContext<'_>) -> FunctionResult<()> {
    clean_done_todos(ctx.repo)?;
    Ok(())
}

/// Accepts either a bare task string or `{"task": "..."}`.
fn create_todos_with_ai_executable(ctx: &BackendContext<'_>, args: &Value) -> FunctionResult<Value> {
    let task = args
        .as_str()
        .or_else(|| args.get("task").and_then(Value::as_str))
        .ok_or_else(|| FunctionError::InvalidArguments("`task` must be a string".to_string()))?;
    let created = create_todos_with_ai(ctx, task)?;
    Ok(json!({ "created": created }))
}
