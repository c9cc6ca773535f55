//! Todo webhooks.

use super::{function_error_response, service_error_response, WebhookRequest, WebhookResponse};
use crate::ai::create_todos_with_ai;
use crate::context::BackendContext;
use crate::model::todo::{parse_done_flag, parse_todo_id, TodoId, TodoValidationError};
use crate::service::todo_service::{ServiceError, TodoUpdate};
use log::{error, info};

pub fn create_todo(ctx: &BackendContext<'_>, request: &WebhookRequest) -> WebhookResponse {
    let (Some(title), Some(content)) = (request.param("title"), request.param("content")) else {
        return WebhookResponse::text("Invalid request", 400);
    };

    match ctx.todos().create(title, content) {
        Ok(id) => WebhookResponse::text(format!("Todo created: {id}"), 200),
        Err(err) => service_error_response(&err),
    }
}

pub fn get_todos(ctx: &BackendContext<'_>, _request: &WebhookRequest) -> WebhookResponse {
    let todos = match ctx.todos().read_all() {
        Ok(todos) => todos,
        Err(err) => return service_error_response(&err),
    };
    match serde_json::to_value(todos) {
        Ok(value) => WebhookResponse::json(value, 200),
        Err(err) => {
            error!("event=webhook_call module=webhook status=error webhook=getTodos error={err}");
            WebhookResponse::text("Internal error", 500)
        }
    }
}

pub fn get_todo_by_id(ctx: &BackendContext<'_>, request: &WebhookRequest) -> WebhookResponse {
    let id = match required_id(request) {
        Ok(IdParam::Known(id)) => id,
        Ok(IdParam::Unresolvable(raw)) => return not_found(raw),
        Err(response) => return response,
    };

    match ctx.todos().read_by_id(id) {
        Ok(todo) => match serde_json::to_value(todo) {
            Ok(value) => WebhookResponse::json(value, 200),
            Err(err) => {
                error!("event=webhook_call module=webhook status=error webhook=getTodoById error={err}");
                WebhookResponse::text("Internal error", 500)
            }
        },
        Err(err) => service_error_response(&err),
    }
}

pub fn update_todo(ctx: &BackendContext<'_>, request: &WebhookRequest) -> WebhookResponse {
    let id = match required_id(request) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let update = TodoUpdate {
        title: request.param("title").map(str::to_string),
        content: request.param("content").map(str::to_string),
    };
    let id = match id {
        IdParam::Known(id) => id,
        IdParam::Unresolvable(_) if update.title.is_none() && update.content.is_none() => {
            return service_error_response(&ServiceError::Validation(
                TodoValidationError::NothingToUpdate,
            ));
        }
        IdParam::Unresolvable(raw) => return not_found(raw),
    };

    match ctx.todos().update(id, update) {
        Ok(()) => WebhookResponse::text(format!("Todo with ID {id} updated"), 200),
        Err(err) => service_error_response(&err),
    }
}

pub fn toggle_todo(ctx: &BackendContext<'_>, request: &WebhookRequest) -> WebhookResponse {
    let (Some(raw_id), Some(raw_done)) = (request.param("id"), request.param("done")) else {
        return WebhookResponse::text("Invalid request: missing ID or done status", 400);
    };
    let done = match parse_done_flag(raw_done) {
        Ok(done) => done,
        Err(err) => return service_error_response(&ServiceError::Validation(err)),
    };
    let id = match resolve_id(raw_id) {
        IdParam::Known(id) => id,
        IdParam::Unresolvable(raw) => return not_found(raw),
    };

    match ctx.todos().toggle(id, done) {
        Ok(()) => {
            let state = if done { "done" } else { "not done" };
            WebhookResponse::text(format!("Todo with ID {id} marked as {state}"), 200)
        }
        Err(err) => service_error_response(&err),
    }
}

pub fn delete_todo(ctx: &BackendContext<'_>, request: &WebhookRequest) -> WebhookResponse {
    let id = match required_id(request) {
        Ok(IdParam::Known(id)) => id,
        Ok(IdParam::Unresolvable(raw)) => {
            info!("event=todo_delete module=webhook status=ok todo_id={raw} removed=false");
            return WebhookResponse::text(format!("Todo with ID {raw} deleted"), 200);
        }
        Err(response) => return response,
    };

    match ctx.todos().delete(id) {
        Ok(()) => WebhookResponse::text(format!("Todo with ID {id} deleted"), 200),
        Err(err) => service_error_response(&err),
    }
}

pub fn create_todo_with_ai(ctx: &BackendContext<'_>, request: &WebhookRequest) -> WebhookResponse {
    let Some(task) = request.param("task") else {
        return WebhookResponse::text("Invalid request: missing task description", 400);
    };

    match create_todos_with_ai(ctx, task) {
        Ok(created) => WebhookResponse::text(format!("Todo created with AI: {created} todos"), 200),
        Err(err) => function_error_response(&err),
    }
}

/// `id` parameter as received. Todo ids are UUIDs, so any other value
/// names no stored todo.
enum IdParam<'r> {
    Known(TodoId),
    Unresolvable(&'r str),
}

fn resolve_id(raw: &str) -> IdParam<'_> {
    match parse_todo_id(raw) {
        Ok(id) => IdParam::Known(id),
        Err(_) => IdParam::Unresolvable(raw),
    }
}

/// Reads the `id` parameter, or returns the 400 response to send.
fn required_id(request: &WebhookRequest) -> Result<IdParam<'_>, WebhookResponse> {
    request
        .param("id")
        .map(resolve_id)
        .ok_or_else(|| WebhookResponse::text("Invalid request: missing ID", 400))
}

fn not_found(raw: &str) -> WebhookResponse {
    WebhookResponse::text(format!("Todo with ID {raw} not found"), 404)
}
