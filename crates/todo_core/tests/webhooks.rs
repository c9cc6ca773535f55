use serde_json::Value;
use todo_core::db::open_db_in_memory;
use todo_core::{
    ManualClock, SqliteTodoRepository, TodoBackend, WebhookBody, WebhookRequest, WebhookResponse,
};
use uuid::Uuid;

fn call(
    backend: &TodoBackend<SqliteTodoRepository<'_>, ManualClock>,
    name: &str,
    params: &[(&str, &str)],
) -> WebhookResponse {
    let request: WebhookRequest = params.iter().copied().collect();
    backend.call_webhook(name, &request)
}

fn created_id(response: &WebhookResponse) -> Uuid {
    let text = response.text_message().unwrap();
    let raw = text.strip_prefix("Todo created: ").unwrap();
    Uuid::parse_str(raw).unwrap()
}

#[test]
fn create_requires_title_and_content() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();

    let response = call(&backend, "createTodo", &[("title", "A")]);
    assert_eq!(response.status_code, 400);
    assert_eq!(response.text_message(), Some("Invalid request"));

    let response = call(&backend, "createTodo", &[("title", "A"), ("content", "a")]);
    assert_eq!(response.status_code, 200);
    created_id(&response);
}

#[test]
fn get_todos_returns_camel_case_documents() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(7)).unwrap();
    let id = created_id(&call(&backend, "createTodo", &[("title", "A"), ("content", "a")]));

    let response = call(&backend, "getTodos", &[]);
    assert_eq!(response.status_code, 200);
    let WebhookBody::Json(Value::Array(items)) = &response.message else {
        panic!("expected a JSON array, got {:?}", response.message);
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id.to_string());
    assert_eq!(items[0]["done"], false);
    assert_eq!(items[0]["createdAt"], 7);
    assert_eq!(items[0]["updatedAt"], 7);
}

#[test]
fn get_by_id_separates_missing_from_unknown() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();

    let response = call(&backend, "getTodoById", &[]);
    assert_eq!(response.status_code, 400);
    assert_eq!(response.text_message(), Some("Invalid request: missing ID"));

    let response = call(&backend, "getTodoById", &[("id", "abc123")]);
    assert_eq!(response.status_code, 404);
    assert_eq!(response.text_message(), Some("Todo with ID abc123 not found"));

    let unknown = Uuid::new_v4();
    let unknown_text = unknown.to_string();
    let response = call(&backend, "getTodoById", &[("id", unknown_text.as_str())]);
    assert_eq!(response.status_code, 404);
    assert_eq!(
        response.text_message(),
        Some(format!("Todo with ID {unknown} not found").as_str())
    );
}

#[test]
fn non_uuid_ids_resolve_to_nothing() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();

    let response = call(&backend, "toggleTodo", &[("id", "abc123"), ("done", "true")]);
    assert_eq!(response.status_code, 404);
    assert_eq!(response.text_message(), Some("Todo with ID abc123 not found"));

    let response = call(&backend, "updateTodo", &[("id", "abc123"), ("title", "A2")]);
    assert_eq!(response.status_code, 404);
    assert_eq!(response.text_message(), Some("Todo with ID abc123 not found"));

    let response = call(&backend, "updateTodo", &[("id", "abc123")]);
    assert_eq!(response.status_code, 400);
    assert_eq!(response.text_message(), Some("No fields to update"));

    let response = call(&backend, "deleteTodo", &[("id", "abc123")]);
    assert_eq!(response.status_code, 200);
    assert_eq!(response.text_message(), Some("Todo with ID abc123 deleted"));
}

#[test]
fn update_reports_missing_fields_and_success() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();
    let id = created_id(&call(&backend, "createTodo", &[("title", "A"), ("content", "a")]));
    let id_text = id.to_string();

    let response = call(&backend, "updateTodo", &[("id", id_text.as_str()), ("title", "")]);
    assert_eq!(response.status_code, 400);
    assert_eq!(response.text_message(), Some("No fields to update"));

    let response = call(&backend, "updateTodo", &[("id", id_text.as_str()), ("title", "A2")]);
    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.text_message(),
        Some(format!("Todo with ID {id} updated").as_str())
    );
    assert_eq!(backend.todos().read_by_id(id).unwrap().title, "A2");
}

#[test]
fn toggle_validates_flag_and_reports_state() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();
    let id = created_id(&call(&backend, "createTodo", &[("title", "A"), ("content", "a")]));
    let id_text = id.to_string();

    let response = call(&backend, "toggleTodo", &[("id", id_text.as_str())]);
    assert_eq!(response.status_code, 400);
    assert_eq!(
        response.text_message(),
        Some("Invalid request: missing ID or done status")
    );

    let response = call(&backend, "toggleTodo", &[("id", id_text.as_str()), ("done", "maybe")]);
    assert_eq!(response.status_code, 400);

    let response = call(&backend, "toggleTodo", &[("id", id_text.as_str()), ("done", "true")]);
    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.text_message(),
        Some(format!("Todo with ID {id} marked as done").as_str())
    );

    let response = call(&backend, "toggleTodo", &[("id", id_text.as_str()), ("done", "FALSE")]);
    assert_eq!(
        response.text_message(),
        Some(format!("Todo with ID {id} marked as not done").as_str())
    );
    assert!(!backend.todos().read_by_id(id).unwrap().done);
}

#[test]
fn delete_of_absent_id_is_a_success() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();
    let absent = Uuid::new_v4();
    let absent_text = absent.to_string();

    let response = call(&backend, "deleteTodo", &[("id", absent_text.as_str())]);
    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.text_message(),
        Some(format!("Todo with ID {absent} deleted").as_str())
    );
}

#[test]
fn unknown_webhook_is_404() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();

    let response = call(&backend, "dropTables", &[]);
    assert_eq!(response.status_code, 404);
    assert_eq!(response.text_message(), Some("Unknown webhook dropTables"));
}

#[test]
fn ai_webhook_without_assistant_is_unavailable() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();

    let response = call(&backend, "createTodoWithAI", &[]);
    assert_eq!(response.status_code, 400);

    let response = call(&backend, "createTodoWithAI", &[("task", "Plan a party")]);
    assert_eq!(response.status_code, 503);
    assert_eq!(response.text_message(), Some("AI assistant not configured"));
}

#[test]
fn storage_failure_is_an_internal_error() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();
    conn.execute_batch("DROP TABLE todos;").unwrap();

    let response = call(&backend, "getTodos", &[]);
    assert_eq!(response.status_code, 500);
    assert_eq!(response.text_message(), Some("Internal error"));
}
