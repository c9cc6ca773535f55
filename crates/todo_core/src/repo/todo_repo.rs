//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/get/list/update/delete over the `todos` table.
//! - Provide a transactional scope for multi-document writes.
//!
//! # Invariants
//! - `insert_todo` assigns a fresh UUID v4 id.
//! - `update_todo` on an unknown id returns `NotFound`.
//! - `delete_todo` on an unknown id succeeds and reports `false`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::todo::{
    validate_text_field, Todo, TodoDraft, TodoField, TodoId, TodoPatch, TodoValidationError,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    done,
    created_at,
    updated_at
FROM todos";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for todo persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    Db(DbError),
    NotFound(TodoId),
    /// Update called with a patch that changes nothing.
    EmptyPatch(TodoId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::EmptyPatch(id) => write!(f, "empty update for todo {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::EmptyPatch(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for listing todos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoQuery {
    /// `Some(flag)` keeps only todos whose `done` equals `flag`.
    pub done: Option<bool>,
}

impl TodoQuery {
    pub fn done(flag: bool) -> Self {
        Self { done: Some(flag) }
    }
}

/// Work executed inside one repository transaction.
pub type TransactionWork<'w> = dyn FnMut(&dyn TodoRepository) -> RepoResult<()> + 'w;

/// Storage contract for todo documents.
pub trait TodoRepository {
    /// Persists a new todo and returns it with its assigned id.
    fn insert_todo(&self, draft: &TodoDraft) -> RepoResult<Todo>;

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;

    /// Lists matching todos ordered by `created_at ASC, id ASC`.
    fn list_todos(&self, query: &TodoQuery) -> RepoResult<Vec<Todo>>;

    /// Applies the provided patch fields to one todo.
    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()>;

    /// Deletes one todo. Returns whether a row was removed.
    fn delete_todo(&self, id: TodoId) -> RepoResult<bool>;

    /// Runs `work` atomically: either every write commits or none does.
    fn run_in_transaction(&self, work: &mut TransactionWork<'_>) -> RepoResult<()>;
}

impl<T: TodoRepository + ?Sized> TodoRepository for &T {
    fn insert_todo(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        (**self).insert_todo(draft)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        (**self).get_todo(id)
    }

    fn list_todos(&self, query: &TodoQuery) -> RepoResult<Vec<Todo>> {
        (**self).list_todos(query)
    }

    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()> {
        (**self).update_todo(id, patch)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<bool> {
        (**self).delete_todo(id)
    }

    fn run_in_transaction(&self, work: &mut TransactionWork<'_>) -> RepoResult<()> {
        (**self).run_in_transaction(work)
    }
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
    in_transaction: bool,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn insert_todo(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        let todo = Todo {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            done: draft.done,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        };
        todo.validate()?;

        self.conn.execute(
            "INSERT INTO todos (id, title, content, done, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                todo.id.to_string(),
                todo.title.as_str(),
                todo.content.as_str(),
                bool_to_int(todo.done),
                todo.created_at,
                todo.updated_at,
            ],
        )?;

        Ok(todo)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }

        Ok(None)
    }

    fn list_todos(&self, query: &TodoQuery) -> RepoResult<Vec<Todo>> {
        let mut sql = format!("{TODO_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(done) = query.done {
            sql.push_str(" AND done = ?");
            bind_values.push(Value::Integer(bool_to_int(done)));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }

        Ok(todos)
    }

    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Err(RepoError::EmptyPatch(id));
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            validate_text_field(TodoField::Title, title)?;
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(content) = &patch.content {
            validate_text_field(TodoField::Content, content)?;
            assignments.push("content = ?");
            bind_values.push(Value::Text(content.clone()));
        }
        if let Some(done) = patch.done {
            assignments.push("done = ?");
            bind_values.push(Value::Integer(bool_to_int(done)));
        }
        if let Some(updated_at) = patch.updated_at {
            assignments.push("updated_at = ?");
            bind_values.push(Value::Integer(updated_at));
        }
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE todos SET {} WHERE id = ?;", assignments.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn run_in_transaction(&self, work: &mut TransactionWork<'_>) -> RepoResult<()> {
        if self.in_transaction {
            // Already inside an outer scope; its commit covers this work too.
            return work(self);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let scoped = SqliteTodoRepository {
                conn: &tx,
                in_transaction: true,
            };
            work(&scoped)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid id value `{id_text}` in todos.id")))?;

    let done = match row.get::<_, i64>("done")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid done value `{other}` in todos.done"
            )));
        }
    };

    let todo = Todo {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        done,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    todo.validate()
        .map_err(|err| RepoError::InvalidData(format!("todo {id}: {err}")))?;
    Ok(todo)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
