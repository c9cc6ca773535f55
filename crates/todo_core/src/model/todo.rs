//! Todo domain model.
//!
//! # Responsibility
//! - Define the persisted todo record and the draft/patch write shapes.
//! - Validate user-supplied text and flags before they reach storage.
//! - Decide which field changes count as substantive.
//!
//! # Invariants
//! - `id` is assigned once by the repository and never reused.
//! - `created_at` is set at creation and never mutated.
//! - `updated_at` starts equal to `created_at` and only moves forward.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one todo document.
pub type TodoId = Uuid;

/// Persisted todo document.
///
/// Serialized with camelCase keys to match the webhook wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub content: String,
    pub done: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Always `>= created_at`.
    pub updated_at: i64,
}

impl Todo {
    /// Returns whether `done`, `title` or `content` differ between two states.
    ///
    /// Timestamps are deliberately not part of the comparison, so a
    /// timestamp-only write never counts as a substantive change.
    pub fn differs_substantively(&self, other: &Todo) -> bool {
        self.done != other.done || self.title != other.title || self.content != other.content
    }

    /// Validates persisted-state invariants.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        validate_text_field(TodoField::Title, &self.title)?;
        validate_text_field(TodoField::Content, &self.content)?;
        if self.updated_at < self.created_at {
            return Err(TodoValidationError::TimestampOrder {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Insert shape for a todo that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    pub content: String,
    pub done: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TodoDraft {
    /// Builds a fresh, not-done draft stamped at `now_ms`.
    ///
    /// # Errors
    /// - Returns `EmptyField` when `title` or `content` is blank.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        now_ms: i64,
    ) -> Result<Self, TodoValidationError> {
        let title = title.into();
        let content = content.into();
        validate_text_field(TodoField::Title, &title)?;
        validate_text_field(TodoField::Content, &content)?;

        Ok(Self {
            title,
            content,
            done: false,
            created_at: now_ms,
            updated_at: now_ms,
        })
    }
}

/// Sparse field update applied by the repository.
///
/// `None` leaves the stored value untouched. There is no `created_at`
/// field; creation time is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub done: Option<bool>,
    pub updated_at: Option<i64>,
}

impl TodoPatch {
    /// Builds a title/content patch, dropping empty values.
    ///
    /// # Errors
    /// - Returns `NothingToUpdate` when neither field carries text.
    pub fn text(
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Self, TodoValidationError> {
        let title = title.filter(|value| !value.trim().is_empty());
        let content = content.filter(|value| !value.trim().is_empty());
        if title.is_none() && content.is_none() {
            return Err(TodoValidationError::NothingToUpdate);
        }

        Ok(Self {
            title,
            content,
            ..Self::default()
        })
    }

    pub fn done(done: bool) -> Self {
        Self {
            done: Some(done),
            ..Self::default()
        }
    }

    pub fn touch(updated_at: i64) -> Self {
        Self {
            updated_at: Some(updated_at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.done.is_none()
            && self.updated_at.is_none()
    }
}

/// User-supplied text fields of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoField {
    Title,
    Content,
}

impl TodoField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
        }
    }
}

/// Validation failures for todo input and persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Required text field is missing or blank.
    EmptyField(TodoField),
    /// Update request carries no field to change.
    NothingToUpdate,
    /// Toggle flag is not `true` or `false`.
    InvalidDoneFlag(String),
    /// Identifier is not a well-formed UUID.
    MalformedId(String),
    /// Free-text task description is empty.
    EmptyTask,
    TimestampOrder { created_at: i64, updated_at: i64 },
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{} must not be empty", field.as_str()),
            Self::NothingToUpdate => write!(f, "no fields to update"),
            Self::InvalidDoneFlag(value) => {
                write!(f, "done flag must be `true` or `false`, got `{value}`")
            }
            Self::MalformedId(value) => write!(f, "malformed todo id `{value}`"),
            Self::EmptyTask => write!(f, "task description must not be empty"),
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} is earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for TodoValidationError {}

/// Parses a todo id received as text.
pub fn parse_todo_id(value: &str) -> Result<TodoId, TodoValidationError> {
    let trimmed = value.trim();
    Uuid::parse_str(trimmed).map_err(|_| TodoValidationError::MalformedId(trimmed.to_string()))
}

/// Parses a completion flag received as text.
///
/// Accepts `true` / `false`, case-insensitive, surrounding whitespace ignored.
pub fn parse_done_flag(value: &str) -> Result<bool, TodoValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(TodoValidationError::InvalidDoneFlag(value.to_string())),
    }
}

pub(crate) fn validate_text_field(
    field: TodoField,
    value: &str,
) -> Result<(), TodoValidationError> {
    if value.trim().is_empty() {
        return Err(TodoValidationError::EmptyField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        parse_done_flag, parse_todo_id, Todo, TodoDraft, TodoField, TodoPatch,
        TodoValidationError,
    };
    use uuid::Uuid;

    fn sample() -> Todo {
        Todo {
            id: Uuid::new_v4(),
            title: "Buy milk".to_string(),
            content: "2%".to_string(),
            done: false,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn draft_starts_not_done_with_equal_timestamps() {
        let draft = TodoDraft::new("a", "b", 42).unwrap();
        assert!(!draft.done);
        assert_eq!(draft.created_at, 42);
        assert_eq!(draft.updated_at, 42);
    }

    #[test]
    fn draft_rejects_blank_fields() {
        assert_eq!(
            TodoDraft::new("  ", "b", 1).unwrap_err(),
            TodoValidationError::EmptyField(TodoField::Title)
        );
        assert_eq!(
            TodoDraft::new("a", "", 1).unwrap_err(),
            TodoValidationError::EmptyField(TodoField::Content)
        );
    }

    #[test]
    fn text_patch_drops_empty_values_and_requires_one_field() {
        let patch = TodoPatch::text(Some("A2".to_string()), Some(String::new())).unwrap();
        assert_eq!(patch.title.as_deref(), Some("A2"));
        assert!(patch.content.is_none());

        assert_eq!(
            TodoPatch::text(None, Some(" ".to_string())).unwrap_err(),
            TodoValidationError::NothingToUpdate
        );
    }

    #[test]
    fn timestamp_only_change_is_not_substantive() {
        let before = sample();
        let mut after = before.clone();
        after.updated_at += 500;
        assert!(!before.differs_substantively(&after));

        after.done = true;
        assert!(before.differs_substantively(&after));
    }

    #[test]
    fn validate_rejects_reversed_timestamps() {
        let mut todo = sample();
        todo.updated_at = todo.created_at - 1;
        assert!(matches!(
            todo.validate(),
            Err(TodoValidationError::TimestampOrder { .. })
        ));
    }

    #[test]
    fn done_flag_parsing_is_strict() {
        assert!(parse_done_flag(" TRUE ").unwrap());
        assert!(!parse_done_flag("false").unwrap());
        assert!(parse_done_flag("yes").is_err());
        assert!(parse_done_flag("").is_err());
    }

    #[test]
    fn todo_id_parsing_rejects_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_todo_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_todo_id("not-a-uuid"),
            Err(TodoValidationError::MalformedId(_))
        ));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
    }
}
