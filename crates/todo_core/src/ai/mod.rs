//! Assistant-driven task decomposition.
//!
//! # Responsibility
//! - Describe assistant-callable functions with a parameter schema.
//! - Define the assistant runtime contract the decomposer drives.
//! - Turn one free-text task into several todos via the runtime.
//!
//! # Invariants
//! - The decomposer always deletes the thread and assistant it created,
//!   including when the query fails.
//! - Assistant-issued calls go through the registry, never around it.

pub mod openai;

use crate::context::BackendContext;
use crate::model::todo::TodoValidationError;
use crate::registry::{FunctionError, FunctionResult};
use crate::service::todo_service::ServiceError;
use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Assistant name used for task decomposition.
pub const TODO_CREATOR_NAME: &str = "todoCreator";
/// Instructions given to the decomposition assistant.
pub const TODO_CREATOR_INSTRUCTIONS: &str = "You are designed to create todo list items based on the specified task. You should create anywhere between 3-5 todos.";
/// Assistant-callable function that creates one todo.
pub const CREATE_TODO_FROM_ASSISTANT: &str = "createTodoFromAssistant";

pub type AssistantResult<T> = Result<T, AssistantError>;

/// Assistant runtime failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantError {
    /// Network or HTTP-level failure talking to the model provider.
    Transport(String),
    /// Provider replied with something this runtime cannot interpret.
    Protocol(String),
    UnknownAssistant(String),
    UnknownThread(String),
    /// The model kept calling functions past the round limit.
    TooManyRounds(usize),
}

impl Display for AssistantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "assistant transport failed: {message}"),
            Self::Protocol(message) => write!(f, "assistant protocol error: {message}"),
            Self::UnknownAssistant(id) => write!(f, "unknown assistant `{id}`"),
            Self::UnknownThread(id) => write!(f, "unknown thread `{id}`"),
            Self::TooManyRounds(rounds) => {
                write!(f, "assistant exceeded {rounds} function-call rounds")
            }
        }
    }
}

impl Error for AssistantError {}

/// JSON type of one function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiParamType {
    String,
}

impl AiParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
        }
    }
}

/// One documented function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiFunctionParam {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub param_type: AiParamType,
    pub required: bool,
}

impl AiFunctionParam {
    pub fn required(name: &str, description: &str, param_type: AiParamType) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            param_type,
            required: true,
        }
    }
}

/// Declaration of an assistant-callable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiFunctionSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<AiFunctionParam>,
}

impl AiFunctionSchema {
    /// Renders the parameters as a JSON Schema object.
    pub fn parameters_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Checks required presence and JSON types of call arguments.
    pub fn check_args(&self, args: &Value) -> Result<(), String> {
        let Some(object) = args.as_object() else {
            return Err(format!("{} expects an object of arguments", self.name));
        };
        for param in &self.params {
            match object.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(format!("missing required parameter `{}`", param.name));
                }
                Some(value) if !value.is_null() && !param.param_type.accepts(value) => {
                    return Err(format!(
                        "parameter `{}` must be a {}",
                        param.name,
                        param.param_type.as_str()
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Executes functions the assistant asks for during a query.
pub trait FunctionInvoker {
    /// Returns the text handed back to the model, or an error description.
    fn invoke(&self, name: &str, args: &Value) -> Result<String, String>;
}

/// External assistant runtime.
pub trait AssistantRuntime {
    fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        functions: &[AiFunctionSchema],
    ) -> AssistantResult<String>;

    fn create_thread(&self, assistant_id: &str) -> AssistantResult<String>;

    /// Sends `prompt` on `thread_id` and runs any requested function calls
    /// through `invoker` until the assistant produces a final reply.
    fn query_assistant(
        &self,
        assistant_id: &str,
        thread_id: &str,
        prompt: &str,
        invoker: &dyn FunctionInvoker,
    ) -> AssistantResult<String>;

    fn delete_thread(&self, thread_id: &str) -> AssistantResult<()>;

    fn delete_assistant(&self, assistant_id: &str) -> AssistantResult<()>;
}

/// Parameter schema of `createTodoFromAssistant`.
pub fn create_todo_schema() -> AiFunctionSchema {
    AiFunctionSchema {
        name: CREATE_TODO_FROM_ASSISTANT.to_string(),
        description: "This function creates a new item in a todo list".to_string(),
        params: vec![
            AiFunctionParam::required("title", "The title of the todo item", AiParamType::String),
            AiFunctionParam::required(
                "content",
                "The content of the todo item",
                AiParamType::String,
            ),
        ],
    }
}

/// Assistant-callable handler: creates one todo from `{title, content}`.
pub fn create_todo_from_assistant(ctx: &BackendContext<'_>, args: &Value) -> FunctionResult<String> {
    let title = string_arg(args, "title")?;
    let content = string_arg(args, "content")?;
    let id = ctx.todos().create(title, content)?;
    Ok(format!("Todo created: {id}"))
}

/// Asks the configured assistant to split `task` into todos.
///
/// Returns how many todos the assistant created.
///
/// # Errors
/// - `Service(Validation(EmptyTask))` when `task` is blank.
/// - `AssistantUnavailable` when the context carries no runtime.
/// - `Assistant` when the runtime fails to create or query.
pub fn create_todos_with_ai(ctx: &BackendContext<'_>, task: &str) -> FunctionResult<usize> {
    let task = task.trim();
    if task.is_empty() {
        return Err(ServiceError::Validation(TodoValidationError::EmptyTask).into());
    }
    let assistant = ctx.assistant.ok_or(FunctionError::AssistantUnavailable)?;
    let create_fn = ctx
        .registry
        .ai_function(CREATE_TODO_FROM_ASSISTANT)
        .ok_or_else(|| FunctionError::UnknownFunction {
            kind: crate::registry::FunctionKind::AiFunction,
            name: CREATE_TODO_FROM_ASSISTANT.to_string(),
        })?;

    let assistant_id = assistant.create_assistant(
        TODO_CREATOR_NAME,
        TODO_CREATOR_INSTRUCTIONS,
        std::slice::from_ref(&create_fn.schema),
    )?;
    let thread_id = match assistant.create_thread(&assistant_id) {
        Ok(thread_id) => thread_id,
        Err(err) => {
            release_assistant(assistant, &assistant_id);
            return Err(err.into());
        }
    };

    let invoker = RegistryInvoker {
        ctx,
        created: Cell::new(0),
    };
    let reply = assistant.query_assistant(
        &assistant_id,
        &thread_id,
        &format!("Create some todos for the following task: {task}"),
        &invoker,
    );

    if let Err(err) = assistant.delete_thread(&thread_id) {
        warn!("event=ai_cleanup module=ai status=error thread_id={thread_id} error={err}");
    }
    release_assistant(assistant, &assistant_id);

    let created = invoker.created.get();
    if let Err(err) = reply {
        warn!("event=ai_decompose module=ai status=error created={created} error={err}");
        return Err(err.into());
    }
    info!("event=ai_decompose module=ai status=ok created={created}");
    Ok(created)
}

/// Routes assistant calls to registered functions and counts created todos.
struct RegistryInvoker<'c> {
    ctx: &'c BackendContext<'c>,
    created: Cell<usize>,
}

impl FunctionInvoker for RegistryInvoker<'_> {
    fn invoke(&self, name: &str, args: &Value) -> Result<String, String> {
        let Some(function) = self.ctx.registry.ai_function(name) else {
            return Err(format!("unknown function `{name}`"));
        };
        function.schema.check_args(args)?;

        match (function.handler)(self.ctx, args) {
            Ok(message) => {
                if name == CREATE_TODO_FROM_ASSISTANT {
                    self.created.set(self.created.get() + 1);
                }
                Ok(message)
            }
            Err(err) => {
                warn!("event=ai_function module=ai status=error function={name} error={err}");
                Err(err.to_string())
            }
        }
    }
}

fn release_assistant(assistant: &dyn AssistantRuntime, assistant_id: &str) {
    if let Err(err) = assistant.delete_assistant(assistant_id) {
        warn!("event=ai_cleanup module=ai status=error assistant_id={assistant_id} error={err}");
    }
}

fn string_arg<'v>(args: &'v Value, key: &str) -> FunctionResult<&'v str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| FunctionError::InvalidArguments(format!("`{key}` must be a string")))
}

#[cfg(test)]
mod tests {
    use super::create_todo_schema;
    use serde_json::json;

    #[test]
    fn schema_lists_required_string_params() {
        let schema = create_todo_schema().parameters_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["title"]["type"], "string");
        assert_eq!(schema["required"], json!(["title", "content"]));
    }

    #[test]
    fn check_args_reports_missing_and_mistyped_params() {
        let schema = create_todo_schema();
        assert!(schema
            .check_args(&json!({"title": "a", "content": "b"}))
            .is_ok());
        assert!(schema
            .check_args(&json!({"title": "a"}))
            .unwrap_err()
            .contains("content"));
        assert!(schema
            .check_args(&json!({"title": 3, "content": "b"}))
            .unwrap_err()
            .contains("string"));
        assert!(schema.check_args(&json!("nope")).is_err());
    }
}
