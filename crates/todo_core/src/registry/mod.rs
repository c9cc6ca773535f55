//! Startup-time function registration table.
//!
//! # Responsibility
//! - Map webhook names, `(collection, mutation)` events, schedule names,
//!   executable names and assistant-callable function names to handlers.
//! - Reject invalid or duplicate registrations.
//!
//! # Invariants
//! - Names match `[A-Za-z0-9_-]+` and are unique within their kind.
//! - Handlers are plain functions; all state reaches them through
//!   [`BackendContext`].

pub mod todo_functions;

use crate::ai::{AiFunctionSchema, AssistantError};
use crate::context::BackendContext;
use crate::service::todo_service::ServiceError;
use crate::trigger::{MutationType, TriggerRequest};
use crate::webhook::{WebhookRequest, WebhookResponse};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

pub type FunctionResult<T> = Result<T, FunctionError>;

pub type WebhookHandler = fn(&BackendContext<'_>, &WebhookRequest) -> WebhookResponse;
pub type TriggerHandler = fn(&BackendContext<'_>, &TriggerRequest) -> FunctionResult<()>;
pub type ScheduledHandler = fn(&BackendContext<'_>) -> FunctionResult<()>;
pub type ExecutableHandler = fn(&BackendContext<'_>, &Value) -> FunctionResult<Value>;
pub type AiFunctionHandler = fn(&BackendContext<'_>, &Value) -> FunctionResult<String>;

/// Failure of a registered function.
#[derive(Debug)]
pub enum FunctionError {
    Service(ServiceError),
    Assistant(AssistantError),
    /// No assistant runtime is configured for this backend.
    AssistantUnavailable,
    InvalidArguments(String),
    UnknownFunction { kind: FunctionKind, name: String },
}

impl Display for FunctionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service(err) => write!(f, "{err}"),
            Self::Assistant(err) => write!(f, "{err}"),
            Self::AssistantUnavailable => write!(f, "AI assistant is not configured"),
            Self::InvalidArguments(message) => write!(f, "invalid arguments: {message}"),
            Self::UnknownFunction { kind, name } => {
                write!(f, "unknown {} `{name}`", kind.as_str())
            }
        }
    }
}

impl Error for FunctionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Service(err) => Some(err),
            Self::Assistant(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for FunctionError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<AssistantError> for FunctionError {
    fn from(value: AssistantError) -> Self {
        Self::Assistant(value)
    }
}

impl From<crate::repo::todo_repo::RepoError> for FunctionError {
    fn from(value: crate::repo::todo_repo::RepoError) -> Self {
        Self::Service(value.into())
    }
}

/// Kind of registered function, used in listings and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FunctionKind {
    Webhook,
    Trigger,
    Schedule,
    Executable,
    AiFunction,
}

impl FunctionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Trigger => "trigger",
            Self::Schedule => "schedule",
            Self::Executable => "executable",
            Self::AiFunction => "ai_function",
        }
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName { kind: FunctionKind, name: String },
    DuplicateName { kind: FunctionKind, name: String },
    /// Schedules need a non-zero cadence.
    ZeroInterval(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { kind, name } => {
                write!(f, "{} name is invalid: `{name}`", kind.as_str())
            }
            Self::DuplicateName { kind, name } => {
                write!(f, "{} already registered: `{name}`", kind.as_str())
            }
            Self::ZeroInterval(name) => write!(f, "schedule `{name}` has a zero interval"),
        }
    }
}

impl Error for RegistryError {}

/// One update/insert/delete trigger bound to a collection.
#[derive(Clone)]
pub struct TriggerRegistration {
    pub name: String,
    pub collection: String,
    pub mutation: MutationType,
    pub handler: TriggerHandler,
}

/// One fixed-cadence job.
#[derive(Clone)]
pub struct ScheduleRegistration {
    pub name: String,
    pub every: Duration,
    pub handler: ScheduledHandler,
}

/// One assistant-callable function with its parameter schema.
#[derive(Clone)]
pub struct AiFunctionRegistration {
    pub schema: AiFunctionSchema,
    pub handler: AiFunctionHandler,
}

/// Handler table populated once at startup.
#[derive(Default)]
pub struct FunctionRegistry {
    webhooks: BTreeMap<String, WebhookHandler>,
    triggers: Vec<TriggerRegistration>,
    schedules: BTreeMap<String, ScheduleRegistration>,
    executables: BTreeMap<String, ExecutableHandler>,
    ai_functions: BTreeMap<String, AiFunctionRegistration>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry with every todo backend function.
    pub fn with_todo_functions() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        todo_functions::register_todo_functions(&mut registry)?;
        Ok(registry)
    }

    pub fn register_webhook(
        &mut self,
        name: &str,
        handler: WebhookHandler,
    ) -> Result<(), RegistryError> {
        let name = checked_name(FunctionKind::Webhook, name)?;
        ensure_vacant(FunctionKind::Webhook, &name, self.webhooks.contains_key(&name))?;
        self.webhooks.insert(name, handler);
        Ok(())
    }

    pub fn register_trigger(
        &mut self,
        name: &str,
        collection: &str,
        mutation: MutationType,
        handler: TriggerHandler,
    ) -> Result<(), RegistryError> {
        let name = checked_name(FunctionKind::Trigger, name)?;
        let collection = checked_name(FunctionKind::Trigger, collection)?;
        let taken = self.triggers.iter().any(|trigger| trigger.name == name);
        ensure_vacant(FunctionKind::Trigger, &name, taken)?;
        self.triggers.push(TriggerRegistration {
            name,
            collection,
            mutation,
            handler,
        });
        Ok(())
    }

    pub fn register_schedule(
        &mut self,
        name: &str,
        every: Duration,
        handler: ScheduledHandler,
    ) -> Result<(), RegistryError> {
        let name = checked_name(FunctionKind::Schedule, name)?;
        if every.is_zero() {
            return Err(RegistryError::ZeroInterval(name));
        }
        ensure_vacant(FunctionKind::Schedule, &name, self.schedules.contains_key(&name))?;
        self.schedules.insert(
            name.clone(),
            ScheduleRegistration {
                name,
                every,
                handler,
            },
        );
        Ok(())
    }

    pub fn register_executable(
        &mut self,
        name: &str,
        handler: ExecutableHandler,
    ) -> Result<(), RegistryError> {
        let name = checked_name(FunctionKind::Executable, name)?;
        ensure_vacant(
            FunctionKind::Executable,
            &name,
            self.executables.contains_key(&name),
        )?;
        self.executables.insert(name, handler);
        Ok(())
    }

    pub fn register_ai_function(
        &mut self,
        schema: AiFunctionSchema,
        handler: AiFunctionHandler,
    ) -> Result<(), RegistryError> {
        let name = checked_name(FunctionKind::AiFunction, &schema.name)?;
        ensure_vacant(
            FunctionKind::AiFunction,
            &name,
            self.ai_functions.contains_key(&name),
        )?;
        self.ai_functions
            .insert(name, AiFunctionRegistration { schema, handler });
        Ok(())
    }

    pub fn webhook(&self, name: &str) -> Option<WebhookHandler> {
        self.webhooks.get(name.trim()).copied()
    }

    /// Returns triggers bound to `collection` for `mutation`, in registration order.
    pub fn triggers_for<'a>(
        &'a self,
        collection: &'a str,
        mutation: MutationType,
    ) -> impl Iterator<Item = &'a TriggerRegistration> + 'a {
        self.triggers
            .iter()
            .filter(move |trigger| trigger.collection == collection && trigger.mutation == mutation)
    }

    pub fn schedule(&self, name: &str) -> Option<&ScheduleRegistration> {
        self.schedules.get(name.trim())
    }

    pub fn schedules(&self) -> impl Iterator<Item = &ScheduleRegistration> {
        self.schedules.values()
    }

    pub fn executable(&self, name: &str) -> Option<ExecutableHandler> {
        self.executables.get(name.trim()).copied()
    }

    pub fn ai_function(&self, name: &str) -> Option<&AiFunctionRegistration> {
        self.ai_functions.get(name.trim())
    }

    /// Returns every registration as `(kind, name)`, sorted by kind then name.
    pub fn function_names(&self) -> Vec<(FunctionKind, String)> {
        let mut names: Vec<(FunctionKind, String)> = Vec::new();
        names.extend(
            self.webhooks
                .keys()
                .map(|name| (FunctionKind::Webhook, name.clone())),
        );
        names.extend(
            self.triggers
                .iter()
                .map(|trigger| (FunctionKind::Trigger, trigger.name.clone())),
        );
        names.extend(
            self.schedules
                .keys()
                .map(|name| (FunctionKind::Schedule, name.clone())),
        );
        names.extend(
            self.executables
                .keys()
                .map(|name| (FunctionKind::Executable, name.clone())),
        );
        names.extend(
            self.ai_functions
                .keys()
                .map(|name| (FunctionKind::AiFunction, name.clone())),
        );
        names.sort();
        names
    }
}

impl Debug for FunctionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.function_names())
            .finish()
    }
}

fn checked_name(kind: FunctionKind, value: &str) -> Result<String, RegistryError> {
    let name = value.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(RegistryError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

fn ensure_vacant(kind: FunctionKind, name: &str, taken: bool) -> Result<(), RegistryError> {
    if taken {
        return Err(RegistryError::DuplicateName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{FunctionKind, FunctionRegistry, RegistryError};
    use crate::context::BackendContext;
    use crate::webhook::{WebhookRequest, WebhookResponse};
    use std::time::Duration;

    fn noop_webhook(_: &BackendContext<'_>, _: &WebhookRequest) -> WebhookResponse {
        WebhookResponse::text("ok", 200)
    }

    fn noop_schedule(_: &BackendContext<'_>) -> super::FunctionResult<()> {
        Ok(())
    }

    #[test]
    fn rejects_duplicate_and_invalid_names() {
        let mut registry = FunctionRegistry::new();
        registry.register_webhook("ping", noop_webhook).unwrap();

        assert_eq!(
            registry.register_webhook(" ping ", noop_webhook),
            Err(RegistryError::DuplicateName {
                kind: FunctionKind::Webhook,
                name: "ping".to_string()
            })
        );
        assert!(matches!(
            registry.register_webhook("has space", noop_webhook),
            Err(RegistryError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register_webhook("", noop_webhook),
            Err(RegistryError::InvalidName { .. })
        ));
    }

    #[test]
    fn rejects_zero_interval_schedule() {
        let mut registry = FunctionRegistry::new();
        assert_eq!(
            registry.register_schedule("tick", Duration::ZERO, noop_schedule),
            Err(RegistryError::ZeroInterval("tick".to_string()))
        );
    }

    #[test]
    fn same_name_may_be_used_across_kinds() {
        let mut registry = FunctionRegistry::new();
        registry.register_webhook("sweep", noop_webhook).unwrap();
        registry
            .register_schedule("sweep", Duration::from_secs(1), noop_schedule)
            .unwrap();
        assert_eq!(registry.function_names().len(), 2);
    }

    #[test]
    fn todo_functions_register_every_entry_point() {
        let registry = FunctionRegistry::with_todo_functions().unwrap();
        for name in [
            "createTodo",
            "getTodos",
            "getTodoById",
            "updateTodo",
            "toggleTodo",
            "deleteTodo",
            "createTodoWithAI",
        ] {
            assert!(registry.webhook(name).is_some(), "missing webhook {name}");
        }
        assert!(registry.executable("cleanTodos").is_some());
        assert!(registry.executable("createTodosWithAI").is_some());
        assert!(registry.ai_function("createTodoFromAssistant").is_some());

        let schedule = registry.schedule("cleanTodosOnSchedule").unwrap();
        assert_eq!(schedule.every, Duration::from_secs(10));

        let triggers: Vec<_> = registry
            .triggers_for("todos", crate::trigger::MutationType::Update)
            .collect();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].name, "onUpdateTodo");
    }
}
