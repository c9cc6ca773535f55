//! Backend facade tying repository, clock, registry and assistant together.
//!
//! # Responsibility
//! - Build a [`BackendContext`] per call over a trigger-dispatching repository.
//! - Route webhook, executable and schedule invocations by registered name.

use crate::ai::AssistantRuntime;
use crate::clock::Clock;
use crate::context::BackendContext;
use crate::registry::{FunctionError, FunctionKind, FunctionRegistry, FunctionResult, RegistryError};
use crate::repo::todo_repo::TodoRepository;
use crate::service::todo_service::TodoService;
use crate::trigger::TriggeredTodoRepository;
use crate::webhook::{WebhookRequest, WebhookResponse};
use log::{info, warn};
use serde_json::Value;
use std::time::Instant;

/// Owns the collaborators of one todo backend instance.
pub struct TodoBackend<R: TodoRepository, C: Clock> {
    repo: R,
    clock: C,
    registry: FunctionRegistry,
    assistant: Option<Box<dyn AssistantRuntime>>,
}

impl<R: TodoRepository, C: Clock> TodoBackend<R, C> {
    /// Creates a backend with every todo function registered.
    pub fn new(repo: R, clock: C) -> Result<Self, RegistryError> {
        Ok(Self::with_registry(
            repo,
            clock,
            FunctionRegistry::with_todo_functions()?,
        ))
    }

    pub fn with_registry(repo: R, clock: C, registry: FunctionRegistry) -> Self {
        Self {
            repo,
            clock,
            registry,
            assistant: None,
        }
    }

    pub fn with_assistant(mut self, assistant: Box<dyn AssistantRuntime>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Lifecycle service whose writes fire registered triggers.
    pub fn todos(&self) -> TodoService<TriggeredTodoRepository<'_, &R>, &C> {
        TodoService::new(self.triggered_repo(), &self.clock)
    }

    /// Invokes a webhook by name. Unknown names yield a 404 response.
    pub fn call_webhook(&self, name: &str, request: &WebhookRequest) -> WebhookResponse {
        let Some(handler) = self.registry.webhook(name) else {
            warn!("event=webhook_call module=backend status=error webhook={name} error_code=unknown_webhook");
            return WebhookResponse::text(format!("Unknown webhook {name}"), 404);
        };

        let started_at = Instant::now();
        let response = self.with_context(|ctx| handler(ctx, request));
        info!(
            "event=webhook_call module=backend status={} webhook={name} status_code={} duration_ms={}",
            if response.is_success() { "ok" } else { "rejected" },
            response.status_code,
            started_at.elapsed().as_millis()
        );
        response
    }

    /// Invokes an executable by name with JSON arguments.
    pub fn call_executable(&self, name: &str, args: &Value) -> FunctionResult<Value> {
        let handler = self
            .registry
            .executable(name)
            .ok_or_else(|| FunctionError::UnknownFunction {
                kind: FunctionKind::Executable,
                name: name.to_string(),
            })?;
        self.with_context(|ctx| handler(ctx, args))
    }

    /// Runs one registered schedule once.
    pub fn run_schedule(&self, name: &str) -> FunctionResult<()> {
        let schedule = self
            .registry
            .schedule(name)
            .ok_or_else(|| FunctionError::UnknownFunction {
                kind: FunctionKind::Schedule,
                name: name.to_string(),
            })?;
        let handler = schedule.handler;
        self.with_context(|ctx| handler(ctx))
    }

    fn triggered_repo(&self) -> TriggeredTodoRepository<'_, &R> {
        TriggeredTodoRepository::new(
            &self.repo,
            &self.registry,
            &self.clock,
            self.assistant.as_deref(),
        )
    }

    fn with_context<T>(&self, call: impl FnOnce(&BackendContext<'_>) -> T) -> T {
        let repo = self.triggered_repo();
        let ctx = BackendContext {
            repo: &repo,
            clock: &self.clock,
            registry: &self.registry,
            assistant: self.assistant.as_deref(),
        };
        call(&ctx)
    }
}
