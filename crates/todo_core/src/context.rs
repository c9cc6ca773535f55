//! Explicit per-call context handed to every registered handler.

use crate::ai::AssistantRuntime;
use crate::clock::Clock;
use crate::registry::FunctionRegistry;
use crate::repo::todo_repo::TodoRepository;
use crate::service::todo_service::TodoService;

/// Collaborators available to a handler for the duration of one call.
///
/// `repo` dispatches update triggers, so writes made through it behave the
/// same as writes made by any other caller.
#[derive(Clone, Copy)]
pub struct BackendContext<'a> {
    pub repo: &'a dyn TodoRepository,
    pub clock: &'a dyn Clock,
    pub registry: &'a FunctionRegistry,
    pub assistant: Option<&'a dyn AssistantRuntime>,
}

impl<'a> BackendContext<'a> {
    /// Lifecycle service bound to this context's repository and clock.
    pub fn todos(&self) -> TodoService<&'a dyn TodoRepository, &'a dyn Clock> {
        TodoService::new(self.repo, self.clock)
    }
}
