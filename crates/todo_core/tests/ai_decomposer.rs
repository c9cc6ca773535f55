use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use todo_core::ai::{
    AiFunctionSchema, AssistantResult, CREATE_TODO_FROM_ASSISTANT, TODO_CREATOR_NAME,
};
use todo_core::db::open_db_in_memory;
use todo_core::{
    AssistantError, AssistantRuntime, FunctionError, FunctionInvoker, ManualClock, ServiceError,
    SqliteTodoRepository, TodoBackend, TodoValidationError, WebhookRequest,
};

/// Records runtime calls so tests can check setup and cleanup.
#[derive(Default)]
struct Journal {
    created_assistants: Vec<(String, Vec<String>)>,
    prompts: Vec<String>,
    invoke_results: Vec<Result<String, String>>,
    deleted_threads: Vec<String>,
    deleted_assistants: Vec<String>,
}

/// Runtime that replays a fixed list of function calls.
struct ScriptedAssistant {
    calls: Vec<Value>,
    fail_query: bool,
    journal: Rc<RefCell<Journal>>,
}

impl ScriptedAssistant {
    fn new(calls: Vec<Value>, journal: Rc<RefCell<Journal>>) -> Self {
        Self {
            calls,
            fail_query: false,
            journal,
        }
    }

    fn failing(journal: Rc<RefCell<Journal>>) -> Self {
        Self::failing_after(Vec::new(), journal)
    }

    /// Replays `calls`, then fails the query.
    fn failing_after(calls: Vec<Value>, journal: Rc<RefCell<Journal>>) -> Self {
        Self {
            calls,
            fail_query: true,
            journal,
        }
    }
}

impl AssistantRuntime for ScriptedAssistant {
    fn create_assistant(
        &self,
        name: &str,
        _instructions: &str,
        functions: &[AiFunctionSchema],
    ) -> AssistantResult<String> {
        let names = functions.iter().map(|f| f.name.clone()).collect();
        self.journal
            .borrow_mut()
            .created_assistants
            .push((name.to_string(), names));
        Ok("asst_1".to_string())
    }

    fn create_thread(&self, _assistant_id: &str) -> AssistantResult<String> {
        Ok("thread_1".to_string())
    }

    fn query_assistant(
        &self,
        _assistant_id: &str,
        _thread_id: &str,
        prompt: &str,
        invoker: &dyn FunctionInvoker,
    ) -> AssistantResult<String> {
        self.journal.borrow_mut().prompts.push(prompt.to_string());
        for args in &self.calls {
            let result = invoker.invoke(CREATE_TODO_FROM_ASSISTANT, args);
            self.journal.borrow_mut().invoke_results.push(result);
        }
        if self.fail_query {
            return Err(AssistantError::Transport("connection reset".to_string()));
        }
        Ok("All set.".to_string())
    }

    fn delete_thread(&self, thread_id: &str) -> AssistantResult<()> {
        self.journal
            .borrow_mut()
            .deleted_threads
            .push(thread_id.to_string());
        Ok(())
    }

    fn delete_assistant(&self, assistant_id: &str) -> AssistantResult<()> {
        self.journal
            .borrow_mut()
            .deleted_assistants
            .push(assistant_id.to_string());
        Ok(())
    }
}

fn party_calls() -> Vec<Value> {
    vec![
        json!({"title": "Pick a date", "content": "Check calendars"}),
        json!({"title": "Send invites", "content": "Email the guest list"}),
        json!({"title": "Buy snacks", "content": "Chips and dip"}),
    ]
}

#[test]
fn webhook_creates_one_todo_per_assistant_call() {
    let conn = open_db_in_memory().unwrap();
    let journal = Rc::new(RefCell::new(Journal::default()));
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1))
        .unwrap()
        .with_assistant(Box::new(ScriptedAssistant::new(
            party_calls(),
            Rc::clone(&journal),
        )));

    let response = backend.call_webhook(
        "createTodoWithAI",
        &WebhookRequest::new().with_param("task", "Plan a party"),
    );

    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.text_message(),
        Some("Todo created with AI: 3 todos")
    );
    let titles: Vec<String> = backend
        .todos()
        .read_all()
        .unwrap()
        .into_iter()
        .map(|todo| todo.title)
        .collect();
    assert_eq!(titles.len(), 3);
    for expected in ["Pick a date", "Send invites", "Buy snacks"] {
        assert!(titles.iter().any(|title| title == expected));
    }

    let journal = journal.borrow();
    assert_eq!(
        journal.created_assistants,
        vec![(
            TODO_CREATOR_NAME.to_string(),
            vec![CREATE_TODO_FROM_ASSISTANT.to_string()]
        )]
    );
    assert!(journal.prompts[0].ends_with("Plan a party"));
    assert_eq!(journal.deleted_threads, vec!["thread_1".to_string()]);
    assert_eq!(journal.deleted_assistants, vec!["asst_1".to_string()]);
}

#[test]
fn invalid_assistant_arguments_are_reported_back_not_created() {
    let conn = open_db_in_memory().unwrap();
    let journal = Rc::new(RefCell::new(Journal::default()));
    let calls = vec![
        json!({"title": "Only a title"}),
        json!({"title": "Full", "content": "entry"}),
    ];
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1))
        .unwrap()
        .with_assistant(Box::new(ScriptedAssistant::new(calls, Rc::clone(&journal))));

    let output = backend
        .call_executable("createTodosWithAI", &json!({"task": "Tidy up"}))
        .unwrap();

    assert_eq!(output, json!({"created": 1}));
    assert_eq!(backend.todos().read_all().unwrap().len(), 1);
    let journal = journal.borrow();
    assert!(journal.invoke_results[0].is_err());
    assert!(journal.invoke_results[1].is_ok());
}

#[test]
fn failed_query_still_releases_thread_and_assistant() {
    let conn = open_db_in_memory().unwrap();
    let journal = Rc::new(RefCell::new(Journal::default()));
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1))
        .unwrap()
        .with_assistant(Box::new(ScriptedAssistant::failing(Rc::clone(&journal))));

    let response = backend.call_webhook(
        "createTodoWithAI",
        &WebhookRequest::new().with_param("task", "Plan a party"),
    );

    assert_eq!(response.status_code, 502);
    assert!(backend.todos().read_all().unwrap().is_empty());
    let journal = journal.borrow();
    assert_eq!(journal.deleted_threads.len(), 1);
    assert_eq!(journal.deleted_assistants.len(), 1);
}

#[test]
fn todos_created_before_a_failed_query_are_kept() {
    let conn = open_db_in_memory().unwrap();
    let journal = Rc::new(RefCell::new(Journal::default()));
    let calls = party_calls().into_iter().take(2).collect();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1))
        .unwrap()
        .with_assistant(Box::new(ScriptedAssistant::failing_after(
            calls,
            Rc::clone(&journal),
        )));

    let err = backend
        .call_executable("createTodosWithAI", &json!("Plan a party"))
        .unwrap_err();

    assert!(matches!(
        err,
        FunctionError::Assistant(AssistantError::Transport(_))
    ));
    assert_eq!(backend.todos().read_all().unwrap().len(), 2);
    let journal = journal.borrow();
    assert_eq!(journal.deleted_threads.len(), 1);
    assert_eq!(journal.deleted_assistants.len(), 1);
}

#[test]
fn blank_task_is_rejected_before_contacting_the_assistant() {
    let conn = open_db_in_memory().unwrap();
    let journal = Rc::new(RefCell::new(Journal::default()));
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1))
        .unwrap()
        .with_assistant(Box::new(ScriptedAssistant::new(
            party_calls(),
            Rc::clone(&journal),
        )));

    let err = backend
        .call_executable("createTodosWithAI", &json!("   "))
        .unwrap_err();

    assert!(matches!(
        err,
        FunctionError::Service(ServiceError::Validation(TodoValidationError::EmptyTask))
    ));
    assert!(journal.borrow().created_assistants.is_empty());
}

#[test]
fn executable_rejects_non_string_task() {
    let conn = open_db_in_memory().unwrap();
    let backend = TodoBackend::new(SqliteTodoRepository::new(&conn), ManualClock::new(1)).unwrap();

    let err = backend
        .call_executable("createTodosWithAI", &json!({"task": 42}))
        .unwrap_err();
    assert!(matches!(err, FunctionError::InvalidArguments(_)));
}
