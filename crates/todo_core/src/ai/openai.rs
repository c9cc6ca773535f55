//! OpenAI-compatible assistant runtime.
//!
//! Assistants and threads live in process memory; each query posts the
//! thread history to `{base_url}/chat/completions` with the assistant's
//! functions declared as tools, runs requested tool calls through the
//! invoker, and repeats until the model answers without tool calls.

use super::{AiFunctionSchema, AssistantError, AssistantResult, AssistantRuntime, FunctionInvoker};
use log::debug;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on tool-call rounds within one query.
pub const MAX_TOOL_ROUNDS: usize = 8;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

struct AssistantRecord {
    instructions: String,
    tools: Vec<Value>,
}

struct ThreadRecord {
    assistant_id: String,
    messages: Vec<Value>,
}

#[derive(Default)]
struct RuntimeState {
    assistants: BTreeMap<String, AssistantRecord>,
    threads: BTreeMap<String, ThreadRecord>,
}

/// Assistant runtime backed by an OpenAI-compatible chat completions API.
pub struct OpenAiAssistantRuntime {
    base_url: String,
    api_key: String,
    model: String,
    agent: ureq::Agent,
    state: Mutex<RuntimeState>,
}

impl OpenAiAssistantRuntime {
    /// - `base_url`: API root including the version segment,
    ///   e.g. `https://api.openai.com/v1`.
    /// - `api_key`: bearer token; empty disables the header.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            state: Mutex::new(RuntimeState::default()),
        }
    }

    fn lock_state(&self) -> AssistantResult<std::sync::MutexGuard<'_, RuntimeState>> {
        self.state
            .lock()
            .map_err(|_| AssistantError::Protocol("runtime state lock poisoned".to_string()))
    }

    fn post_chat(&self, body: &Value) -> AssistantResult<Value> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self.agent.post(&url).set("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            request = request.set("Authorization", &format!("Bearer {}", self.api_key));
        }

        let response = match request.send_string(&body.to_string()) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Err(AssistantError::Transport(format!("HTTP {code}: {detail}")));
            }
            Err(err) => return Err(AssistantError::Transport(err.to_string())),
        };
        let text = response
            .into_string()
            .map_err(|err| AssistantError::Transport(err.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|err| AssistantError::Protocol(format!("invalid JSON reply: {err}")))
    }
}

impl AssistantRuntime for OpenAiAssistantRuntime {
    fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        functions: &[AiFunctionSchema],
    ) -> AssistantResult<String> {
        let id = format!("asst_{}", Uuid::new_v4().simple());
        let record = AssistantRecord {
            instructions: instructions.to_string(),
            tools: functions.iter().map(tool_definition).collect(),
        };
        self.lock_state()?.assistants.insert(id.clone(), record);
        debug!("event=ai_assistant_create module=ai status=ok name={name} assistant_id={id}");
        Ok(id)
    }

    fn create_thread(&self, assistant_id: &str) -> AssistantResult<String> {
        let mut state = self.lock_state()?;
        if !state.assistants.contains_key(assistant_id) {
            return Err(AssistantError::UnknownAssistant(assistant_id.to_string()));
        }
        let id = format!("thread_{}", Uuid::new_v4().simple());
        state.threads.insert(
            id.clone(),
            ThreadRecord {
                assistant_id: assistant_id.to_string(),
                messages: Vec::new(),
            },
        );
        Ok(id)
    }

    fn query_assistant(
        &self,
        assistant_id: &str,
        thread_id: &str,
        prompt: &str,
        invoker: &dyn FunctionInvoker,
    ) -> AssistantResult<String> {
        // Copy what the request needs so the lock is not held across HTTP calls.
        let (instructions, tools, mut messages) = {
            let state = self.lock_state()?;
            let assistant = state
                .assistants
                .get(assistant_id)
                .ok_or_else(|| AssistantError::UnknownAssistant(assistant_id.to_string()))?;
            let thread = state
                .threads
                .get(thread_id)
                .filter(|thread| thread.assistant_id == assistant_id)
                .ok_or_else(|| AssistantError::UnknownThread(thread_id.to_string()))?;
            (
                assistant.instructions.clone(),
                assistant.tools.clone(),
                thread.messages.clone(),
            )
        };
        messages.push(json!({"role": "user", "content": prompt}));

        let mut outcome = Err(AssistantError::TooManyRounds(MAX_TOOL_ROUNDS));
        for round in 0..MAX_TOOL_ROUNDS {
            let body = chat_request_body(&self.model, &instructions, &messages, &tools);
            let message = first_choice_message(&self.post_chat(&body)?)?;
            let calls = tool_calls(&message)?;
            messages.push(message.clone());

            if calls.is_empty() {
                outcome = Ok(message
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string());
                break;
            }

            debug!(
                "event=ai_tool_round module=ai status=ok round={round} calls={}",
                calls.len()
            );
            for call in calls {
                let content = match invoker.invoke(&call.name, &call.arguments) {
                    Ok(text) => text,
                    Err(err) => format!("error: {err}"),
                };
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": content,
                }));
            }
        }

        if let Some(thread) = self.lock_state()?.threads.get_mut(thread_id) {
            thread.messages = messages;
        }
        outcome
    }

    fn delete_thread(&self, thread_id: &str) -> AssistantResult<()> {
        self.lock_state()?
            .threads
            .remove(thread_id)
            .map(|_| ())
            .ok_or_else(|| AssistantError::UnknownThread(thread_id.to_string()))
    }

    fn delete_assistant(&self, assistant_id: &str) -> AssistantResult<()> {
        let mut state = self.lock_state()?;
        state
            .assistants
            .remove(assistant_id)
            .ok_or_else(|| AssistantError::UnknownAssistant(assistant_id.to_string()))?;
        state
            .threads
            .retain(|_, thread| thread.assistant_id != assistant_id);
        Ok(())
    }
}

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
struct ToolCall {
    id: String,
    name: String,
    arguments: Value,
}

fn tool_definition(schema: &AiFunctionSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": schema.name,
            "description": schema.description,
            "parameters": schema.parameters_json_schema(),
        }
    })
}

fn chat_request_body(model: &str, instructions: &str, messages: &[Value], tools: &[Value]) -> Value {
    let mut all_messages = Vec::with_capacity(messages.len() + 1);
    all_messages.push(json!({"role": "system", "content": instructions}));
    all_messages.extend(messages.iter().cloned());

    let mut body = json!({
        "model": model,
        "messages": all_messages,
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.to_vec());
    }
    body
}

fn first_choice_message(reply: &Value) -> AssistantResult<Value> {
    reply
        .pointer("/choices/0/message")
        .cloned()
        .ok_or_else(|| AssistantError::Protocol("reply has no choices[0].message".to_string()))
}

fn tool_calls(message: &Value) -> AssistantResult<Vec<ToolCall>> {
    let Some(calls) = message.get("tool_calls").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    calls
        .iter()
        .map(|call| {
            let id = call.get("id").and_then(Value::as_str);
            let name = call.pointer("/function/name").and_then(Value::as_str);
            let (Some(id), Some(name)) = (id, name) else {
                return Err(AssistantError::Protocol(format!(
                    "malformed tool call: {call}"
                )));
            };
            // Arguments arrive as a JSON-encoded string.
            let arguments = match call.pointer("/function/arguments") {
                Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or(Value::Null),
                Some(other) => other.clone(),
                None => Value::Null,
            };
            Ok(ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{chat_request_body, first_choice_message, tool_calls, tool_definition};
    use crate::ai::create_todo_schema;
    use serde_json::json;

    #[test]
    fn request_body_puts_instructions_first_and_declares_tools() {
        let tools = vec![tool_definition(&create_todo_schema())];
        let messages = vec![json!({"role": "user", "content": "plan a party"})];
        let body = chat_request_body("gpt-test", "be brief", &messages, &tools);

        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["content"], "plan a party");
        assert_eq!(
            body["tools"][0]["function"]["name"],
            "createTodoFromAssistant"
        );
    }

    #[test]
    fn request_body_omits_empty_tool_list() {
        let body = chat_request_body("m", "i", &[], &[]);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn parses_tool_calls_with_string_arguments() {
        let reply = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "createTodoFromAssistant",
                            "arguments": "{\"title\":\"Book venue\",\"content\":\"Call two places\"}"
                        }
                    }]
                }
            }]
        });
        let message = first_choice_message(&reply).unwrap();
        let calls = tool_calls(&message).unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arguments["title"], "Book venue");
    }

    #[test]
    fn final_message_has_no_tool_calls() {
        let message = json!({"role": "assistant", "content": "All set."});
        assert!(tool_calls(&message).unwrap().is_empty());
    }

    #[test]
    fn reply_without_choices_is_a_protocol_error() {
        assert!(first_choice_message(&json!({"error": "boom"})).is_err());
    }
}
