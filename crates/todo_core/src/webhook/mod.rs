//! Webhook adapter: query parameters in, `{message, statusCode}` out.
//!
//! # Responsibility
//! - Translate request parameters into lifecycle calls.
//! - Translate lifecycle outcomes into status-coded responses.
//!
//! # Invariants
//! - Handlers never panic and never return an error past this boundary.
//! - Missing parameters map to 400, unknown ids to 404, storage failures to 500.

pub mod todos;

use crate::model::todo::TodoValidationError;
use crate::registry::FunctionError;
use crate::service::todo_service::ServiceError;
use log::error;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Incoming webhook call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookRequest {
    pub query_params: BTreeMap<String, String>,
}

impl WebhookRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter value, treating blank values as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query_params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WebhookRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            query_params: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Response payload: a confirmation text or requested data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebhookBody {
    Text(String),
    Json(Value),
}

impl Display for WebhookBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

/// Webhook result returned to the router.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub message: WebhookBody,
    pub status_code: u16,
}

impl WebhookResponse {
    pub fn text(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: WebhookBody::Text(message.into()),
            status_code,
        }
    }

    pub fn json(value: Value, status_code: u16) -> Self {
        Self {
            message: WebhookBody::Json(value),
            status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Text body, or `None` for JSON bodies.
    pub fn text_message(&self) -> Option<&str> {
        match &self.message {
            WebhookBody::Text(text) => Some(text.as_str()),
            WebhookBody::Json(_) => None,
        }
    }
}

/// Maps a lifecycle failure to its user-visible response.
pub fn service_error_response(err: &ServiceError) -> WebhookResponse {
    match err {
        ServiceError::NotFound(id) => {
            WebhookResponse::text(format!("Todo with ID {id} not found"), 404)
        }
        ServiceError::Validation(TodoValidationError::NothingToUpdate) => {
            WebhookResponse::text("No fields to update", 400)
        }
        ServiceError::Validation(TodoValidationError::InvalidDoneFlag(_)) => {
            WebhookResponse::text("Invalid request: done must be true or false", 400)
        }
        ServiceError::Validation(err) => {
            WebhookResponse::text(format!("Invalid request: {err}"), 400)
        }
        ServiceError::Repo(err) => {
            error!("event=webhook_call module=webhook status=error error={err}");
            WebhookResponse::text("Internal error", 500)
        }
    }
}

/// Maps a registered-function failure to its user-visible response.
pub fn function_error_response(err: &FunctionError) -> WebhookResponse {
    match err {
        FunctionError::Service(err) => service_error_response(err),
        FunctionError::AssistantUnavailable => {
            WebhookResponse::text("AI assistant not configured", 503)
        }
        FunctionError::Assistant(err) => {
            error!("event=webhook_call module=webhook status=error error={err}");
            WebhookResponse::text("AI assistant failed", 502)
        }
        FunctionError::InvalidArguments(message) => {
            WebhookResponse::text(format!("Invalid request: {message}"), 400)
        }
        FunctionError::UnknownFunction { name, .. } => {
            WebhookResponse::text(format!("Unknown function {name}"), 404)
        }
    }
}
