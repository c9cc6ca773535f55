//! Runtime configuration from environment variables.
//!
//! | variable           | meaning                                     | default                     |
//! |--------------------|---------------------------------------------|-----------------------------|
//! | `TODO_DB_PATH`     | SQLite database file                        | `<temp>/todo_backend.sqlite3` |
//! | `TODO_LOG_LEVEL`   | trace, debug, info, warn or error          | build-mode default          |
//! | `TODO_LOG_DIR`     | absolute directory for rotating log files   | unset: log to stderr        |
//! | `TODO_AI_BASE_URL` | OpenAI-compatible API root                  | unset: no assistant         |
//! | `TODO_AI_API_KEY`  | bearer token for the assistant API          | empty                       |
//! | `TODO_AI_MODEL`    | model id sent with assistant requests       | `gpt-4o-mini`               |

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TODO_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TODO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODO_LOG_DIR";
pub const ENV_AI_BASE_URL: &str = "TODO_AI_BASE_URL";
pub const ENV_AI_API_KEY: &str = "TODO_AI_API_KEY";
pub const ENV_AI_MODEL: &str = "TODO_AI_MODEL";

const DEFAULT_DB_FILE_NAME: &str = "todo_backend.sqlite3";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Connection details for the assistant runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Process-level backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    /// `None` disables assistant-backed functions.
    pub assistant: Option<AssistantConfig>,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_level = read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        let assistant = read(ENV_AI_BASE_URL).map(|base_url| AssistantConfig {
            base_url,
            api_key: read(ENV_AI_API_KEY).unwrap_or_default(),
            model: read(ENV_AI_MODEL).unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
        });

        Self {
            db_path,
            log_level,
            log_dir,
            assistant,
        }
    }
}
