//! Command-line host for the todo backend.
//!
//! # Responsibility
//! - Load configuration from the environment and start logging.
//! - Route one command to a registered webhook, executable or schedule.
//! - Keep output deterministic: status line first, payload second.

use log::{error, info};
use serde_json::Value;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use todo_core::{
    init_logging, init_stderr_logging, open_db, spawn_interval, AssistantConfig, AssistantRuntime,
    BackendConfig, FunctionRegistry, IntervalHandle, OpenAiAssistantRuntime, SqliteTodoRepository,
    SystemClock, TodoBackend, WebhookRequest,
};

const USAGE: &str = "usage:
  todo_cli webhook <name> [key=value ...]
  todo_cli exec <name> [json-args]
  todo_cli scheduler [--for-secs N]
  todo_cli functions
  todo_cli version";

fn main() -> ExitCode {
    let config = BackendConfig::from_env();
    if let Err(err) = start_logging(&config) {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&config, &args) {
        Ok(code) => code,
        Err(message) => {
            error!("event=cli_command module=cli status=error error={message}");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(config: &BackendConfig) -> Result<(), String> {
    match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(&config.log_level),
    }
}

fn run(config: &BackendConfig, args: &[String]) -> Result<ExitCode, String> {
    let Some((command, rest)) = args.split_first() else {
        return Err(USAGE.to_string());
    };

    match command.as_str() {
        "webhook" => call_webhook(config, rest),
        "exec" => call_executable(config, rest),
        "scheduler" => run_scheduler(config, rest),
        "functions" => list_functions(),
        "version" => {
            println!("todo_core version={}", todo_core::core_version());
            Ok(ExitCode::SUCCESS)
        }
        other => Err(format!("unknown command `{other}`\n{USAGE}")),
    }
}

fn call_webhook(config: &BackendConfig, args: &[String]) -> Result<ExitCode, String> {
    let (name, params) = args
        .split_first()
        .ok_or_else(|| format!("missing webhook name\n{USAGE}"))?;
    let request = params
        .iter()
        .map(|pair| parse_param(pair))
        .collect::<Result<WebhookRequest, String>>()?;

    let conn = open_db(&config.db_path).map_err(|err| format!("failed to open database: {err}"))?;
    let backend = build_backend(SqliteTodoRepository::new(&conn), config)?;
    let response = backend.call_webhook(name, &request);

    println!("status={}", response.status_code);
    println!("{}", response.message);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn call_executable(config: &BackendConfig, args: &[String]) -> Result<ExitCode, String> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| format!("missing executable name\n{USAGE}"))?;
    let arguments = match rest.first() {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|err| format!("arguments must be JSON: {err}"))?,
        None => Value::Null,
    };

    let conn = open_db(&config.db_path).map_err(|err| format!("failed to open database: {err}"))?;
    let backend = build_backend(SqliteTodoRepository::new(&conn), config)?;
    let output = backend
        .call_executable(name, &arguments)
        .map_err(|err| format!("executable `{name}` failed: {err}"))?;

    println!("{output}");
    Ok(ExitCode::SUCCESS)
}

fn run_scheduler(config: &BackendConfig, args: &[String]) -> Result<ExitCode, String> {
    let run_for = parse_run_for(args)?;
    let registry =
        FunctionRegistry::with_todo_functions().map_err(|err| format!("registry: {err}"))?;

    let mut handles: Vec<IntervalHandle> = Vec::new();
    for schedule in registry.schedules() {
        let name = schedule.name.clone();
        let job_config = config.clone();
        // Each schedule thread owns its connection.
        let conn = open_db(&config.db_path)
            .map_err(|err| format!("failed to open database for `{name}`: {err}"))?;
        let job_name = name.clone();
        let handle = spawn_interval(name.clone(), schedule.every, move || {
            let result = build_backend(SqliteTodoRepository::new(&conn), &job_config)
                .and_then(|backend| {
                    backend
                        .run_schedule(&job_name)
                        .map_err(|err| err.to_string())
                });
            if let Err(err) = result {
                error!(
                    "event=schedule_run module=cli status=error schedule={job_name} error={err}"
                );
            }
        })
        .map_err(|err| format!("failed to start schedule `{name}`: {err}"))?;
        handles.push(handle);
    }

    info!(
        "event=scheduler_start module=cli status=ok schedules={}",
        handles.len()
    );
    println!("scheduler running schedules={}", handles.len());

    match run_for {
        Some(duration) => {
            thread::sleep(duration);
            for handle in handles {
                handle.stop();
            }
            info!("event=scheduler_stop module=cli status=ok");
        }
        None => {
            for handle in handles {
                handle.wait();
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn list_functions() -> Result<ExitCode, String> {
    let registry =
        FunctionRegistry::with_todo_functions().map_err(|err| format!("registry: {err}"))?;
    for (kind, name) in registry.function_names() {
        println!("{}\t{name}", kind.as_str());
    }
    Ok(ExitCode::SUCCESS)
}

fn build_backend<'conn>(
    repo: SqliteTodoRepository<'conn>,
    config: &BackendConfig,
) -> Result<TodoBackend<SqliteTodoRepository<'conn>, SystemClock>, String> {
    let backend = TodoBackend::new(repo, SystemClock).map_err(|err| format!("registry: {err}"))?;
    Ok(match &config.assistant {
        Some(assistant) => backend.with_assistant(assistant_runtime(assistant)),
        None => backend,
    })
}

fn assistant_runtime(config: &AssistantConfig) -> Box<dyn AssistantRuntime> {
    Box::new(OpenAiAssistantRuntime::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
    ))
}

fn parse_param(pair: &str) -> Result<(String, String), String> {
    pair.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("webhook parameter must be key=value, got `{pair}`"))
}

fn parse_run_for(args: &[String]) -> Result<Option<Duration>, String> {
    match args {
        [] => Ok(None),
        [flag, secs] if flag == "--for-secs" => secs
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| format!("--for-secs expects a whole number, got `{secs}`")),
        _ => Err(format!("unexpected scheduler arguments\n{USAGE}")),
    }
}
