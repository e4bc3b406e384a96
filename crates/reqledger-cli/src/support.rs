use reqledger_ledger::{SystemClock, UuidIdSource};
use reqledger_transport::{
    DispatchMode, DispatchRequest, LedgerHost, OperationEnvelope, dispatch_on_host,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Resolved file locations for this run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ledger_path: PathBuf,
    pub events_path: PathBuf,
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn exit_with_error(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn print_json_or_exit<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => exit_with_error(format!("failed to render json: {e}")),
    }
}

pub fn owner_payload(first_name: &str, last_name: &str) -> Value {
    json!({ "firstname": first_name, "lastname": last_name })
}

/// One invocation against the configured ledger with the wall clock and
/// random record keys.
pub fn run_operation(
    settings: &Settings,
    operation: &str,
    payload: Value,
    mode: DispatchMode,
) -> OperationEnvelope {
    let clock = SystemClock;
    let mut ids = UuidIdSource;
    dispatch_on_host(
        LedgerHost {
            ledger_path: &settings.ledger_path,
            events_path: &settings.events_path,
        },
        &clock,
        &mut ids,
        DispatchRequest {
            operation: operation.to_string(),
            payload,
        },
        mode,
    )
}

/// Return the envelope's output, or report the rejection and exit 1.
///
/// Under `--json` a rejected envelope is still printed to stdout.
pub fn accepted_output_or_exit(envelope: OperationEnvelope, json_output: bool) -> Value {
    if envelope.is_accepted() {
        return envelope.output.unwrap_or(Value::Null);
    }
    if json_output {
        print_json_or_exit(&envelope);
    }
    exit_with_error(format!(
        "{}: {}",
        envelope.failure_class.as_deref().unwrap_or("rejected"),
        envelope.diagnostic.as_deref().unwrap_or("operation rejected")
    ))
}

/// Shared tail for subcommands: run, then print either the envelope or
/// the human rendering of its output.
pub fn run_and_render(
    settings: &Settings,
    operation: &str,
    payload: Value,
    mode: DispatchMode,
    json_output: bool,
    render: impl FnOnce(&Value),
) {
    let envelope = run_operation(settings, operation, payload, mode);
    if json_output && envelope.is_accepted() {
        print_json_or_exit(&envelope);
        return;
    }
    let output = accepted_output_or_exit(envelope, json_output);
    render(&output);
}

pub fn text_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn joined_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
