use crate::support::{Settings, exit_with_error, print_json_or_exit, run_operation};
use reqledger_transport::DispatchMode;
use serde_json::Value;

/// Raw dispatch: always prints the envelope; exits 1 when it is rejected.
pub fn run(operation: String, payload: String, evaluate: bool, settings: &Settings) {
    let payload: Value = serde_json::from_str(&payload)
        .unwrap_or_else(|e| exit_with_error(format!("invalid --payload json: {e}")));
    let mode = if evaluate {
        DispatchMode::Evaluate
    } else {
        DispatchMode::Submit
    };

    let envelope = run_operation(settings, &operation, payload, mode);
    print_json_or_exit(&envelope);
    if !envelope.is_accepted() {
        std::process::exit(1);
    }
}
