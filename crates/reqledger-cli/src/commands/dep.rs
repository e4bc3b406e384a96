use crate::cli::DepCommands;
use crate::support::{Settings, joined_or_none, run_and_render, string_list, text_field};
use reqledger_transport::DispatchMode;
use serde_json::{Value, json};

pub fn run(command: DepCommands, settings: &Settings) {
    match command {
        DepCommands::Set { from, to, json } => {
            let summary = joined_or_none(&to);
            run_and_render(
                settings,
                "CreateDependent",
                json!({ "fromId": from, "toIds": to }),
                DispatchMode::Submit,
                json,
                |asset| print_linked(&from, &summary, asset),
            )
        }

        DepCommands::Link { from, to, json } => run_and_render(
            settings,
            "LinkDependent",
            json!({ "fromId": from, "toId": to }),
            DispatchMode::Submit,
            json,
            |asset| print_linked(&from, &to, asset),
        ),

        DepCommands::Trace { root, json } => run_and_render(
            settings,
            "TraceDependencies",
            json!({ "rootId": root }),
            DispatchMode::Evaluate,
            json,
            print_trace,
        ),
    }
}

fn print_linked(from: &str, targets: &str, asset: &Value) {
    println!("reqledger dep");
    println!("  Linked: {from} -> {targets}");
    println!("  Dependency set: {}", text_field(asset, "depid"));
}

fn print_trace(trace: &Value) {
    println!("{}", text_field(trace, "root"));
    if let Some(edges) = trace.get("edges").and_then(Value::as_array) {
        for edge in edges {
            println!(
                "  {} -> {}",
                text_field(edge, "from"),
                text_field(edge, "to")
            );
        }
    }
    println!(
        "  visited: {}",
        joined_or_none(&string_list(trace, "visited"))
    );
    println!(
        "  dangling: {}",
        joined_or_none(&string_list(trace, "dangling"))
    );
}
