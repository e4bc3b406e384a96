use crate::cli::AssetCommands;
use crate::support::{
    Settings, joined_or_none, owner_payload, run_and_render, string_list, text_field,
};
use reqledger_transport::DispatchMode;
use serde_json::{Value, json};

pub fn run(command: AssetCommands, settings: &Settings) {
    match command {
        AssetCommands::New {
            id,
            text,
            first_name,
            last_name,
            json,
        } => run_and_render(
            settings,
            "NewAsset",
            json!({
                "id": id,
                "owner": owner_payload(&first_name, &last_name),
                "text": text,
            }),
            DispatchMode::Submit,
            json,
            |_| println!("reqledger asset new\n  Created: {id}"),
        ),

        AssetCommands::Share {
            id,
            first_name,
            last_name,
            json,
        } => run_and_render(
            settings,
            "ShareAsset",
            json!({
                "assetId": id,
                "owner": owner_payload(&first_name, &last_name),
            }),
            DispatchMode::Submit,
            json,
            |output| {
                println!("reqledger asset share");
                println!("  Shared: {id} -> {first_name} {last_name}");
                println!(
                    "  Dependents: {}",
                    joined_or_none(&string_list(output, "dependents"))
                );
            },
        ),

        AssetCommands::ShareBulk {
            ids,
            first_name,
            last_name,
            json,
        } => run_and_render(
            settings,
            "ShareAssetsBulk",
            json!({
                "assetIds": ids,
                "owner": owner_payload(&first_name, &last_name),
            }),
            DispatchMode::Submit,
            json,
            |output| {
                let shared = string_list(output, "shared");
                println!("reqledger asset share-bulk");
                println!("  Shared {} asset(s): {}", shared.len(), joined_or_none(&shared));
            },
        ),

        AssetCommands::Update { id, text, json } => run_and_render(
            settings,
            "UpdateValue",
            json!({ "id": id, "text": text }),
            DispatchMode::Submit,
            json,
            |_| println!("reqledger asset update\n  Updated content of {id}"),
        ),

        AssetCommands::Read { id, json } => run_and_render(
            settings,
            "ReadAsset",
            json!({ "id": id }),
            DispatchMode::Submit,
            json,
            print_asset,
        ),

        AssetCommands::Get { id, json } => run_and_render(
            settings,
            "GetAsset",
            json!({ "id": id }),
            DispatchMode::Evaluate,
            json,
            print_asset,
        ),

        AssetCommands::Content { id, json } => run_and_render(
            settings,
            "GetContent",
            json!({ "id": id }),
            DispatchMode::Evaluate,
            json,
            |output| println!("{}", text_field(output, "text")),
        ),
    }
}

fn print_asset(asset: &Value) {
    let owner = asset.get("owner").cloned().unwrap_or(Value::Null);
    println!("{}", text_field(asset, "id"));
    println!(
        "  owner: {} {}",
        text_field(&owner, "firstname"),
        text_field(&owner, "lastname")
    );
    println!("  status: {}", text_field(asset, "status"));
    println!("  created: {}", text_field(asset, "createtime"));
    println!("  shared: {}", or_dash(text_field(asset, "sharetime")));
    println!("  accessed: {}", or_dash(text_field(asset, "accesstime")));
    println!("  content: {}", text_field(asset, "contentid"));
    println!("  dependencies: {}", text_field(asset, "depid"));
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
