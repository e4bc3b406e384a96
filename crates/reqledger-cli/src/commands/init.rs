use crate::config::{Config, DEFAULT_CONFIG_PATH, DEFAULT_EVENTS_PATH, DEFAULT_LEDGER_PATH};
use crate::support::{exit_with_error, print_json_or_exit, yes_no};
use reqledger_ledger::MemoryLedger;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub events_path: PathBuf,
    pub config_path: PathBuf,
    pub created_root: bool,
    pub created_state_dir: bool,
    pub created_ledger: bool,
    pub created_events: bool,
    pub created_config: bool,
}

fn ensure_dir(path: &Path, label: &str) -> Result<bool, String> {
    let mut created = false;
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("failed to create {label} {}: {e}", path.display()))?;
        created = true;
    }
    if !path.is_dir() {
        return Err(format!("{label} is not a directory: {}", path.display()));
    }
    Ok(created)
}

fn ensure_file_slot(path: &Path, label: &str) -> Result<bool, String> {
    if path.exists() && !path.is_file() {
        return Err(format!(
            "{label} exists but is not a file: {}",
            path.display()
        ));
    }
    Ok(!path.exists())
}

/// Create `<root>/.reqledger/` with an empty ledger, an empty event log and
/// a config file holding the defaults. Existing files are left untouched.
pub fn init_layout(path: impl AsRef<Path>) -> Result<InitOutcome, String> {
    let root = path.as_ref().to_path_buf();
    let created_root = ensure_dir(&root, "init path")?;

    let ledger_path = root.join(DEFAULT_LEDGER_PATH);
    let events_path = root.join(DEFAULT_EVENTS_PATH);
    let config_path = root.join(DEFAULT_CONFIG_PATH);
    let state_dir = ledger_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.clone());
    let created_state_dir = ensure_dir(&state_dir, "state directory")?;

    let created_ledger = ensure_file_slot(&ledger_path, "ledger path")?;
    if created_ledger {
        MemoryLedger::new()
            .save_jsonl(&ledger_path)
            .map_err(|e| format!("failed to initialize {}: {e}", ledger_path.display()))?;
    }

    let created_events = ensure_file_slot(&events_path, "event log path")?;
    if created_events {
        fs::write(&events_path, "")
            .map_err(|e| format!("failed to initialize {}: {e}", events_path.display()))?;
    }

    let created_config = ensure_file_slot(&config_path, "config path")?;
    if created_config {
        let rendered = Config::default()
            .to_toml_string()
            .map_err(|e| format!("failed to render default config: {e}"))?;
        fs::write(&config_path, rendered)
            .map_err(|e| format!("failed to write {}: {e}", config_path.display()))?;
    }

    Ok(InitOutcome {
        root,
        state_dir,
        ledger_path,
        events_path,
        config_path,
        created_root,
        created_state_dir,
        created_ledger,
        created_events,
        created_config,
    })
}

pub fn run(path: String, json_output: bool) {
    let outcome = init_layout(&path).unwrap_or_else(|e| exit_with_error(e));

    if json_output {
        print_json_or_exit(&json!({
            "action": "init",
            "root": outcome.root.display().to_string(),
            "ledgerPath": outcome.ledger_path.display().to_string(),
            "eventsPath": outcome.events_path.display().to_string(),
            "configPath": outcome.config_path.display().to_string(),
            "created": {
                "root": outcome.created_root,
                "stateDir": outcome.created_state_dir,
                "ledger": outcome.created_ledger,
                "events": outcome.created_events,
                "config": outcome.created_config,
            }
        }));
        return;
    }

    println!("reqledger init {path}");
    println!();
    println!("  root: {}", outcome.root.display());
    println!("  state dir: {}", outcome.state_dir.display());
    println!("  ledger: {}", outcome.ledger_path.display());
    println!("  event log: {}", outcome.events_path.display());
    println!("  config: {}", outcome.config_path.display());
    println!("  created ledger: {}", yes_no(outcome.created_ledger));
    println!("  created event log: {}", yes_no(outcome.created_events));
    println!("  created config: {}", yes_no(outcome.created_config));
}
