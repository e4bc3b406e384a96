use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "reqledger-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Run the binary with `dir` as working directory so default paths resolve
/// inside it.
fn run_reqledger<I, S>(dir: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_reqledger");
    Command::new(bin)
        .current_dir(dir)
        .env_remove("REQLEDGER_LOG")
        .args(args)
        .output()
        .expect("reqledger command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn new_asset(dir: &Path, id: &str, text: &str) {
    let output = run_reqledger(
        dir,
        [
            "asset",
            "new",
            id,
            text,
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
        ],
    );
    assert_success(&output);
}

fn read_jsonl(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("jsonl line should parse"))
        .collect()
}

#[test]
fn init_json_smoke() {
    let tmp = TempDirGuard::new("init");
    let output = run_reqledger(tmp.path(), ["init", ".", "--json"]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "init");
    assert_eq!(payload["created"]["ledger"], true);
    assert_eq!(payload["created"]["config"], true);
    assert!(tmp.path().join(".reqledger/ledger.jsonl").is_file());
    assert!(tmp.path().join(".reqledger/events.jsonl").is_file());
    assert!(tmp.path().join(".reqledger/config.toml").is_file());

    let again = run_reqledger(tmp.path(), ["init", ".", "--json"]);
    assert_success(&again);
    assert_eq!(parse_json_stdout(&again)["created"]["ledger"], false);
}

#[test]
fn asset_lifecycle_json_smoke() {
    let tmp = TempDirGuard::new("lifecycle");
    assert_success(&run_reqledger(tmp.path(), ["init"]));

    let created = run_reqledger(
        tmp.path(),
        [
            "asset",
            "new",
            "req-1",
            "The brake shall engage within 50ms.",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--json",
        ],
    );
    assert_success(&created);
    let envelope = parse_json_stdout(&created);
    assert_eq!(envelope["result"], "accepted");
    assert_eq!(envelope["operation"], "NewAsset");

    let got = run_reqledger(tmp.path(), ["asset", "get", "req-1", "--json"]);
    assert_success(&got);
    let got = parse_json_stdout(&got);
    assert_eq!(got["readOnly"], true);
    assert_eq!(got["output"]["status"], "created");
    assert_eq!(got["output"]["isaccessed"], false);

    for _ in 0..2 {
        let read = run_reqledger(tmp.path(), ["asset", "read", "req-1", "--json"]);
        assert_success(&read);
        assert_eq!(parse_json_stdout(&read)["output"]["isaccessed"], true);
    }

    let content = run_reqledger(tmp.path(), ["asset", "content", "req-1"]);
    assert_success(&content);
    assert_eq!(
        stdout_text(&content).trim(),
        "The brake shall engage within 50ms."
    );

    let events = run_reqledger(tmp.path(), ["events", "--json"]);
    assert_success(&events);
    let names: Vec<String> = parse_json_stdout(&events)
        .as_array()
        .expect("events should be an array")
        .iter()
        .map(|record| record["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["newAsset", "assetAccessed"]);
}

#[test]
fn duplicate_asset_reports_failure_class() {
    let tmp = TempDirGuard::new("duplicate");
    new_asset(tmp.path(), "req-1", "first");

    let output = run_reqledger(
        tmp.path(),
        [
            "asset",
            "new",
            "req-1",
            "second",
            "--first-name",
            "Grace",
            "--last-name",
            "Hopper",
        ],
    );
    assert_failure(&output);
    assert!(
        stderr_text(&output).contains("error: already_exists: asset with id req-1 already exists"),
        "stderr:\n{}",
        stderr_text(&output)
    );
}

#[test]
fn invoke_evaluate_rejects_mutation_without_touching_ledger() {
    let tmp = TempDirGuard::new("evaluate");
    let output = run_reqledger(
        tmp.path(),
        [
            "invoke",
            "NewAsset",
            "--payload",
            r#"{"id":"req-1","owner":{"firstname":"A","lastname":"B"},"text":"t"}"#,
            "--evaluate",
        ],
    );
    assert_failure(&output);
    let envelope = parse_json_stdout(&output);
    assert_eq!(envelope["result"], "rejected");
    assert_eq!(envelope["failureClass"], "read_only_violation");
    assert!(!tmp.path().join(".reqledger/ledger.jsonl").exists());
    assert!(!tmp.path().join(".reqledger/events.jsonl").exists());
}

#[test]
fn invoke_submit_matches_subcommand_semantics() {
    let tmp = TempDirGuard::new("invoke");
    let output = run_reqledger(
        tmp.path(),
        [
            "invoke",
            "NewAsset",
            "--payload",
            r#"{"id":"req-9","owner":{"firstname":"A","lastname":"B"},"text":"t"}"#,
        ],
    );
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["result"], "accepted");

    let unknown = run_reqledger(tmp.path(), ["invoke", "DeleteAsset"]);
    assert_failure(&unknown);
    assert_eq!(parse_json_stdout(&unknown)["failureClass"], "unknown_operation");
}

#[test]
fn dependency_set_and_trace_smoke() {
    let tmp = TempDirGuard::new("deps");
    new_asset(tmp.path(), "a", "alpha");
    new_asset(tmp.path(), "b", "beta");

    let set = run_reqledger(tmp.path(), ["dep", "set", "a", "b", "ghost", "--json"]);
    assert_success(&set);
    assert_eq!(parse_json_stdout(&set)["output"]["id"], "a");

    let missing = run_reqledger(tmp.path(), ["dep", "link", "b", "ghost"]);
    assert_failure(&missing);
    assert!(stderr_text(&missing).contains("not_found"));

    let trace = run_reqledger(tmp.path(), ["dep", "trace", "a", "--json"]);
    assert_success(&trace);
    let trace = parse_json_stdout(&trace);
    assert_eq!(trace["output"]["visited"], serde_json::json!(["a", "b"]));
    assert_eq!(trace["output"]["dangling"], serde_json::json!(["ghost"]));

    let shared = run_reqledger(
        tmp.path(),
        [
            "asset",
            "share",
            "a",
            "--first-name",
            "Grace",
            "--last-name",
            "Hopper",
        ],
    );
    assert_success(&shared);
    assert!(stdout_text(&shared).contains("Dependents: b, ghost"));
}

#[test]
fn share_bulk_keeps_earlier_items_on_failure() {
    let tmp = TempDirGuard::new("bulk");
    new_asset(tmp.path(), "a", "alpha");
    new_asset(tmp.path(), "c", "gamma");

    let output = run_reqledger(
        tmp.path(),
        [
            "asset",
            "share-bulk",
            "a",
            "b",
            "c",
            "--first-name",
            "Grace",
            "--last-name",
            "Hopper",
        ],
    );
    assert_failure(&output);
    assert!(stderr_text(&output).contains("not_found"));

    let a = parse_json_stdout(&run_reqledger(tmp.path(), ["asset", "get", "a", "--json"]));
    let c = parse_json_stdout(&run_reqledger(tmp.path(), ["asset", "get", "c", "--json"]));
    assert_eq!(a["output"]["status"], "shared");
    assert_eq!(c["output"]["status"], "created");

    let shared = run_reqledger(tmp.path(), ["events", "--name", "assetShared", "--json"]);
    assert_success(&shared);
    let shared = parse_json_stdout(&shared);
    assert_eq!(shared.as_array().map(Vec::len), Some(1));
    assert_eq!(shared[0]["payload"]["assetid"], "a");
}

#[test]
fn config_file_and_flags_select_paths() {
    let tmp = TempDirGuard::new("config");
    fs::write(
        tmp.path().join("custom.toml"),
        "[ledger]\npath = \"data/ledger.jsonl\"\n\n[events]\npath = \"data/events.jsonl\"\n",
    )
    .expect("config should be written");

    let output = run_reqledger(
        tmp.path(),
        [
            "--config",
            "custom.toml",
            "asset",
            "new",
            "req-1",
            "text",
            "--first-name",
            "A",
            "--last-name",
            "B",
        ],
    );
    assert_success(&output);
    assert!(tmp.path().join("data/ledger.jsonl").is_file());
    assert_eq!(read_jsonl(&tmp.path().join("data/events.jsonl")).len(), 1);
    assert!(!tmp.path().join(".reqledger").exists());

    let overridden = run_reqledger(
        tmp.path(),
        [
            "--config",
            "custom.toml",
            "--ledger",
            "elsewhere.jsonl",
            "asset",
            "get",
            "req-1",
        ],
    );
    assert_failure(&overridden);
    assert!(stderr_text(&overridden).contains("not_found"));

    let bad = run_reqledger(tmp.path(), ["--config", "missing.toml", "events"]);
    assert_failure(&bad);
    assert!(stderr_text(&bad).contains("failed to read config"));
}
