//! # reqledger-transport
//!
//! Named-operation dispatch over the asset engine.
//!
//! Every externally invocable operation is listed once in
//! [`OPERATION_SPECS`] with its handler and a read-only flag. Requests are
//! `{"operation", "payload"}` JSON; responses are [`OperationEnvelope`]s.
//! Evaluate-mode requests may only name read-only operations and are
//! rejected before any handler runs otherwise.

use std::path::Path;

use reqledger_core::{
    LifecycleError, Owner, TxContext, create_asset, create_dependent, get_asset, get_content,
    link_dependent, read_asset, share_asset, share_assets_bulk, trace_dependencies,
    update_value,
};
use reqledger_ledger::{
    AtomicLedgerMutationError, Clock, EventSink, IdSource, JsonlError, JsonlEventSink,
    MemoryEventSink, MemoryLedger, ReadOnlyLedger, mutate_ledger_jsonl_then,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ENVELOPE_SCHEMA: u32 = 1;

const RESULT_ACCEPTED: &str = "accepted";
const RESULT_REJECTED: &str = "rejected";
const OPERATION_DISPATCH: &str = "dispatch";

pub const FAILURE_INVALID_PAYLOAD: &str = "invalid_payload";
pub const FAILURE_UNKNOWN_OPERATION: &str = "unknown_operation";
pub const FAILURE_READ_ONLY_VIOLATION: &str = "read_only_violation";
pub const FAILURE_STORAGE_UNAVAILABLE: &str = "storage_unavailable";
pub const FAILURE_CORRUPT_RECORD: &str = "corrupt_record";
pub const FAILURE_EVENT_DELIVERY_FAILED: &str = "event_delivery_failed";

/// Whether an invocation may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// May read, write and emit; writes are committed.
    Submit,
    /// Read-only query; only read-only operations are accepted.
    Evaluate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub failure_class: &'static str,
    pub diagnostic: String,
}

impl DispatchFailure {
    fn new(failure_class: &'static str, diagnostic: impl Into<String>) -> Self {
        Self {
            failure_class,
            diagnostic: diagnostic.into(),
        }
    }
}

impl From<LifecycleError> for DispatchFailure {
    fn from(err: LifecycleError) -> Self {
        Self::new(err.failure_class(), err.to_string())
    }
}

type Handler = fn(&mut TxContext<'_>, Value) -> Result<Value, DispatchFailure>;

/// One row of the operation registry.
#[derive(Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub read_only: bool,
    handler: Handler,
}

impl std::fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("read_only", &self.read_only)
            .finish()
    }
}

pub const OPERATION_SPECS: [OperationSpec; 10] = [
    OperationSpec {
        name: "NewAsset",
        read_only: false,
        handler: handle_new_asset,
    },
    OperationSpec {
        name: "ShareAsset",
        read_only: false,
        handler: handle_share_asset,
    },
    OperationSpec {
        name: "ShareAssetsBulk",
        read_only: false,
        handler: handle_share_assets_bulk,
    },
    OperationSpec {
        name: "CreateDependent",
        read_only: false,
        handler: handle_create_dependent,
    },
    OperationSpec {
        name: "LinkDependent",
        read_only: false,
        handler: handle_link_dependent,
    },
    OperationSpec {
        name: "UpdateValue",
        read_only: false,
        handler: handle_update_value,
    },
    OperationSpec {
        name: "ReadAsset",
        read_only: false,
        handler: handle_read_asset,
    },
    OperationSpec {
        name: "GetAsset",
        read_only: true,
        handler: handle_get_asset,
    },
    OperationSpec {
        name: "GetContent",
        read_only: true,
        handler: handle_get_content,
    },
    OperationSpec {
        name: "TraceDependencies",
        read_only: true,
        handler: handle_trace_dependencies,
    },
];

pub fn operation_spec(name: &str) -> Option<&'static OperationSpec> {
    let name = name.trim();
    OPERATION_SPECS.iter().find(|spec| spec.name == name)
}

/// Names of the operations allowed in evaluate mode.
pub fn evaluate_operations() -> Vec<&'static str> {
    OPERATION_SPECS
        .iter()
        .filter(|spec| spec.read_only)
        .map(|spec| spec.name)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRegistryRow {
    pub operation: String,
    pub read_only: bool,
}

pub fn operation_registry_rows() -> Vec<OperationRegistryRow> {
    OPERATION_SPECS
        .iter()
        .map(|spec| OperationRegistryRow {
            operation: spec.name.to_string(),
            read_only: spec.read_only,
        })
        .collect()
}

// -- requests ---------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub operation: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssetRequest {
    pub id: String,
    pub owner: Owner,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAssetRequest {
    pub asset_id: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAssetsBulkRequest {
    pub asset_ids: Vec<String>,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDependentRequest {
    pub from_id: String,
    #[serde(default)]
    pub to_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDependentRequest {
    pub from_id: String,
    pub to_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValueRequest {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDependenciesRequest {
    pub root_id: String,
}

fn parse_payload<T: DeserializeOwned>(
    operation: &str,
    payload: Value,
) -> Result<T, DispatchFailure> {
    serde_json::from_value(payload).map_err(|source| {
        DispatchFailure::new(
            FAILURE_INVALID_PAYLOAD,
            format!("invalid {operation} payload: {source}"),
        )
    })
}

fn to_output<T: Serialize>(value: &T) -> Result<Value, DispatchFailure> {
    serde_json::to_value(value).map_err(|source| {
        DispatchFailure::new(
            FAILURE_CORRUPT_RECORD,
            format!("failed to encode output: {source}"),
        )
    })
}

// -- handlers ---------------------------------------------------------------

fn handle_new_asset(ctx: &mut TxContext<'_>, payload: Value) -> Result<Value, DispatchFailure> {
    let request: NewAssetRequest = parse_payload("NewAsset", payload)?;
    create_asset(ctx, &request.id, request.owner, &request.text)?;
    Ok(Value::Null)
}

fn handle_share_asset(ctx: &mut TxContext<'_>, payload: Value) -> Result<Value, DispatchFailure> {
    let request: ShareAssetRequest = parse_payload("ShareAsset", payload)?;
    let dependents = share_asset(ctx, &request.asset_id, request.owner)?;
    Ok(serde_json::json!({ "dependents": dependents }))
}

fn handle_share_assets_bulk(
    ctx: &mut TxContext<'_>,
    payload: Value,
) -> Result<Value, DispatchFailure> {
    let request: ShareAssetsBulkRequest = parse_payload("ShareAssetsBulk", payload)?;
    share_assets_bulk(ctx, &request.asset_ids, &request.owner)?;
    Ok(serde_json::json!({ "shared": request.asset_ids }))
}

fn handle_create_dependent(
    ctx: &mut TxContext<'_>,
    payload: Value,
) -> Result<Value, DispatchFailure> {
    let request: CreateDependentRequest = parse_payload("CreateDependent", payload)?;
    let asset = create_dependent(ctx, &request.from_id, request.to_ids)?;
    to_output(&asset)
}

fn handle_link_dependent(
    ctx: &mut TxContext<'_>,
    payload: Value,
) -> Result<Value, DispatchFailure> {
    let request: LinkDependentRequest = parse_payload("LinkDependent", payload)?;
    let asset = link_dependent(ctx, &request.from_id, &request.to_id)?;
    to_output(&asset)
}

fn handle_update_value(ctx: &mut TxContext<'_>, payload: Value) -> Result<Value, DispatchFailure> {
    let request: UpdateValueRequest = parse_payload("UpdateValue", payload)?;
    update_value(ctx, &request.id, &request.text)?;
    Ok(Value::Null)
}

fn handle_read_asset(ctx: &mut TxContext<'_>, payload: Value) -> Result<Value, DispatchFailure> {
    let request: AssetIdRequest = parse_payload("ReadAsset", payload)?;
    let asset = read_asset(ctx, &request.id)?;
    to_output(&asset)
}

fn handle_get_asset(ctx: &mut TxContext<'_>, payload: Value) -> Result<Value, DispatchFailure> {
    let request: AssetIdRequest = parse_payload("GetAsset", payload)?;
    to_output(&get_asset(ctx, &request.id)?)
}

fn handle_get_content(ctx: &mut TxContext<'_>, payload: Value) -> Result<Value, DispatchFailure> {
    let request: AssetIdRequest = parse_payload("GetContent", payload)?;
    to_output(&get_content(ctx, &request.id)?)
}

fn handle_trace_dependencies(
    ctx: &mut TxContext<'_>,
    payload: Value,
) -> Result<Value, DispatchFailure> {
    let request: TraceDependenciesRequest = parse_payload("TraceDependencies", payload)?;
    to_output(&trace_dependencies(ctx, &request.root_id)?)
}

// -- envelopes --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationEnvelope {
    pub schema: u32,
    pub operation: String,
    pub result: String,
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl OperationEnvelope {
    pub fn is_accepted(&self) -> bool {
        self.result == RESULT_ACCEPTED
    }
}

fn accepted_envelope(spec: &OperationSpec, output: Value) -> OperationEnvelope {
    OperationEnvelope {
        schema: ENVELOPE_SCHEMA,
        operation: spec.name.to_string(),
        result: RESULT_ACCEPTED.to_string(),
        read_only: spec.read_only,
        output: (!output.is_null()).then_some(output),
        failure_class: None,
        diagnostic: None,
    }
}

fn rejected_envelope(
    operation: &str,
    read_only: bool,
    failure: DispatchFailure,
) -> OperationEnvelope {
    OperationEnvelope {
        schema: ENVELOPE_SCHEMA,
        operation: operation.to_string(),
        result: RESULT_REJECTED.to_string(),
        read_only,
        output: None,
        failure_class: Some(failure.failure_class.to_string()),
        diagnostic: Some(failure.diagnostic),
    }
}

/// Look up the operation and check it against the mode, without touching
/// any ledger.
pub fn resolve_operation(
    operation: &str,
    mode: DispatchMode,
) -> Result<&'static OperationSpec, OperationEnvelope> {
    let Some(spec) = operation_spec(operation) else {
        return Err(rejected_envelope(
            operation.trim(),
            false,
            DispatchFailure::new(
                FAILURE_UNKNOWN_OPERATION,
                format!("unsupported operation: {}", operation.trim()),
            ),
        ));
    };
    if mode == DispatchMode::Evaluate && !spec.read_only {
        return Err(rejected_envelope(
            spec.name,
            spec.read_only,
            DispatchFailure::new(
                FAILURE_READ_ONLY_VIOLATION,
                format!(
                    "{} writes to the ledger and cannot be evaluated; read-only operations: {}",
                    spec.name,
                    evaluate_operations().join(", ")
                ),
            ),
        ));
    }
    Ok(spec)
}

fn finish(spec: &OperationSpec, outcome: Result<Value, DispatchFailure>) -> OperationEnvelope {
    match outcome {
        Ok(output) => {
            tracing::debug!(operation = spec.name, "operation accepted");
            accepted_envelope(spec, output)
        }
        Err(failure) => {
            tracing::debug!(
                operation = spec.name,
                failure_class = failure.failure_class,
                "operation rejected"
            );
            rejected_envelope(spec.name, spec.read_only, failure)
        }
    }
}

/// Run one request against the capabilities in `ctx`.
pub fn dispatch(
    ctx: &mut TxContext<'_>,
    request: DispatchRequest,
    mode: DispatchMode,
) -> OperationEnvelope {
    let spec = match resolve_operation(&request.operation, mode) {
        Ok(spec) => spec,
        Err(envelope) => return envelope,
    };
    finish(spec, (spec.handler)(ctx, request.payload))
}

fn parse_request(request_json: &str) -> Result<DispatchRequest, OperationEnvelope> {
    serde_json::from_str::<DispatchRequest>(request_json).map_err(|source| {
        rejected_envelope(
            OPERATION_DISPATCH,
            false,
            DispatchFailure::new(
                FAILURE_INVALID_PAYLOAD,
                format!("invalid dispatch request: {source}"),
            ),
        )
    })
}

/// JSON-in, JSON-out form of [`dispatch`].
pub fn dispatch_json(
    ctx: &mut TxContext<'_>,
    request_json: &str,
    mode: DispatchMode,
) -> Result<String, serde_json::Error> {
    let envelope = match parse_request(request_json) {
        Ok(request) => dispatch(ctx, request, mode),
        Err(envelope) => envelope,
    };
    serde_json::to_string(&envelope)
}

// -- JSONL host -------------------------------------------------------------

/// File locations for one ledger host.
#[derive(Debug, Clone, Copy)]
pub struct LedgerHost<'a> {
    pub ledger_path: &'a Path,
    pub events_path: &'a Path,
}

fn map_jsonl_error(source: JsonlError) -> DispatchFailure {
    match source {
        JsonlError::Parse(..) | JsonlError::Corrupt(_) => {
            DispatchFailure::new(FAILURE_CORRUPT_RECORD, source.to_string())
        }
        JsonlError::Io(..) | JsonlError::Serialize(_) => {
            DispatchFailure::new(FAILURE_STORAGE_UNAVAILABLE, source.to_string())
        }
    }
}

fn map_atomic_error(err: AtomicLedgerMutationError<DispatchFailure>) -> DispatchFailure {
    match err {
        AtomicLedgerMutationError::Mutation(inner) => inner,
        AtomicLedgerMutationError::LockBusy { lock_path } => DispatchFailure::new(
            FAILURE_STORAGE_UNAVAILABLE,
            format!("ledger lock busy: {lock_path}"),
        ),
        AtomicLedgerMutationError::LockIo { lock_path, message } => DispatchFailure::new(
            FAILURE_STORAGE_UNAVAILABLE,
            format!("failed to acquire ledger lock {lock_path}: {message}"),
        ),
        AtomicLedgerMutationError::Store(source) => map_jsonl_error(source),
    }
}

/// Run one request against a JSONL ledger file.
///
/// Submit mode holds the ledger lock for the whole invocation. Every write
/// is flushed, even when the operation fails, and the events emitted along
/// the way are appended to the event log only after that flush succeeds.
/// Evaluate mode loads a snapshot and never writes.
pub fn dispatch_on_host(
    host: LedgerHost<'_>,
    clock: &dyn Clock,
    ids: &mut dyn IdSource,
    request: DispatchRequest,
    mode: DispatchMode,
) -> OperationEnvelope {
    let spec = match resolve_operation(&request.operation, mode) {
        Ok(spec) => spec,
        Err(envelope) => return envelope,
    };
    tracing::info!(
        operation = spec.name,
        ledger = %host.ledger_path.display(),
        evaluate = mode == DispatchMode::Evaluate,
        "dispatching"
    );

    let outcome = match mode {
        DispatchMode::Evaluate => evaluate_on_host(host, clock, ids, spec, request.payload),
        DispatchMode::Submit => submit_on_host(host, clock, ids, spec, request.payload),
    };
    finish(spec, outcome)
}

fn evaluate_on_host(
    host: LedgerHost<'_>,
    clock: &dyn Clock,
    ids: &mut dyn IdSource,
    spec: &OperationSpec,
    payload: Value,
) -> Result<Value, DispatchFailure> {
    let snapshot = MemoryLedger::load_jsonl(host.ledger_path).map_err(map_jsonl_error)?;
    let mut ledger = ReadOnlyLedger::new(&snapshot);
    let mut events = MemoryEventSink::new();
    let mut ctx = TxContext::new(&mut ledger, &mut events, clock, ids);
    (spec.handler)(&mut ctx, payload)
}

fn submit_on_host(
    host: LedgerHost<'_>,
    clock: &dyn Clock,
    ids: &mut dyn IdSource,
    spec: &OperationSpec,
    payload: Value,
) -> Result<Value, DispatchFailure> {
    mutate_ledger_jsonl_then(
        host.ledger_path,
        |ledger| -> Result<_, DispatchFailure> {
            let log = JsonlEventSink::open(host.events_path).map_err(|source| {
                DispatchFailure::new(
                    FAILURE_STORAGE_UNAVAILABLE,
                    format!("failed to open event log: {source}"),
                )
            })?;
            let mut buffered = MemoryEventSink::new();
            let mut ctx = TxContext::new(ledger, &mut buffered, clock, ids);
            let outcome = (spec.handler)(&mut ctx, payload);
            Ok((outcome, log, buffered))
        },
        |prepared| {
            let (outcome, mut log, buffered) = prepared?;
            append_committed_events(&mut log, &buffered, outcome)
        },
    )
    .map_err(map_atomic_error)
}

/// Append events buffered during a flushed invocation, in emission order.
///
/// Runs only once the ledger writes are durable, so the log never holds an
/// event for state that was not persisted. The operation's own failure wins
/// over a delivery failure.
fn append_committed_events(
    log: &mut JsonlEventSink,
    buffered: &MemoryEventSink,
    outcome: Result<Value, DispatchFailure>,
) -> Result<Value, DispatchFailure> {
    for event in buffered.events() {
        if let Err(err) = log.emit(&event.name, event.payload.clone()) {
            tracing::warn!(
                event = %event.name,
                log = %log.path().display(),
                error = %err,
                "committed event not appended"
            );
            return match outcome {
                Ok(_) => Err(DispatchFailure::new(
                    FAILURE_EVENT_DELIVERY_FAILED,
                    err.to_string(),
                )),
                Err(failure) => Err(failure),
            };
        }
    }
    outcome
}
