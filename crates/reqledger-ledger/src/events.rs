//! Event sink capability and the append-only event log.
//!
//! `reqledger.event.v1` is the log envelope: one line per emission with a
//! monotonically increasing sequence number and the emitted JSON payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const EVENT_LOG_SCHEMA: &str = "reqledger.event.v1";

fn default_event_log_schema() -> String {
    EVENT_LOG_SCHEMA.to_string()
}

/// Fire-and-forget notification channel.
pub trait EventSink {
    fn emit(&mut self, name: &str, payload: Vec<u8>) -> Result<(), EventSinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventSinkError {
    #[error("event {name} not delivered: {message}")]
    Delivery { name: String, message: String },
}

/// One emission as observed by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

impl EmittedEvent {
    /// Payload decoded as JSON.
    pub fn payload_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Collects emissions in memory. Can be told to reject one event name.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Vec<EmittedEvent>,
    reject: Option<String>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose delivery of `name` always fails.
    pub fn rejecting(name: impl Into<String>) -> Self {
        Self {
            events: Vec::new(),
            reject: Some(name.into()),
        }
    }

    pub fn events(&self) -> &[EmittedEvent] {
        &self.events
    }

    pub fn names(&self) -> Vec<&str> {
        self.events.iter().map(|event| event.name.as_str()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|event| event.name == name).count()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&mut self, name: &str, payload: Vec<u8>) -> Result<(), EventSinkError> {
        if self.reject.as_deref() == Some(name) {
            return Err(EventSinkError::Delivery {
                name: name.to_string(),
                message: "sink rejected event".to_string(),
            });
        }
        self.events.push(EmittedEvent {
            name: name.to_string(),
            payload,
        });
        Ok(())
    }
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default = "default_event_log_schema")]
    pub schema: String,
    pub seq: u64,
    pub name: String,
    pub payload: Value,
}

/// Appends each emission to a JSONL log as it happens.
#[derive(Debug)]
pub struct JsonlEventSink {
    path: PathBuf,
    next_seq: u64,
}

impl JsonlEventSink {
    /// Open (or create) a log; numbering continues after the last record.
    ///
    /// Only the tail of the log is read. Lines that do not carry a `seq`
    /// are skipped, so a damaged or foreign line does not block appends.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let path = path.as_ref().to_path_buf();
        let next_seq = last_recorded_seq(&path)?.map_or(1, |seq| seq + 1);
        Ok(Self { path, next_seq })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: &EventRecord) -> Result<(), EventLogError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| EventLogError::Io(0, format!("{}: {e}", parent.display())))?;
        }
        let line =
            serde_json::to_string(record).map_err(|e| EventLogError::Serialize(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EventLogError::Io(0, format!("{}: {e}", self.path.display())))?;
        writeln!(file, "{line}")
            .map_err(|e| EventLogError::Io(0, format!("{}: {e}", self.path.display())))?;
        file.sync_data()
            .map_err(|e| EventLogError::Io(0, format!("{}: {e}", self.path.display())))
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&mut self, name: &str, payload: Vec<u8>) -> Result<(), EventSinkError> {
        let payload = serde_json::from_slice::<Value>(&payload)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&payload).into_owned()));
        let record = EventRecord {
            schema: EVENT_LOG_SCHEMA.to_string(),
            seq: self.next_seq,
            name: name.to_string(),
            payload,
        };
        self.append(&record).map_err(|e| EventSinkError::Delivery {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(event = name, seq = record.seq, "event appended to log");
        self.next_seq += 1;
        Ok(())
    }
}

const TAIL_CHUNK: u64 = 4096;

#[derive(Deserialize)]
struct SeqOnly {
    seq: u64,
}

fn seq_of_line(line: &[u8]) -> Option<u64> {
    let line = std::str::from_utf8(line).ok()?.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<SeqOnly>(line) {
        Ok(record) => Some(record.seq),
        Err(err) => {
            tracing::warn!(error = %err, "skipping event log line without a sequence number");
            None
        }
    }
}

/// Sequence number of the last readable record, scanning backwards.
fn last_recorded_seq(path: &Path) -> Result<Option<u64>, EventLogError> {
    let io_err = |e: std::io::Error| EventLogError::Io(0, format!("{}: {e}", path.display()));
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(e)),
    };
    let metadata = file.metadata().map_err(io_err)?;
    if !metadata.is_file() {
        return Err(EventLogError::Io(
            0,
            format!("{}: not a regular file", path.display()),
        ));
    }

    // `pending` holds bytes from `end` up to the first newline already seen.
    let mut pending: Vec<u8> = Vec::new();
    let mut end = metadata.len();
    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0; (end - start) as usize];
        file.seek(SeekFrom::Start(start)).map_err(io_err)?;
        file.read_exact(&mut chunk).map_err(io_err)?;
        chunk.extend_from_slice(&pending);
        end = start;

        let complete_from = if start == 0 {
            0
        } else {
            match chunk.iter().position(|byte| *byte == b'\n') {
                Some(newline) => newline + 1,
                None => {
                    pending = chunk;
                    continue;
                }
            }
        };
        if let Some(seq) = chunk[complete_from..]
            .split(|byte| *byte == b'\n')
            .rev()
            .find_map(seq_of_line)
        {
            return Ok(Some(seq));
        }
        chunk.truncate(complete_from);
        pending = chunk;
    }
    Ok(None)
}

pub fn read_event_log(reader: impl BufRead) -> Result<Vec<EventRecord>, EventLogError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EventLogError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(trimmed)
            .map_err(|e| EventLogError::Parse(line_no + 1, e.to_string()))?;
        if record.schema != EVENT_LOG_SCHEMA {
            return Err(EventLogError::UnsupportedSchema(record.schema));
        }
        records.push(record);
    }
    Ok(records)
}

pub fn read_event_log_from_path(path: impl AsRef<Path>) -> Result<Vec<EventRecord>, EventLogError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EventLogError::Missing(path.display().to_string()));
        }
        Err(e) => return Err(EventLogError::Io(0, format!("{}: {e}", path.display()))),
    };
    read_event_log(BufReader::new(file))
}

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("event log not found: {0}")]
    Missing(String),

    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unsupported event schema: {0}")]
    UnsupportedSchema(String),
}
