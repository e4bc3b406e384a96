//! JSONL storage: one line per ledger key.
//!
//! The portable on-disk form of the ledger. Each line is
//! `{"key": ..., "value": ...}` with the record bytes as a UTF-8 string.
//! Blank lines are tolerated on read; nothing else is.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One stored key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: String,
    pub value: String,
}

fn path_io(path: &Path, err: std::io::Error) -> JsonlError {
    JsonlError::Io(0, format!("{}: {err}", path.display()))
}

pub fn read_entries(reader: impl BufRead) -> Result<Vec<LedgerEntry>, JsonlError> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| JsonlError::Io(line_no, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str::<LedgerEntry>(&line)
            .map_err(|e| JsonlError::Parse(line_no, e.to_string()))?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn write_entries(writer: &mut impl Write, entries: &[LedgerEntry]) -> Result<(), JsonlError> {
    for entry in entries {
        serde_json::to_writer(&mut *writer, entry)
            .map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read a ledger file. A missing file is an empty ledger.
///
/// NUL bytes or invalid UTF-8 anywhere in the file mean the file was not
/// written by this crate and are reported as `Corrupt`.
pub fn read_entries_from_path(path: impl AsRef<Path>) -> Result<Vec<LedgerEntry>, JsonlError> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(path_io(path, e)),
    };
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(&bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: not valid UTF-8",
            path.display()
        )));
    }
    read_entries(BufReader::new(bytes.as_slice()))
}

/// Replace a ledger file: write a sibling temp file, sync it, rename it over
/// `path`, then sync the directory.
pub fn write_entries_to_path(
    path: impl AsRef<Path>,
    entries: &[LedgerEntry],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    let dir = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(|e| path_io(dir, e))?;
    }

    let staged = staging_path(path);
    if let Err(err) = write_staged(&staged, entries) {
        let _ = fs::remove_file(&staged);
        return Err(err);
    }
    if let Err(err) = fs::rename(&staged, path) {
        let _ = fs::remove_file(&staged);
        return Err(path_io(path, err));
    }
    if let Some(dir) = dir {
        File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(|e| path_io(dir, e))?;
    }
    Ok(())
}

fn write_staged(staged: &Path, entries: &[LedgerEntry]) -> Result<(), JsonlError> {
    let file = File::create(staged).map_err(|e| path_io(staged, e))?;
    let mut writer = BufWriter::new(file);
    write_entries(&mut writer, entries)?;
    let file = writer
        .into_inner()
        .map_err(|e| path_io(staged, e.into_error()))?;
    file.sync_all().map_err(|e| path_io(staged, e))
}

/// `<path>.staged.<pid>`; the ledger lock keeps one writer per process tree.
fn staging_path(path: &Path) -> PathBuf {
    let mut staged: OsString = path.as_os_str().to_os_string();
    staged.push(format!(".staged.{}", std::process::id()));
    PathBuf::from(staged)
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted ledger file: {0}")]
    Corrupt(String),
}
