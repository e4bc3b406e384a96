//! Lock-scoped invocation helper for the JSONL ledger.
//!
//! One invocation = acquire `<ledger>.lock`, load, run, flush, release.
//! Writes made before a failing step are flushed anyway: the ledger keeps
//! whatever the operation committed up to the point it aborted.

use crate::MemoryLedger;
use crate::jsonl::JsonlError;
use chrono::Utc;
use std::error::Error as StdError;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn ledger_lock_path(ledger_path: &Path) -> PathBuf {
    let mut path: OsString = ledger_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

#[derive(Debug)]
pub enum AtomicLedgerMutationError<E> {
    LockBusy { lock_path: String },
    LockIo { lock_path: String, message: String },
    Store(JsonlError),
    Mutation(E),
}

impl<E: Display> Display for AtomicLedgerMutationError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockBusy { lock_path } => write!(f, "ledger lock busy: {lock_path}"),
            Self::LockIo { lock_path, message } => {
                write!(f, "failed to acquire ledger lock {lock_path}: {message}")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Mutation(err) => write!(f, "{err}"),
        }
    }
}

impl<E> StdError for AtomicLedgerMutationError<E> where
    E: Display + std::fmt::Debug + StdError + 'static
{
}

/// Run one invocation against a JSONL ledger under its lock file.
///
/// The ledger is flushed when the mutator wrote anything, including when it
/// returned an error. A flush failure takes precedence over the mutator's
/// own result since the caller can no longer trust what was persisted.
pub fn mutate_ledger_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicLedgerMutationError<E>>
where
    F: FnOnce(&mut MemoryLedger) -> Result<T, E>,
{
    mutate_ledger_jsonl_then(path, mutator, |outcome| outcome)
}

/// [`mutate_ledger_jsonl`] with a step that runs after the flush.
///
/// `after_flush` receives the mutator's result once every write is durable,
/// and still runs under the lock. It never runs when loading or flushing
/// the ledger failed.
pub fn mutate_ledger_jsonl_then<T, U, E, F, A>(
    path: impl AsRef<Path>,
    mutator: F,
    after_flush: A,
) -> Result<U, AtomicLedgerMutationError<E>>
where
    F: FnOnce(&mut MemoryLedger) -> Result<T, E>,
    A: FnOnce(Result<T, E>) -> Result<U, E>,
{
    let path = path.as_ref();
    let _guard = LedgerLockGuard::acquire::<E>(path)?;

    let mut ledger = MemoryLedger::load_jsonl(path).map_err(AtomicLedgerMutationError::Store)?;
    let outcome = mutator(&mut ledger);
    if ledger.is_dirty() {
        ledger
            .save_jsonl(path)
            .map_err(AtomicLedgerMutationError::Store)?;
        tracing::debug!(
            ledger = %path.display(),
            writes = ledger.write_count(),
            "ledger flushed"
        );
    }
    after_flush(outcome).map_err(AtomicLedgerMutationError::Mutation)
}

struct LedgerLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl LedgerLockGuard {
    fn acquire<E>(path: &Path) -> Result<Self, AtomicLedgerMutationError<E>> {
        let lock_path = ledger_lock_path(path);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| AtomicLedgerMutationError::LockIo {
                lock_path: lock_path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AtomicLedgerMutationError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(AtomicLedgerMutationError::LockIo {
                lock_path: lock_path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

impl Drop for LedgerLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
