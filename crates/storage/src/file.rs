use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetmx_context::Snapshot;
use fleetmx_core::{Clock, SystemClock};

use crate::store::{ExpectedRevision, SnapshotStore, StoreError, StoredSnapshot};

/// On-disk document: the snapshot plus save metadata.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    revision: u64,
    saved_at: DateTime<Utc>,
    message: String,
    state: Snapshot,
}

/// Snapshot store backed by one JSON file.
///
/// Saves replace the file atomically. A file holding a bare snapshot (no
/// envelope) is read as revision 0.
///
/// The revision check runs under an in-process lock only. Two processes
/// sharing the file can both save on top of the same revision, and the
/// later write wins without a [`StoreError::Conflict`].
#[derive(Debug)]
pub struct FileSnapshotStore<C = SystemClock> {
    path: PathBuf,
    clock: C,
    write_lock: Mutex<()>,
}

impl FileSnapshotStore<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }
}

impl<C: Clock> FileSnapshotStore<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredSnapshot, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredSnapshot::default());
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<Envelope>(&raw) {
            Ok(envelope) => Ok(StoredSnapshot {
                revision: envelope.revision,
                snapshot: envelope.state,
            }),
            Err(envelope_err) => {
                let snapshot: Snapshot = serde_json::from_str(&raw)?;
                tracing::debug!(
                    path = %self.path.display(),
                    error = %envelope_err,
                    "state file has no envelope; reading it as a bare snapshot"
                );
                Ok(StoredSnapshot {
                    revision: 0,
                    snapshot,
                })
            }
        }
    }
}

impl<C: Clock> SnapshotStore for FileSnapshotStore<C> {
    fn load(&self) -> Result<StoredSnapshot, StoreError> {
        self.read()
    }

    fn save(
        &self,
        snapshot: &Snapshot,
        expected: ExpectedRevision,
        message: &str,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let current = self.read()?.revision;
        if !expected.matches(current) {
            return Err(StoreError::Conflict {
                expected,
                actual: current,
            });
        }

        let envelope = Envelope {
            revision: current + 1,
            saved_at: self.clock.now(),
            message: message.to_string(),
            state: snapshot.clone(),
        };
        let contents = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|f| {
                f.write_all(contents.as_bytes())?;
                f.flush()
            })
            .map_err(|err| StoreError::Write(format!("{}: {err}", self.path.display())))?;

        tracing::info!(
            path = %self.path.display(),
            revision = envelope.revision,
            commit = message,
            "state saved"
        );
        Ok(envelope.revision)
    }
}
