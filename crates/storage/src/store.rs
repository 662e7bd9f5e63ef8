use std::sync::{Arc, RwLock};

use thiserror::Error;

use fleetmx_context::Snapshot;

/// Optimistic concurrency expectation for a save.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Overwrite whatever is stored.
    Any,
    /// Require the store to be at exactly this revision (0 = nothing stored yet).
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(r) => r == actual,
        }
    }
}

/// A snapshot together with the revision it was read at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSnapshot {
    pub revision: u64,
    pub snapshot: Snapshot,
}

/// Storage failures. Domain validation never reaches this layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revision conflict: expected {expected:?}, found {actual}")]
    Conflict {
        expected: ExpectedRevision,
        actual: u64,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("write failed: {0}")]
    Write(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Whole-snapshot store with revision checks.
///
/// `load` on an empty store returns revision 0 and an empty snapshot. `save`
/// replaces the stored snapshot and returns the new revision, or fails with
/// [`StoreError::Conflict`] when `expected` does not match.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<StoredSnapshot, StoreError>;

    fn save(
        &self,
        snapshot: &Snapshot,
        expected: ExpectedRevision,
        message: &str,
    ) -> Result<u64, StoreError>;
}

impl<S> SnapshotStore for Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    fn load(&self) -> Result<StoredSnapshot, StoreError> {
        (**self).load()
    }

    fn save(
        &self,
        snapshot: &Snapshot,
        expected: ExpectedRevision,
        message: &str,
    ) -> Result<u64, StoreError> {
        (**self).save(snapshot, expected, message)
    }
}

/// In-memory snapshot store.
///
/// Intended for tests/dev. Keeps the commit message of the last save.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: RwLock<Option<(StoredSnapshot, String)>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message of the most recent save, if any.
    pub fn last_message(&self) -> Option<String> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|(_, msg)| msg.clone()))
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> Result<StoredSnapshot, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .as_ref()
            .map(|(stored, _)| stored.clone())
            .unwrap_or_default())
    }

    fn save(
        &self,
        snapshot: &Snapshot,
        expected: ExpectedRevision,
        message: &str,
    ) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let current = guard.as_ref().map(|(s, _)| s.revision).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Conflict {
                expected,
                actual: current,
            });
        }

        let revision = current + 1;
        *guard = Some((
            StoredSnapshot {
                revision,
                snapshot: snapshot.clone(),
            },
            message.to_string(),
        ));
        tracing::debug!(revision, commit = message, "snapshot saved in memory");
        Ok(revision)
    }
}
