use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use fleetmx_context::{LoadWarning, MaintenanceContext, load, serialize};
use fleetmx_core::{Clock, DomainError, DomainResult, SystemClock};

use crate::store::{ExpectedRevision, SnapshotStore, StoreError};

/// Fixed-delay retry for saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total save attempts, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(800))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The change is applied in memory but could not be stored.
    #[error("save failed after {attempts} attempt(s): {source}")]
    Persist {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The maintenance context bound to a snapshot store.
///
/// Each successful mutation is saved as a whole snapshot. When the store has
/// moved on (another writer saved first) the save is retried against the
/// newer revision and overwrites it.
pub struct Session<S, C = SystemClock> {
    store: S,
    clock: C,
    retry: RetryPolicy,
    context: MaintenanceContext,
    revision: u64,
    load_warnings: Vec<LoadWarning>,
}

impl<S: SnapshotStore, C: Clock> Session<S, C> {
    /// Load the stored state. A store that cannot be read yields an empty
    /// context at revision 0.
    pub fn open(store: S, clock: C, retry: RetryPolicy) -> Self {
        let now = clock.now();
        let (context, revision, load_warnings) = match store.load() {
            Ok(stored) => {
                let (context, warnings) = load(&stored.snapshot, now);
                (context, stored.revision, warnings)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not load stored state; starting empty");
                (MaintenanceContext::new(), 0, Vec::new())
            }
        };
        Self {
            store,
            clock,
            retry,
            context,
            revision,
            load_warnings,
        }
    }

    pub fn context(&self) -> &MaintenanceContext {
        &self.context
    }

    /// Revision the in-memory context was last loaded from or saved as.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.load_warnings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Apply `f` and save the result.
    ///
    /// `f` runs on a copy of the context, so a domain error leaves the session
    /// untouched. A save failure is returned after the change has been kept
    /// in memory.
    pub fn mutate<T, F>(&mut self, message: &str, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut MaintenanceContext, DateTime<Utc>) -> DomainResult<T>,
    {
        let now = self.clock.now();
        let mut draft = self.context.clone();
        let value = f(&mut draft, now)?;
        self.context = draft;
        self.persist(message)?;
        Ok(value)
    }

    /// Save the current context, retrying on conflicts and store errors.
    pub fn persist(&mut self, message: &str) -> Result<u64, SessionError> {
        let snapshot = serialize(&self.context);
        let mut expected = ExpectedRevision::Exact(self.revision);
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.store.save(&snapshot, expected, message) {
                Ok(revision) => {
                    self.revision = revision;
                    tracing::info!(revision, attempt, commit = message, "state persisted");
                    return Ok(revision);
                }
                Err(err) => err,
            };

            if let StoreError::Conflict { actual, .. } = &err {
                tracing::warn!(
                    expected = ?expected,
                    actual = *actual,
                    attempt,
                    "stored state moved on; overwriting with the local state"
                );
                expected = ExpectedRevision::Exact(*actual);
            } else {
                tracing::warn!(error = %err, attempt, "save failed");
            }

            if attempt >= attempts {
                tracing::error!(
                    attempts,
                    commit = message,
                    "giving up on save; change kept in memory"
                );
                return Err(SessionError::Persist {
                    attempts,
                    source: err,
                });
            }
            attempt += 1;
            if !self.retry.delay.is_zero() {
                std::thread::sleep(self.retry.delay);
            }
        }
    }

    /// Replace the in-memory context with the stored one.
    pub fn reload(&mut self) -> Result<&[LoadWarning], SessionError> {
        let stored = self.store.load()?;
        let (context, warnings) = load(&stored.snapshot, self.clock.now());
        self.context = context;
        self.revision = stored.revision;
        self.load_warnings = warnings;
        Ok(&self.load_warnings)
    }
}
