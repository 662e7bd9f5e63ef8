//! Persistence boundary for the maintenance context.
//!
//! The whole state is stored as one snapshot guarded by a revision number.
//! Writers use optimistic concurrency (`ExpectedRevision`); the [`Session`]
//! retries stale saves and the last whole save wins.

pub mod config;
pub mod file;
pub mod session;
pub mod store;

pub use config::StoreConfig;
pub use file::FileSnapshotStore;
pub use session::{RetryPolicy, Session, SessionError};
pub use store::{ExpectedRevision, InMemorySnapshotStore, SnapshotStore, StoreError, StoredSnapshot};
