//! The maintenance application context.
//!
//! `MaintenanceContext` owns the whole model (fleet, orders, requests,
//! inventory, failure log, notification trail) and exposes every operation
//! on it. `snapshot` converts it to and from the persisted schema.

pub mod context;
pub mod snapshot;
pub mod summary;

pub use context::{MANUAL_REASON, MaintenanceContext};
pub use snapshot::{
    AssetEntry, ComponentEntry, FailureRow, IntervalValue, LoadWarning, OrderRow, PartEntry,
    PolicyEntry, RequestRow, Snapshot, load, serialize,
};
pub use summary::{DUE_SOON_HORIZON_DAYS, FleetSummary};
