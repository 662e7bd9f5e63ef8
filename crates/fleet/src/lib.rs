//! Fleet domain module: maintenance policies, per-asset service records and
//! the assets themselves.
//!
//! Pure domain logic (no IO, no storage). Time is always passed in by the
//! caller.

pub mod asset;
pub mod policy;
pub mod record;

pub use asset::{Asset, AssetStatus, Fleet};
pub use policy::{Criticality, DueAxis, MaintenancePolicy, PolicyCatalog};
pub use record::ServiceRecord;
