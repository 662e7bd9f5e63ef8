//! Preventive maintenance scheduling.
//!
//! Scans the fleet against each asset's service records, emits due work
//! orders, and finalises completions by advancing the service baseline.

pub mod scheduler;

pub use scheduler::{CompletedOrder, SCHEDULED_REASON, Scheduler, has_open_order};
