//! Work orders and operator work requests.
//!
//! This crate contains the lifecycle rules only (no storage, no scheduling).
//! Due-maintenance detection lives in `fleetmx-scheduler`.

pub mod order;
pub mod request;

pub use order::{CompletionOutcome, CompletionReport, WorkOrder, WorkOrderParts, WorkOrderStatus};
pub use request::{RequestStatus, WorkRequest, WorkRequestDraft};
