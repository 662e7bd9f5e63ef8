//! Failure history and reliability metrics (MTBF / MTTR).

pub mod log;

pub use log::{FailureEntry, ReliabilityLog};
