//! Spare-part inventory.
//!
//! Stock levels are informational: materials recorded on work orders are not
//! reserved or deducted here. Restocking and write-offs go through
//! [`Inventory::adjust_stock`].

pub mod part;

pub use part::{Inventory, PartStock};
