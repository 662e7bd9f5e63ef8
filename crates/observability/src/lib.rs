//! Tracing/logging setup shared by the fleet maintenance binaries.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, output format).
pub mod tracing;
