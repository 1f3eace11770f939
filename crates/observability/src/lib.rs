//! Tracing and logging setup shared by the binary and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
