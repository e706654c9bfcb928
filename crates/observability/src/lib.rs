//! Tracing/logging setup shared by the portal binaries.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::{LogFormat, init};
