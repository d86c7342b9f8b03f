//! Per-request execution state

mod context;
mod field_lookup;

pub use context::{ExecutionContext, SourceStatus};
