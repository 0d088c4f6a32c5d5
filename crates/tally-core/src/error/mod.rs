//! Error types for Tally
//!
//! Every fallible operation in the pipeline returns [`TallyResult`]. Errors on the
//! recording path are local to the caller: they are surfaced, never panic, and never
//! take the exporter down with them. Export failures are absorbed by the scheduler
//! and only show up in logs and export statistics.

mod constructors;
mod conversions;
mod types;
mod unified_error;

pub use types::{TallyError, TallyResult, UnifiedError};
