//! Tally: in-process metrics and tracing with periodic batched export.
//!
//! This crate re-exports [`tally_core`]; see its documentation for the registry,
//! span tracker, export scheduler and sinks.

pub use tally_core::*;
