//! Span tracking
//!
//! A [`SpanTracker`] hands out [`SpanGuard`]s. While a guard is alive its span is
//! the parent of any span started on the same task (inside [`scope`]) or thread.
//! Dropping the guard ends the span and queues a [`SpanData`] for export.

pub mod context;
pub mod span;
pub mod tracker;

pub use context::{SpanContext, SpanId, TraceId, scope};
pub use span::{Span, SpanData, SpanGuard, SpanStatus};
pub use tracker::{DEFAULT_MAX_QUEUE, SpanTracker};
