//! Spans and span guards

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::context::{self, Removal, SpanContext, SpanId, TraceId};
use super::tracker::TrackerInner;
use crate::error::{TallyError, TallyResult};
use crate::telemetry::attributes::{AttributeSet, AttributeValue};

/// Span outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "message", rename_all = "snake_case")]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error(String),
}

/// A finished span, as handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attributes: AttributeSet,
    pub status: SpanStatus,
}

impl SpanData {
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }
}

#[derive(Debug)]
struct SpanState {
    attributes: AttributeSet,
    status: SpanStatus,
    end_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct SpanInner {
    context: SpanContext,
    parent_span_id: Option<SpanId>,
    name: String,
    start_time: DateTime<Utc>,
    started: Instant,
    state: Mutex<SpanState>,
}

/// Cloneable handle to a span.
///
/// Handles outlive the span itself; once it has ended every mutation fails with
/// [`TallyError::SpanClosed`].
#[derive(Debug, Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

impl Span {
    pub(crate) fn new(
        name: String,
        context: SpanContext,
        parent_span_id: Option<SpanId>,
        attributes: AttributeSet,
    ) -> Self {
        Self {
            inner: Arc::new(SpanInner {
                context,
                parent_span_id,
                name,
                start_time: Utc::now(),
                started: Instant::now(),
                state: Mutex::new(SpanState {
                    attributes,
                    status: SpanStatus::Unset,
                    end_time: None,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context(&self) -> SpanContext {
        self.inner.context
    }

    pub fn trace_id(&self) -> TraceId {
        self.inner.context.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.inner.context.span_id
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.inner.parent_span_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.inner.start_time
    }

    pub fn is_ended(&self) -> bool {
        self.inner.state.lock().end_time.is_some()
    }

    /// Add or replace an attribute on an open span
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> TallyResult<()> {
        let mut state = self.inner.state.lock();
        if state.end_time.is_some() {
            return Err(TallyError::span_closed(&self.inner.name));
        }
        state.attributes.insert(key, value);
        Ok(())
    }

    pub fn set_status(&self, status: SpanStatus) -> TallyResult<()> {
        let mut state = self.inner.state.lock();
        if state.end_time.is_some() {
            return Err(TallyError::span_closed(&self.inner.name));
        }
        state.status = status;
        Ok(())
    }

    /// Mark the span failed with the error's message
    pub fn record_error(&self, error: &dyn fmt::Display) -> TallyResult<()> {
        self.set_status(SpanStatus::Error(error.to_string()))
    }

    pub fn attributes(&self) -> AttributeSet {
        self.inner.state.lock().attributes.clone()
    }

    pub fn status(&self) -> SpanStatus {
        self.inner.state.lock().status.clone()
    }

    /// End the span. Only the first call produces data.
    pub(crate) fn finish(&self) -> Option<SpanData> {
        let mut state = self.inner.state.lock();
        if state.end_time.is_some() {
            return None;
        }

        // derived from the monotonic clock so end >= start even if wall time jumps
        let elapsed = chrono::Duration::from_std(self.inner.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let end_time = self.inner.start_time + elapsed;
        state.end_time = Some(end_time);

        Some(SpanData {
            trace_id: self.inner.context.trace_id,
            span_id: self.inner.context.span_id,
            parent_span_id: self.inner.parent_span_id,
            name: self.inner.name.clone(),
            start_time: self.inner.start_time,
            end_time,
            attributes: state.attributes.clone(),
            status: state.status.clone(),
        })
    }
}

/// Scope guard for an open span.
///
/// The span is the current span of the calling task or thread until the guard is
/// dropped (or [`SpanGuard::end`] is called); it then ends and is queued for export.
#[must_use = "the span ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SpanGuard {
    span: Span,
    tracker: Arc<TrackerInner>,
}

impl SpanGuard {
    pub(crate) fn new(span: Span, tracker: Arc<TrackerInner>) -> Self {
        context::push(span.context());
        Self { span, tracker }
    }

    /// A handle that stays valid after the guard is gone
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// End the span now
    pub fn end(self) {}
}

impl Deref for SpanGuard {
    type Target = Span;

    fn deref(&self) -> &Span {
        &self.span
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        match context::remove(self.span.span_id()) {
            Removal::Top => {}
            Removal::OutOfOrder => tracing::warn!(
                span = %self.span.name(),
                "Span ended before its children"
            ),
            Removal::Missing => tracing::debug!(
                span = %self.span.name(),
                "Span ended outside the task or thread that started it"
            ),
        }

        if let Some(data) = self.span.finish() {
            self.tracker.enqueue(data);
        }
    }
}
