//! Span tracker
//!
//! Opens spans as children of the current span, and queues finished spans until the
//! export scheduler drains them in batches.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::context::{self, SpanContext, SpanId, TraceId};
use super::span::{Span, SpanData, SpanGuard, SpanStatus};
use crate::error::{TallyError, TallyResult};
use crate::telemetry::attributes::AttributeSet;

/// Default bound on finished spans waiting for export
pub const DEFAULT_MAX_QUEUE: usize = 2048;

#[derive(Debug)]
pub(crate) struct TrackerInner {
    pending: Mutex<Vec<SpanData>>,
    max_queue: usize,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl TrackerInner {
    pub(crate) fn enqueue(&self, data: SpanData) {
        // `closed` is read under the queue lock so a span cannot slip in after the
        // final drain
        let mut pending = self.pending.lock();
        if self.closed.load(Ordering::Acquire) {
            drop(pending);
            tracing::debug!(span = %data.name, "Span ended after shutdown, dropped");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if pending.len() >= self.max_queue {
            drop(pending);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(span = %data.name, max_queue = self.max_queue, "Span queue full, dropped span");
            return;
        }
        pending.push(data);
    }
}

/// Creates spans and collects them once they end
#[derive(Debug, Clone)]
pub struct SpanTracker {
    inner: Arc<TrackerInner>,
}

impl SpanTracker {
    pub fn new() -> Self {
        Self::with_max_queue(DEFAULT_MAX_QUEUE)
    }

    pub fn with_max_queue(max_queue: usize) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                pending: Mutex::new(Vec::new()),
                max_queue: max_queue.max(1),
                closed: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Start a span under the current span (or as a new root)
    pub fn start_span(&self, name: impl Into<String>) -> TallyResult<SpanGuard> {
        self.start_span_with(name, AttributeSet::new())
    }

    /// Start a span with initial attributes
    pub fn start_span_with(
        &self,
        name: impl Into<String>,
        attributes: impl Into<AttributeSet>,
    ) -> TallyResult<SpanGuard> {
        if self.is_shut_down() {
            return Err(TallyError::shutdown("start_span"));
        }

        let (trace_id, parent_span_id) = match context::current() {
            Some(parent) => (parent.trace_id, Some(parent.span_id)),
            None => (TraceId::random(), None),
        };
        let span_context = SpanContext {
            trace_id,
            span_id: SpanId::random(),
        };

        let span = Span::new(name.into(), span_context, parent_span_id, attributes.into());
        Ok(SpanGuard::new(span, Arc::clone(&self.inner)))
    }

    /// Run `f` inside a span. An `Err` result marks the span failed, `Ok` marks it ok.
    pub fn in_span<T, E, F>(&self, name: impl Into<String>, f: F) -> Result<T, E>
    where
        F: FnOnce(&Span) -> Result<T, E>,
        E: From<TallyError> + fmt::Display,
    {
        let guard = self.start_span(name)?;
        let result = f(&guard);
        // the closure may already have set a status
        if guard.status() == SpanStatus::Unset {
            let status = match &result {
                Ok(_) => SpanStatus::Ok,
                Err(e) => SpanStatus::Error(e.to_string()),
            };
            guard.set_status(status)?;
        }
        result
    }

    /// Async counterpart of [`SpanTracker::in_span`].
    ///
    /// The future runs on its own task-local stack seeded with the caller's, so the
    /// span is a child of the caller's current span and is never visible to other
    /// tasks, or to other futures polled by the same task.
    pub async fn in_span_async<T, E, F, Fut>(&self, name: impl Into<String>, f: F) -> Result<T, E>
    where
        F: FnOnce(Span) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TallyError> + fmt::Display,
    {
        let name = name.into();
        context::scope_with(context::snapshot(), async move {
            let guard = self.start_span(name).map_err(E::from)?;
            let result = f(guard.span()).await;
            if guard.status() == SpanStatus::Unset {
                let status = match &result {
                    Ok(_) => SpanStatus::Ok,
                    Err(e) => SpanStatus::Error(e.to_string()),
                };
                guard.set_status(status).map_err(E::from)?;
            }
            result
        })
        .await
    }

    /// Give `future` its own task-local span stack
    pub async fn scope<F: Future>(future: F) -> F::Output {
        context::scope(future).await
    }

    /// Innermost open span of the calling task or thread
    pub fn current_span(&self) -> Option<SpanContext> {
        context::current()
    }

    /// Take every finished span queued so far, in end order
    pub fn drain(&self) -> Vec<SpanData> {
        std::mem::take(&mut *self.inner.pending.lock())
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Spans discarded because the queue was full or the tracker was shut down
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Refuse new spans. Spans already queued stay drainable.
    /// Returns false if the tracker was already shut down.
    pub fn shutdown(&self) -> bool {
        let _pending = self.inner.pending.lock();
        !self.inner.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl Default for SpanTracker {
    fn default() -> Self {
        Self::new()
    }
}
