//! Current-span stacks
//!
//! Each span is pushed onto the stack of whoever is running when it starts:
//! - inside [`scope`], a task-local stack that follows the future across worker
//!   threads and `.await` points;
//! - inside any other tokio task, a stack keyed by the task id, so tasks sharing a
//!   worker thread never see each other's spans;
//! - outside the runtime, a thread-local stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task;
use uuid::Uuid;

/// 128-bit trace identifier, serialized as 32 hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TraceId(pub u128);

impl TraceId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_u128())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// 64-bit span identifier, serialized as 16 hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SpanId(pub u64);

impl SpanId {
    pub fn random() -> Self {
        let (high, low) = Uuid::new_v4().as_u64_pair();
        Self(if low == 0 { high | 1 } else { low })
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<TraceId> for String {
    fn from(id: TraceId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TraceId {
    type Error = std::num::ParseIntError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        u128::from_str_radix(&hex, 16).map(Self)
    }
}

impl From<SpanId> for String {
    fn from(id: SpanId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SpanId {
    type Error = std::num::ParseIntError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        u64::from_str_radix(&hex, 16).map(Self)
    }
}

/// Identity of a span within its trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

tokio::task_local! {
    static TASK_SPANS: RefCell<Vec<SpanContext>>;
}

thread_local! {
    static THREAD_SPANS: RefCell<Vec<SpanContext>> = const { RefCell::new(Vec::new()) };
}

static UNSCOPED_TASK_SPANS: Lazy<Mutex<HashMap<task::Id, Vec<SpanContext>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Run `f` on the stack of the caller: scoped task, unscoped task, or thread
fn with_stack<R>(f: impl FnOnce(&mut Vec<SpanContext>) -> R) -> R {
    if TASK_SPANS.try_with(|_| ()).is_ok() {
        return TASK_SPANS.with(|stack| f(&mut stack.borrow_mut()));
    }

    match task::try_id() {
        Some(id) => {
            let mut stacks = UNSCOPED_TASK_SPANS.lock();
            let stack = stacks.entry(id).or_default();
            let result = f(stack);
            if stack.is_empty() {
                stacks.remove(&id);
            }
            result
        }
        None => THREAD_SPANS.with(|stack| f(&mut stack.borrow_mut())),
    }
}

/// Run `future` with its own, initially empty, span stack
pub async fn scope<F: Future>(future: F) -> F::Output {
    scope_with(Vec::new(), future).await
}

/// Run `future` on a task-local stack seeded with `stack`
pub(crate) async fn scope_with<F: Future>(stack: Vec<SpanContext>, future: F) -> F::Output {
    TASK_SPANS.scope(RefCell::new(stack), future).await
}

/// Copy of the caller's current stack, outermost span first
pub(crate) fn snapshot() -> Vec<SpanContext> {
    with_stack(|stack| stack.clone())
}

/// Innermost open span of the calling task or thread
pub fn current() -> Option<SpanContext> {
    with_stack(|stack| stack.last().copied())
}

pub(crate) fn push(context: SpanContext) {
    with_stack(|stack| stack.push(context));
}

/// Outcome of removing a span from the current stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    /// It was the innermost span
    Top,
    /// It was open but not innermost
    OutOfOrder,
    /// Not on this task's or thread's stack
    Missing,
}

fn remove_from(stack: &mut Vec<SpanContext>, span_id: SpanId) -> Removal {
    match stack.iter().rposition(|c| c.span_id == span_id) {
        Some(pos) if pos + 1 == stack.len() => {
            stack.pop();
            Removal::Top
        }
        Some(pos) => {
            stack.remove(pos);
            Removal::OutOfOrder
        }
        None => Removal::Missing,
    }
}

pub(crate) fn remove(span_id: SpanId) -> Removal {
    let removal = with_stack(|stack| remove_from(stack, span_id));
    if removal == Removal::Missing {
        // ended by another task; drop it from the unscoped task that opened it
        let mut stacks = UNSCOPED_TASK_SPANS.lock();
        stacks.retain(|_, stack| {
            remove_from(stack, span_id);
            !stack.is_empty()
        });
    }
    removal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SpanContext {
        SpanContext {
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
        }
    }

    #[test]
    fn test_thread_stack_push_and_remove() {
        let outer = ctx();
        let inner = ctx();
        push(outer);
        push(inner);
        assert_eq!(current(), Some(inner));

        assert_eq!(remove(inner.span_id), Removal::Top);
        assert_eq!(current(), Some(outer));
        assert_eq!(remove(outer.span_id), Removal::Top);
        assert_eq!(current(), None);
        assert_eq!(remove(outer.span_id), Removal::Missing);
    }

    #[test]
    fn test_out_of_order_removal() {
        let outer = ctx();
        let inner = ctx();
        push(outer);
        push(inner);

        assert_eq!(remove(outer.span_id), Removal::OutOfOrder);
        assert_eq!(current(), Some(inner));
        assert_eq!(remove(inner.span_id), Removal::Top);
    }

    #[tokio::test]
    async fn test_task_scope_is_isolated_from_thread_stack() {
        let thread_span = ctx();
        push(thread_span);

        let seen = scope(async {
            assert_eq!(current(), None);
            let task_span = ctx();
            push(task_span);
            tokio::task::yield_now().await;
            let seen = current();
            remove(task_span.span_id);
            seen.map(|c| c.span_id)
        })
        .await;

        assert!(seen.is_some());
        assert_ne!(seen, Some(thread_span.span_id));
        assert_eq!(current(), Some(thread_span));
        remove(thread_span.span_id);
    }

    #[test]
    fn test_id_formatting() {
        assert_eq!(SpanId(255).to_string(), "00000000000000ff");
        assert_eq!(TraceId(1).to_string().len(), 32);

        let json = serde_json::to_string(&SpanId(255)).unwrap();
        assert_eq!(json, "\"00000000000000ff\"");
        let parsed: SpanId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SpanId(255));
    }
}
