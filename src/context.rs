//! Thread-local context stack: a per-thread stack of field bags plus a
//! separate trace-context stack, with a RAII guard that pops exactly the
//! frame it pushed. No cross-thread propagation — context is scoped to
//! the owning thread only.

use std::cell::RefCell;

use crate::record::{Fields, TraceContext};

thread_local! {
    static FIELD_STACK: RefCell<Vec<Fields>> = const { RefCell::new(Vec::new()) };
    static TRACE_STACK: RefCell<Vec<TraceContext>> = const { RefCell::new(Vec::new()) };
}

/// The merged view of every field bag currently pushed on this thread, in
/// push order (later pushes win on key collision) — what `Logger::log`
/// overlays the call-site fields on top of.
pub fn current_fields() -> Fields {
    FIELD_STACK.with(|stack| {
        let stack = stack.borrow();
        let mut merged = Fields::new();
        for frame in stack.iter() {
            merged.overlay(frame);
        }
        merged
    })
}

/// The innermost active trace context on this thread, if any.
pub fn current_trace_context() -> Option<TraceContext> {
    TRACE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// RAII guard returned by [`ContextScope::push`]; pops its frame on drop,
/// regardless of how the scope is exited (return, `?`, panic unwind).
pub struct ContextGuard {
    has_fields: bool,
    has_trace: bool,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if self.has_fields {
            FIELD_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
        if self.has_trace {
            TRACE_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

/// Entry point for pushing scoped fields and/or a trace context onto the
/// current thread's stack.
pub struct ContextScope;

impl ContextScope {
    /// Pushes `fields` as a new frame. Returns a guard that pops it on
    /// drop; nesting is unbounded and scopes may overlap arbitrarily as
    /// long as guards are dropped in reverse push order (normal Rust scope
    /// discipline guarantees this when the guard isn't moved out).
    pub fn push(fields: Fields) -> ContextGuard {
        FIELD_STACK.with(|stack| stack.borrow_mut().push(fields));
        ContextGuard {
            has_fields: true,
            has_trace: false,
        }
    }

    pub fn push_trace(trace_context: TraceContext) -> ContextGuard {
        TRACE_STACK.with(|stack| stack.borrow_mut().push(trace_context));
        ContextGuard {
            has_fields: false,
            has_trace: true,
        }
    }

    pub fn push_both(fields: Fields, trace_context: TraceContext) -> ContextGuard {
        FIELD_STACK.with(|stack| stack.borrow_mut().push(fields));
        TRACE_STACK.with(|stack| stack.borrow_mut().push(trace_context));
        ContextGuard {
            has_fields: true,
            has_trace: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scopes_overlay_and_unwind_in_order() {
        let mut outer_fields = Fields::new();
        outer_fields.set("request_id", "r1");
        let _outer = ContextScope::push(outer_fields);
        assert_eq!(current_fields().get("request_id").unwrap().as_str(), Some("r1"));

        {
            let mut inner_fields = Fields::new();
            inner_fields.set("request_id", "r2");
            inner_fields.set("step", "validate");
            let _inner = ContextScope::push(inner_fields);
            let merged = current_fields();
            assert_eq!(merged.get("request_id").unwrap().as_str(), Some("r2"));
            assert_eq!(merged.get("step").unwrap().as_str(), Some("validate"));
        }

        let merged = current_fields();
        assert_eq!(merged.get("request_id").unwrap().as_str(), Some("r1"));
        assert_eq!(merged.get("step"), None);
    }

    #[test]
    fn trace_context_scope_is_independent_of_field_scope() {
        assert!(current_trace_context().is_none());
        let tc = TraceContext::new("a".repeat(32), "b".repeat(16), "01", "").unwrap();
        let _guard = ContextScope::push_trace(tc.clone());
        assert_eq!(current_trace_context(), Some(tc));
    }

    #[test]
    fn guard_drop_pops_exactly_one_frame() {
        let mut f1 = Fields::new();
        f1.set("a", "1");
        let g1 = ContextScope::push(f1);
        let mut f2 = Fields::new();
        f2.set("b", "2");
        let g2 = ContextScope::push(f2);
        drop(g2);
        let merged = current_fields();
        assert!(merged.get("a").is_some());
        assert!(merged.get("b").is_none());
        drop(g1);
        assert!(current_fields().is_empty());
    }
}
