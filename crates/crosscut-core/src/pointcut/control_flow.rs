// crates/crosscut-core/src/pointcut/control_flow.rs
// ============================================================================
// Module: Control-Flow Pointcut
// Description: Dynamic pointcut over the enclosing invocations of a call.
// Purpose: Apply advice only beneath a given class or method on the stack.
// Dependencies: crate::{interfaces, pointcut, runtime}, crosscut_meta
// ============================================================================

//! ## Overview
//! [`ControlFlowPointcut`] matches every method statically and decides per
//! call: the call matches when some enclosing proxied invocation on the
//! current thread targets the configured class (or a subtype) and, if a
//! method name is configured, that method.
//!
//! The per-call check walks the ambient invocation stack, so it is among the
//! more expensive matchers. [`ControlFlowPointcut::evaluations`] reports how
//! often it ran.

use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crosscut_meta::ClassInfo;
use crosscut_meta::MethodRef;
use crosscut_meta::Value;

use crate::interfaces::ClassFilter;
use crate::interfaces::MethodMatcher;
use crate::interfaces::Pointcut;
use crate::pointcut::TrueClassFilter;
use crate::runtime::enclosing_joinpoints;

/// Matches calls made beneath an invocation of a given class or method.
pub struct ControlFlowPointcut {
    /// Enclosing target type.
    class_name: String,
    /// Enclosing method name; `None` accepts any method of the type.
    method_name: Option<String>,
    /// Number of per-call checks performed.
    evaluations: AtomicUsize,
}

impl ControlFlowPointcut {
    /// Matches beneath any invocation on `class_name`.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: None,
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Matches beneath invocations of `method_name` on `class_name`.
    #[must_use]
    pub fn for_method(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            method_name: Some(method_name.into()),
            ..Self::new(class_name)
        }
    }

    /// Returns how many per-call checks have run.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn under_control_flow(&self) -> bool {
        enclosing_joinpoints().iter().any(|joinpoint| {
            joinpoint.target_class().is_subtype_of_name(&self.class_name)
                && self.method_name.as_deref().is_none_or(|name| joinpoint.method().name() == name)
        })
    }
}

impl MethodMatcher for ControlFlowPointcut {
    fn matches(&self, _method: &MethodRef, _target_class: &ClassInfo) -> bool {
        true
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_runtime(&self, _method: &MethodRef, _target_class: &ClassInfo, _args: &[Value]) -> bool {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.under_control_flow()
    }
}

impl Pointcut for ControlFlowPointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        &TrueClassFilter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

impl fmt::Debug for ControlFlowPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlFlowPointcut")
            .field("class_name", &self.class_name)
            .field("method_name", &self.method_name)
            .finish_non_exhaustive()
    }
}
