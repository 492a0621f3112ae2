// crates/crosscut-core/src/runtime/creation.rs
// ============================================================================
// Module: Proxy Creation Context
// Description: Thread-local name of the component whose proxy is being built.
// Purpose: Let context-sensitive matchers see the component during matching.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Matching often happens outside any call (eligibility checks, chain
//! resolution). [`ProxyCreationContext::enter`] records the component name
//! for the current thread until the returned guard drops, so designators
//! like `bean(...)` can consult it.

use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    /// Component names being processed on this thread, innermost last.
    static CURRENT_BEANS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Guard scoping a component name to the current thread.
#[derive(Debug)]
pub struct ProxyCreationContext {
    /// Thread-bound.
    _not_send: PhantomData<*const ()>,
}

impl ProxyCreationContext {
    /// Records `bean_name` until the guard drops.
    #[must_use]
    pub fn enter(bean_name: &str) -> Self {
        CURRENT_BEANS.with(|beans| beans.borrow_mut().push(bean_name.to_string()));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Returns the innermost recorded component name.
    #[must_use]
    pub fn current_bean_name() -> Option<String> {
        CURRENT_BEANS.with(|beans| beans.borrow().last().cloned())
    }
}

impl Drop for ProxyCreationContext {
    fn drop(&mut self) {
        CURRENT_BEANS.with(|beans| {
            beans.borrow_mut().pop();
        });
    }
}
