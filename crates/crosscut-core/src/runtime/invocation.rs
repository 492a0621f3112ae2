// crates/crosscut-core/src/runtime/invocation.rs
// ============================================================================
// Module: Method Invocation
// Description: The proceed engine and the ambient current-invocation channel.
// Purpose: Walk a resolved chain around exactly one target call per run.
// Dependencies: crate::{core, runtime}, crosscut_meta
// ============================================================================

//! ## Overview
//! A [`MethodInvocation`] is created per call and owns the cursor, the
//! (replaceable) arguments, and a [`JoinPoint`] with the per-call attribute
//! bag. The resolved chain is shared read-only between the invocation and
//! its clones.
//!
//! Each [`MethodInvocation::proceed`] advances the cursor. Deferred entries
//! run their matcher against the current arguments and are skipped for this
//! call when it declines. Once the cursor passes the last entry the target
//! is invoked; proceeding again after that is a chain error.
//!
//! While an invocation proceeds, its join point is visible on the current
//! thread through [`current_joinpoint`]. Nested calls push and pop, and a
//! guard restores the previous value on every exit path.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use crosscut_meta::ClassRef;
use crosscut_meta::MethodRef;
use crosscut_meta::ObjectRef;
use crosscut_meta::Value;
use crosscut_meta::invoke_reflectively;

use crate::core::InvocationError;
use crate::core::TargetSourceError;
use crate::runtime::chain::ChainElement;

// ============================================================================
// SECTION: Join Point
// ============================================================================

/// Facts about one proxied call, shared by the invocation and matchers.
pub struct JoinPoint {
    /// The proxy that received the call.
    proxy: Value,
    /// Target object, if the target source supplied one.
    target: Option<ObjectRef>,
    /// Method being called.
    method: MethodRef,
    /// Class used for matching.
    target_class: ClassRef,
    /// Component name of the proxy, if any.
    bean_name: Option<String>,
    /// Per-call attribute bag.
    attributes: RefCell<BTreeMap<String, Value>>,
}

impl JoinPoint {
    /// Returns the proxy.
    #[must_use]
    pub const fn proxy(&self) -> &Value {
        &self.proxy
    }

    /// Returns the target object.
    #[must_use]
    pub const fn target(&self) -> Option<&ObjectRef> {
        self.target.as_ref()
    }

    /// Returns the called method.
    #[must_use]
    pub const fn method(&self) -> &MethodRef {
        &self.method
    }

    /// Returns the class used for matching.
    #[must_use]
    pub const fn target_class(&self) -> &ClassRef {
        &self.target_class
    }

    /// Returns the component name.
    #[must_use]
    pub fn bean_name(&self) -> Option<&str> {
        self.bean_name.as_deref()
    }

    /// Sets or clears an attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: Option<Value>) {
        let key = key.into();
        let mut attributes = self.attributes.borrow_mut();
        match value {
            Some(value) => {
                attributes.insert(key, value);
            }
            None => {
                attributes.remove(&key);
            }
        }
    }

    /// Returns an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes.borrow().get(key).cloned()
    }

    /// Same call facts with an empty attribute bag.
    fn fresh(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
            target: self.target.clone(),
            method: Arc::clone(&self.method),
            target_class: Arc::clone(&self.target_class),
            bean_name: self.bean_name.clone(),
            attributes: RefCell::new(BTreeMap::new()),
        }
    }
}

impl fmt::Debug for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("method", &self.method.key().to_string())
            .field("target_class", &self.target_class.name())
            .field("bean_name", &self.bean_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Ambient Channel
// ============================================================================

thread_local! {
    /// Join points of the invocations proceeding on this thread, innermost last.
    static CALL_STACK: RefCell<Vec<Rc<JoinPoint>>> = const { RefCell::new(Vec::new()) };
}

/// Returns the join point of the innermost invocation proceeding on this thread.
#[must_use]
pub fn current_joinpoint() -> Option<Rc<JoinPoint>> {
    CALL_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Returns the join points enclosing the innermost one, outermost first.
#[must_use]
pub fn enclosing_joinpoints() -> Vec<Rc<JoinPoint>> {
    CALL_STACK.with(|stack| {
        let stack = stack.borrow();
        stack.split_last().map(|(_, rest)| rest.to_vec()).unwrap_or_default()
    })
}

/// Restores the call stack when an invocation stops proceeding.
struct ExposureGuard {
    /// Whether this guard pushed an entry.
    pushed: bool,
    /// Thread-bound.
    _not_send: PhantomData<*const ()>,
}

impl ExposureGuard {
    fn enter(joinpoint: &Rc<JoinPoint>) -> Self {
        let pushed = CALL_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.last().is_some_and(|top| Rc::ptr_eq(top, joinpoint)) {
                false
            } else {
                stack.push(Rc::clone(joinpoint));
                true
            }
        });
        Self {
            pushed,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ExposureGuard {
    fn drop(&mut self) {
        if self.pushed {
            CALL_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

// ============================================================================
// SECTION: Method Invocation
// ============================================================================

/// One run of a resolved chain.
///
/// # Invariants
/// - `cursor <= chain.len()`.
/// - The target is invoked at most once per invocation.
pub struct MethodInvocation {
    /// Call facts and attribute bag.
    joinpoint: Rc<JoinPoint>,
    /// Current arguments.
    args: Vec<Value>,
    /// Resolved chain, shared with clones.
    chain: Arc<[ChainElement]>,
    /// Next chain entry.
    cursor: usize,
    /// Set once the target has been invoked.
    target_reached: bool,
}

impl MethodInvocation {
    /// Starts an invocation.
    #[must_use]
    pub fn new(
        proxy: Value,
        target: Option<ObjectRef>,
        method: MethodRef,
        target_class: ClassRef,
        args: Vec<Value>,
        chain: Arc<[ChainElement]>,
    ) -> Self {
        Self {
            joinpoint: Rc::new(JoinPoint {
                proxy,
                target,
                method,
                target_class,
                bean_name: None,
                attributes: RefCell::new(BTreeMap::new()),
            }),
            args,
            chain,
            cursor: 0,
            target_reached: false,
        }
    }

    /// Sets the component name exposed to matchers.
    #[must_use]
    pub fn with_bean_name(mut self, bean_name: Option<String>) -> Self {
        let mut joinpoint = self.joinpoint.fresh();
        joinpoint.bean_name = bean_name;
        self.joinpoint = Rc::new(joinpoint);
        self
    }

    /// Continues with the next chain entry, or the target after the last one.
    ///
    /// # Errors
    ///
    /// Returns the target's error unchanged, [`InvocationError::Reflection`]
    /// when the target cannot be called reflectively, and
    /// [`InvocationError::Chain`] when called after the target was reached.
    pub fn proceed(&mut self) -> Result<Value, InvocationError> {
        let _exposed = ExposureGuard::enter(&self.joinpoint);
        while let Some(element) = self.chain.get(self.cursor).cloned() {
            self.cursor += 1;
            match element {
                ChainElement::Interceptor(interceptor) => return interceptor.invoke(self),
                ChainElement::Deferred {
                    interceptor,
                    pointcut,
                } => {
                    let matcher = pointcut.method_matcher();
                    if matcher.matches_runtime(&self.joinpoint.method, &self.joinpoint.target_class, &self.args) {
                        return interceptor.invoke(self);
                    }
                }
            }
        }
        self.invoke_joinpoint()
    }

    /// Calls the target with the current arguments.
    fn invoke_joinpoint(&mut self) -> Result<Value, InvocationError> {
        if self.target_reached {
            return Err(InvocationError::Chain(format!(
                "proceed called after `{}` already reached its target",
                self.joinpoint.method.signature()
            )));
        }
        self.target_reached = true;
        let Some(target) = &self.joinpoint.target else {
            return Err(InvocationError::TargetSource(TargetSourceError::Unavailable(format!(
                "no interceptor handled `{}` and there is no target",
                self.joinpoint.method.signature()
            ))));
        };
        Ok(invoke_reflectively(target, &self.joinpoint.method, &self.args)?)
    }

    /// Returns the called method.
    #[must_use]
    pub fn method(&self) -> &MethodRef {
        &self.joinpoint.method
    }

    /// Returns the current arguments.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    /// Replaces the arguments seen by later entries and the target.
    pub fn set_arguments(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    /// Returns the proxy.
    #[must_use]
    pub fn proxy(&self) -> &Value {
        &self.joinpoint.proxy
    }

    /// Returns the target object.
    #[must_use]
    pub fn target(&self) -> Option<&ObjectRef> {
        self.joinpoint.target.as_ref()
    }

    /// Returns the class used for matching.
    #[must_use]
    pub fn target_class(&self) -> &ClassRef {
        &self.joinpoint.target_class
    }

    /// Returns the shared join point.
    #[must_use]
    pub fn joinpoint(&self) -> &Rc<JoinPoint> {
        &self.joinpoint
    }

    /// Sets (`Some`) or clears (`None`) a user attribute.
    pub fn set_user_attribute(&self, key: impl Into<String>, value: Option<Value>) {
        self.joinpoint.set_attribute(key, value);
    }

    /// Returns a user attribute.
    #[must_use]
    pub fn user_attribute(&self, key: &str) -> Option<Value> {
        self.joinpoint.attribute(key)
    }

    /// Returns true once the target has been invoked.
    #[must_use]
    pub const fn target_reached(&self) -> bool {
        self.target_reached
    }

    /// Independent copy starting from the first chain entry with the same arguments.
    #[must_use]
    pub fn invocable_clone(&self) -> Self {
        self.invocable_clone_with(self.args.clone())
    }

    /// Independent copy starting from the first chain entry with new arguments.
    ///
    /// The copy has its own cursor and an empty attribute bag.
    #[must_use]
    pub fn invocable_clone_with(&self, args: Vec<Value>) -> Self {
        Self {
            joinpoint: Rc::new(self.joinpoint.fresh()),
            args,
            chain: Arc::clone(&self.chain),
            cursor: 0,
            target_reached: false,
        }
    }
}

impl fmt::Debug for MethodInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("joinpoint", &self.joinpoint)
            .field("args", &self.args)
            .field("cursor", &self.cursor)
            .field("chain_len", &self.chain.len())
            .field("target_reached", &self.target_reached)
            .finish()
    }
}
