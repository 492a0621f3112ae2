// crates/crosscut-core/src/interfaces/mod.rs
// ============================================================================
// Module: Interception Interfaces
// Description: Predicate, interceptor, target, and collaborator contracts.
// Purpose: Define the seams the interception engine is assembled from.
// Dependencies: crate::{core, runtime}, crosscut_meta
// ============================================================================

//! ## Overview
//! Matching is split into a [`ClassFilter`] and a [`MethodMatcher`], paired
//! by a [`Pointcut`]. Behavior runs as a [`MethodInterceptor`] around a
//! [`MethodInvocation`]. Targets come from a [`TargetSource`]. The container
//! side of auto-proxying is reached through [`AdvisorSource`] and
//! [`TargetSourceCreator`], and proxy objects are built by a
//! [`ProxyConstructor`].
//!
//! Security posture: predicates must be pure and fail closed; a matcher that
//! cannot decide answers `false`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodRef;
use crosscut_meta::ObjectRef;
use crosscut_meta::Value;

use crate::core::AdvisorRef;
use crate::core::ConfigError;
use crate::core::InvocationError;
use crate::core::TargetSourceError;
use crate::runtime::AdvisedConfig;
use crate::runtime::MethodInvocation;

// ============================================================================
// SECTION: Matching Predicates
// ============================================================================

/// Predicate over classes.
pub trait ClassFilter: Send + Sync + fmt::Debug {
    /// Returns true when advice may apply to `class`.
    fn matches(&self, class: &ClassInfo) -> bool;
}

/// Predicate over methods, optionally refined by call arguments.
///
/// # Invariants
/// - [`MethodMatcher::matches_runtime`] is only called after
///   [`MethodMatcher::matches`] returned true for the same method and class
///   and [`MethodMatcher::is_runtime`] returned true.
pub trait MethodMatcher: Send + Sync + fmt::Debug {
    /// Static check for `method` invoked on an instance of `target_class`.
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool;

    /// Returns true when a per-call check is required after a static match.
    fn is_runtime(&self) -> bool {
        false
    }

    /// Returns true when calls of `method` on `target_class` need the per-call check.
    ///
    /// Never true when [`MethodMatcher::is_runtime`] is false.
    fn is_runtime_for(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        let _ = (method, target_class);
        self.is_runtime()
    }

    /// Per-call check against the current arguments.
    fn matches_runtime(&self, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        let _ = (method, target_class, args);
        true
    }

    /// Returns true when [`MethodMatcher::matches_with_introductions`] refines the static check.
    fn is_introduction_aware(&self) -> bool {
        false
    }

    /// Static check that knows whether the target carries introduced interfaces.
    fn matches_with_introductions(&self, method: &MethodRef, target_class: &ClassInfo, has_introductions: bool) -> bool {
        let _ = has_introductions;
        self.matches(method, target_class)
    }

    /// Returns true when every method matches statically.
    fn is_match_all(&self) -> bool {
        false
    }
}

/// A class filter and a method matcher addressed as one unit.
pub trait Pointcut: Send + Sync + fmt::Debug {
    /// Returns the class filter.
    fn class_filter(&self) -> &dyn ClassFilter;

    /// Returns the method matcher.
    fn method_matcher(&self) -> &dyn MethodMatcher;

    /// Forces any deferred compilation so configuration errors surface early.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the pointcut cannot be used.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Static form of the method matcher, using the introduction-aware variant when offered.
#[must_use]
pub fn static_match(
    matcher: &dyn MethodMatcher,
    method: &MethodRef,
    target_class: &ClassInfo,
    has_introductions: bool,
) -> bool {
    if matcher.is_introduction_aware() {
        matcher.matches_with_introductions(method, target_class, has_introductions)
    } else {
        matcher.matches(method, target_class)
    }
}

// ============================================================================
// SECTION: Interceptors
// ============================================================================

/// Canonical around-advice shape every behavior is adapted to.
pub trait MethodInterceptor: Send + Sync {
    /// Runs around the call; `invocation.proceed()` continues the chain.
    ///
    /// # Errors
    ///
    /// Returns whatever the chain or the interceptor itself raises.
    fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value, InvocationError>;
}

impl<F> MethodInterceptor for F
where
    F: Fn(&mut MethodInvocation) -> Result<Value, InvocationError> + Send + Sync,
{
    fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value, InvocationError> {
        self(invocation)
    }
}

// ============================================================================
// SECTION: Target Sources
// ============================================================================

/// Supplies the target object for each call.
pub trait TargetSource: Send + Sync + fmt::Debug {
    /// Returns the class of the targets this source produces, when known.
    fn target_class(&self) -> Option<ClassRef>;

    /// Returns true when every call receives the same target.
    fn is_static(&self) -> bool;

    /// Obtains the target for one call; `None` when there is no target.
    ///
    /// # Errors
    ///
    /// Returns [`TargetSourceError`] when a target cannot be produced.
    fn target(&self) -> Result<Option<ObjectRef>, TargetSourceError>;

    /// Releases a target obtained from [`TargetSource::target`].
    ///
    /// # Errors
    ///
    /// Returns [`TargetSourceError`] when release fails.
    fn release_target(&self, target: &ObjectRef) -> Result<(), TargetSourceError> {
        let _ = target;
        Ok(())
    }
}

// ============================================================================
// SECTION: Container Collaborators
// ============================================================================

/// Supplies candidate advisors, in priority order, to the auto-proxy engine.
pub trait AdvisorSource: Send + Sync {
    /// Returns every advisor that may apply to some component.
    fn candidate_advisors(&self) -> Vec<AdvisorRef>;

    /// Returns true when `bean_name` names an aspect component that must never be proxied.
    fn is_aspect(&self, bean_name: &str) -> bool {
        let _ = bean_name;
        false
    }
}

/// Provides a custom target source for a component.
pub trait TargetSourceCreator: Send + Sync {
    /// Returns a target source for `class`, or `None` to decline.
    fn target_source(&self, class: &ClassRef, bean_name: Option<&str>) -> Option<Arc<dyn TargetSource>>;
}

/// Builds a callable proxy object from a configuration.
pub trait ProxyConstructor: Send + Sync {
    /// Creates the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration cannot be proxied.
    fn create(&self, config: Arc<AdvisedConfig>) -> Result<ObjectRef, ConfigError>;
}
