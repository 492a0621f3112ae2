// crates/crosscut-core/src/runtime/chain.rs
// ============================================================================
// Module: Advisor Chain Factory
// Description: Resolution of advisors into ordered interceptor chains.
// Purpose: Decide per method which behaviors run, in declared order.
// Dependencies: crate::{core, interfaces, runtime}, crosscut_meta, tracing
// ============================================================================

//! ## Overview
//! [`DefaultChainFactory::resolve`] walks the advisors of a configuration in
//! declared order and emits one [`ChainElement`] per applicable advisor:
//!
//! - Introductions apply when the configuration is pre-filtered or their
//!   class filter accepts the target class.
//! - Pointcut advisors apply when the class filter accepts (or the list is
//!   pre-filtered) and the method matcher matches statically. Runtime
//!   matchers produce [`ChainElement::Deferred`] entries.
//! - Unconditional advisors always apply.
//!
//! [`can_apply`] is the class-level pre-check used by auto-proxying: a
//! pointcut advisor can apply only when some method reachable on the class
//! matches statically.

use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodRef;

use crate::core::AdvisorBinding;
use crate::core::AdvisorRef;
use crate::core::ConfigError;
use crate::interfaces::MethodInterceptor;
use crate::interfaces::Pointcut;
use crate::interfaces::static_match;
use crate::runtime::advised::AdvisedConfig;

// ============================================================================
// SECTION: Chain Elements
// ============================================================================

/// One entry of a resolved chain.
#[derive(Clone)]
pub enum ChainElement {
    /// Interceptor that always runs.
    Interceptor(Arc<dyn MethodInterceptor>),
    /// Interceptor gated by a per-call matcher check.
    Deferred {
        /// Interceptor to run when the check passes.
        interceptor: Arc<dyn MethodInterceptor>,
        /// Pointcut whose method matcher is consulted per call.
        pointcut: Arc<dyn Pointcut>,
    },
}

impl ChainElement {
    /// Returns the interceptor.
    #[must_use]
    pub fn interceptor(&self) -> &Arc<dyn MethodInterceptor> {
        match self {
            Self::Interceptor(interceptor)
            | Self::Deferred {
                interceptor, ..
            } => interceptor,
        }
    }

    /// Returns true for entries gated by a per-call check.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

impl fmt::Debug for ChainElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interceptor(_) => f.write_str("Interceptor"),
            Self::Deferred {
                pointcut, ..
            } => f.debug_struct("Deferred").field("pointcut", pointcut).finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// SECTION: Chain Factory
// ============================================================================

/// Resolves the chain for one method on one target class.
pub trait AdvisorChainFactory: Send + Sync {
    /// Returns the ordered chain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an advice cannot be adapted.
    fn resolve(
        &self,
        config: &AdvisedConfig,
        method: &MethodRef,
        target_class: &ClassInfo,
    ) -> Result<Vec<ChainElement>, ConfigError>;
}

/// Standard chain factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChainFactory;

impl AdvisorChainFactory for DefaultChainFactory {
    fn resolve(
        &self,
        config: &AdvisedConfig,
        method: &MethodRef,
        target_class: &ClassInfo,
    ) -> Result<Vec<ChainElement>, ConfigError> {
        let advisors = config.advisors();
        let registry = config.adapter_registry();
        let pre_filtered = config.is_pre_filtered();
        let has_introductions = has_matching_introduction(&advisors, target_class);
        let mut chain = Vec::with_capacity(advisors.len());

        for advisor in &advisors {
            match advisor.binding() {
                AdvisorBinding::Introduction {
                    class_filter, ..
                } => {
                    if pre_filtered || class_filter.matches(target_class) {
                        chain.push(ChainElement::Interceptor(registry.wrap(advisor.advice())?));
                    }
                }
                AdvisorBinding::Pointcut(pointcut) => {
                    if !(pre_filtered || pointcut.class_filter().matches(target_class)) {
                        continue;
                    }
                    let matcher = pointcut.method_matcher();
                    if !static_match(matcher, method, target_class, has_introductions) {
                        continue;
                    }
                    let interceptor = registry.wrap(advisor.advice())?;
                    if matcher.is_runtime_for(method, target_class) {
                        chain.push(ChainElement::Deferred {
                            interceptor,
                            pointcut: Arc::clone(pointcut),
                        });
                    } else {
                        chain.push(ChainElement::Interceptor(interceptor));
                    }
                }
                AdvisorBinding::Always => {
                    chain.push(ChainElement::Interceptor(registry.wrap(advisor.advice())?));
                }
            }
        }

        tracing::debug!(
            target: "crosscut::chain",
            method = %method.key(),
            target_class = target_class.name(),
            advisors = advisors.len(),
            entries = chain.len(),
            "resolved advisor chain"
        );
        Ok(chain)
    }
}

/// Returns true when any introduction advisor accepts `class`.
#[must_use]
pub fn has_matching_introduction(advisors: &[AdvisorRef], class: &ClassInfo) -> bool {
    advisors.iter().any(|advisor| match advisor.binding() {
        AdvisorBinding::Introduction {
            class_filter, ..
        } => class_filter.matches(class),
        _ => false,
    })
}

// ============================================================================
// SECTION: Class-Level Applicability
// ============================================================================

/// Returns true when `advisor` could apply to some method of `class`.
#[must_use]
pub fn can_apply(advisor: &AdvisorRef, class: &ClassInfo, has_introductions: bool) -> bool {
    match advisor.binding() {
        AdvisorBinding::Always => true,
        AdvisorBinding::Introduction {
            class_filter, ..
        } => class_filter.matches(class),
        AdvisorBinding::Pointcut(pointcut) => can_apply_pointcut(pointcut.as_ref(), class, has_introductions),
    }
}

/// Returns true when `pointcut` matches some method reachable on `class`.
///
/// Considers methods declared by the class, its superclasses, and its full
/// interface closure.
#[must_use]
pub fn can_apply_pointcut(pointcut: &dyn Pointcut, class: &ClassInfo, has_introductions: bool) -> bool {
    if !pointcut.class_filter().matches(class) {
        return false;
    }
    let matcher = pointcut.method_matcher();
    if matcher.is_match_all() {
        return true;
    }
    let mut owners: Vec<ClassRef> = class.superclasses().cloned().collect();
    owners.extend(class.all_interfaces());
    class
        .declared_methods()
        .iter()
        .chain(owners.iter().flat_map(|owner| owner.declared_methods().iter()))
        .any(|method| static_match(matcher, method, class, has_introductions))
}

/// Filters `candidates` down to the advisors that can apply to `class`.
///
/// Introductions are evaluated first so pointcut advisors see whether the
/// class will carry introduced interfaces. Declared order is preserved.
#[must_use]
pub fn find_applicable_advisors(candidates: &[AdvisorRef], class: &ClassInfo) -> Vec<AdvisorRef> {
    let introductions: Vec<bool> =
        candidates.iter().map(|advisor| advisor.is_introduction() && can_apply(advisor, class, false)).collect();
    let has_introductions = introductions.iter().any(|applies| *applies);
    candidates
        .iter()
        .zip(introductions)
        .filter(|(advisor, introduction_applies)| {
            if advisor.is_introduction() { *introduction_applies } else { can_apply(advisor, class, has_introductions) }
        })
        .map(|(advisor, _)| Arc::clone(advisor))
        .collect()
}
