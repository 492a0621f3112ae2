// crates/crosscut-core/src/pointcut/mod.rs
// ============================================================================
// Module: Pointcuts
// Description: Canonical, composed, static, dynamic, and expression pointcuts.
// Purpose: Provide ready-made implementations of the matching interfaces.
// Dependencies: crate::interfaces, crosscut-expr, crosscut-meta, dashmap, regex
// ============================================================================

//! ## Overview
//! The canonical "match everything" predicates live here. Submodules provide
//! boolean composition, name/regex/annotation pointcuts, the control-flow
//! pointcut, and the adapter over the pointcut expression language.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod bean;
pub mod compose;
pub mod control_flow;
pub mod expression;
pub mod matchers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bean::BeanNameDesignator;
pub use compose::ClassFilters;
pub use compose::ComposablePointcut;
pub use compose::MethodMatchers;
pub use compose::Pointcuts;
pub use control_flow::ControlFlowPointcut;
pub use expression::ExpressionPointcut;
pub use matchers::AnnotationMatchingPointcut;
pub use matchers::NameMatchPointcut;
pub use matchers::RegexMethodPointcut;
pub use matchers::RootClassFilter;

use crosscut_meta::ClassInfo;
use crosscut_meta::MethodRef;

use crate::interfaces::ClassFilter;
use crate::interfaces::MethodMatcher;
use crate::interfaces::Pointcut;

// ============================================================================
// SECTION: Canonical Predicates
// ============================================================================

/// Class filter accepting every class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrueClassFilter;

impl ClassFilter for TrueClassFilter {
    fn matches(&self, _class: &ClassInfo) -> bool {
        true
    }
}

/// Static method matcher accepting every method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrueMethodMatcher;

impl MethodMatcher for TrueMethodMatcher {
    fn matches(&self, _method: &MethodRef, _target_class: &ClassInfo) -> bool {
        true
    }

    fn is_match_all(&self) -> bool {
        true
    }
}

/// Pointcut matching every method of every class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruePointcut;

impl Pointcut for TruePointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        &TrueClassFilter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        &TrueMethodMatcher
    }
}
