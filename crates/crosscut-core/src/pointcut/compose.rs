// crates/crosscut-core/src/pointcut/compose.rs
// ============================================================================
// Module: Pointcut Composition
// Description: Union, intersection, and negation of filters, matchers, pointcuts.
// Purpose: Build compound predicates without losing dynamic-match semantics.
// Dependencies: crate::{core, interfaces, pointcut}, crosscut_meta
// ============================================================================

//! ## Overview
//! Composite matchers stay faithful to the static/dynamic contract: a
//! composite is runtime when any part is, and a part's runtime check is only
//! consulted after that same part matched statically.
//!
//! Negating a runtime matcher cannot be decided statically, so the negation
//! matches every method statically and negates the full check per call.

use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassInfo;
use crosscut_meta::MethodRef;
use crosscut_meta::Value;

use crate::core::ConfigError;
use crate::interfaces::ClassFilter;
use crate::interfaces::MethodMatcher;
use crate::interfaces::Pointcut;
use crate::interfaces::static_match;
use crate::pointcut::TrueClassFilter;
use crate::pointcut::TrueMethodMatcher;

// ============================================================================
// SECTION: Class Filters
// ============================================================================

/// Boolean composition of class filters.
#[derive(Debug, Clone, Copy)]
pub struct ClassFilters;

impl ClassFilters {
    /// Matches when either filter matches.
    #[must_use]
    pub fn union(left: Arc<dyn ClassFilter>, right: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
        Arc::new(UnionClassFilter(vec![left, right]))
    }

    /// Matches when both filters match.
    #[must_use]
    pub fn intersection(left: Arc<dyn ClassFilter>, right: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
        Arc::new(IntersectionClassFilter(vec![left, right]))
    }

    /// Matches when the filter does not.
    #[must_use]
    pub fn negate(filter: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
        Arc::new(NegateClassFilter(filter))
    }
}

#[derive(Debug)]
struct UnionClassFilter(Vec<Arc<dyn ClassFilter>>);

impl ClassFilter for UnionClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.0.iter().any(|filter| filter.matches(class))
    }
}

#[derive(Debug)]
struct IntersectionClassFilter(Vec<Arc<dyn ClassFilter>>);

impl ClassFilter for IntersectionClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.0.iter().all(|filter| filter.matches(class))
    }
}

#[derive(Debug)]
struct NegateClassFilter(Arc<dyn ClassFilter>);

impl ClassFilter for NegateClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        !self.0.matches(class)
    }
}

// ============================================================================
// SECTION: Method Matchers
// ============================================================================

/// Boolean composition of method matchers.
#[derive(Debug, Clone, Copy)]
pub struct MethodMatchers;

impl MethodMatchers {
    /// Matches when either matcher matches.
    #[must_use]
    pub fn union(left: Arc<dyn MethodMatcher>, right: Arc<dyn MethodMatcher>) -> Arc<dyn MethodMatcher> {
        Arc::new(UnionMethodMatcher {
            left: Gated::new(left, None),
            right: Gated::new(right, None),
        })
    }

    /// Matches when both matchers match.
    #[must_use]
    pub fn intersection(left: Arc<dyn MethodMatcher>, right: Arc<dyn MethodMatcher>) -> Arc<dyn MethodMatcher> {
        Arc::new(IntersectionMethodMatcher {
            left,
            right,
        })
    }

    /// Matches when the matcher does not.
    #[must_use]
    pub fn negate(matcher: Arc<dyn MethodMatcher>) -> Arc<dyn MethodMatcher> {
        Arc::new(NegateMethodMatcher(matcher))
    }
}

/// Method matcher that only counts for classes accepted by its filter.
#[derive(Debug)]
struct Gated {
    /// Matcher.
    matcher: Arc<dyn MethodMatcher>,
    /// Optional class gate.
    filter: Option<Arc<dyn ClassFilter>>,
}

impl Gated {
    fn new(matcher: Arc<dyn MethodMatcher>, filter: Option<Arc<dyn ClassFilter>>) -> Self {
        Self {
            matcher,
            filter,
        }
    }

    fn admits(&self, class: &ClassInfo) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.matches(class))
    }

    fn matches_static(&self, method: &MethodRef, class: &ClassInfo, has_introductions: bool) -> bool {
        self.admits(class) && static_match(self.matcher.as_ref(), method, class, has_introductions)
    }

    fn matches_call(&self, method: &MethodRef, class: &ClassInfo, args: &[Value]) -> bool {
        self.matches_static(method, class, false)
            && (!self.matcher.is_runtime() || self.matcher.matches_runtime(method, class, args))
    }
}

#[derive(Debug)]
struct UnionMethodMatcher {
    left: Gated,
    right: Gated,
}

impl MethodMatcher for UnionMethodMatcher {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.matches_with_introductions(method, target_class, false)
    }

    fn is_runtime(&self) -> bool {
        self.left.matcher.is_runtime() || self.right.matcher.is_runtime()
    }

    fn matches_runtime(&self, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        self.left.matches_call(method, target_class, args) || self.right.matches_call(method, target_class, args)
    }

    fn is_introduction_aware(&self) -> bool {
        self.left.matcher.is_introduction_aware() || self.right.matcher.is_introduction_aware()
    }

    fn matches_with_introductions(&self, method: &MethodRef, target_class: &ClassInfo, has_introductions: bool) -> bool {
        self.left.matches_static(method, target_class, has_introductions)
            || self.right.matches_static(method, target_class, has_introductions)
    }

    fn is_match_all(&self) -> bool {
        (self.left.filter.is_none() && self.left.matcher.is_match_all())
            || (self.right.filter.is_none() && self.right.matcher.is_match_all())
    }
}

#[derive(Debug)]
struct IntersectionMethodMatcher {
    left: Arc<dyn MethodMatcher>,
    right: Arc<dyn MethodMatcher>,
}

impl MethodMatcher for IntersectionMethodMatcher {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.left.matches(method, target_class) && self.right.matches(method, target_class)
    }

    fn is_runtime(&self) -> bool {
        self.left.is_runtime() || self.right.is_runtime()
    }

    fn matches_runtime(&self, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        let side = |matcher: &Arc<dyn MethodMatcher>| {
            !matcher.is_runtime() || matcher.matches_runtime(method, target_class, args)
        };
        side(&self.left) && side(&self.right)
    }

    fn is_introduction_aware(&self) -> bool {
        self.left.is_introduction_aware() || self.right.is_introduction_aware()
    }

    fn matches_with_introductions(&self, method: &MethodRef, target_class: &ClassInfo, has_introductions: bool) -> bool {
        static_match(self.left.as_ref(), method, target_class, has_introductions)
            && static_match(self.right.as_ref(), method, target_class, has_introductions)
    }

    fn is_match_all(&self) -> bool {
        self.left.is_match_all() && self.right.is_match_all()
    }
}

#[derive(Debug)]
struct NegateMethodMatcher(Arc<dyn MethodMatcher>);

impl MethodMatcher for NegateMethodMatcher {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.0.is_runtime() || !self.0.matches(method, target_class)
    }

    fn is_runtime(&self) -> bool {
        self.0.is_runtime()
    }

    fn matches_runtime(&self, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        !(self.0.matches(method, target_class) && self.0.matches_runtime(method, target_class, args))
    }
}

// ============================================================================
// SECTION: Pointcuts
// ============================================================================

/// Class filter view of a pointcut.
#[derive(Debug)]
struct PointcutClassFilter(Arc<dyn Pointcut>);

impl ClassFilter for PointcutClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.0.class_filter().matches(class)
    }
}

/// Method matcher view of a pointcut.
#[derive(Debug)]
struct PointcutMethodMatcher(Arc<dyn Pointcut>);

impl MethodMatcher for PointcutMethodMatcher {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.0.method_matcher().matches(method, target_class)
    }

    fn is_runtime(&self) -> bool {
        self.0.method_matcher().is_runtime()
    }

    fn matches_runtime(&self, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        self.0.method_matcher().matches_runtime(method, target_class, args)
    }

    fn is_introduction_aware(&self) -> bool {
        self.0.method_matcher().is_introduction_aware()
    }

    fn matches_with_introductions(&self, method: &MethodRef, target_class: &ClassInfo, has_introductions: bool) -> bool {
        self.0.method_matcher().matches_with_introductions(method, target_class, has_introductions)
    }

    fn is_match_all(&self) -> bool {
        self.0.method_matcher().is_match_all()
    }
}

/// Pointcut composition and one-off matching.
#[derive(Debug, Clone, Copy)]
pub struct Pointcuts;

impl Pointcuts {
    /// Matches where either pointcut matches.
    #[must_use]
    pub fn union(left: Arc<dyn Pointcut>, right: Arc<dyn Pointcut>) -> ComposablePointcut {
        ComposablePointcut::from_pointcut(left).union(right)
    }

    /// Matches where both pointcuts match.
    #[must_use]
    pub fn intersection(left: Arc<dyn Pointcut>, right: Arc<dyn Pointcut>) -> ComposablePointcut {
        ComposablePointcut::from_pointcut(left).intersection(right)
    }

    /// Full check of `pointcut` against one call, outside any chain.
    #[must_use]
    pub fn matches(pointcut: &dyn Pointcut, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        let matcher = pointcut.method_matcher();
        pointcut.class_filter().matches(target_class)
            && matcher.matches(method, target_class)
            && (!matcher.is_runtime() || matcher.matches_runtime(method, target_class, args))
    }
}

/// Pointcut built up from filters, matchers, and other pointcuts.
#[derive(Debug, Clone)]
pub struct ComposablePointcut {
    /// Current class filter.
    class_filter: Arc<dyn ClassFilter>,
    /// Current method matcher.
    method_matcher: Arc<dyn MethodMatcher>,
    /// Pointcuts folded in, kept for validation.
    parts: Vec<Arc<dyn Pointcut>>,
}

impl Default for ComposablePointcut {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposablePointcut {
    /// Pointcut matching everything.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Arc::new(TrueClassFilter), Arc::new(TrueMethodMatcher))
    }

    /// Pointcut from a filter and a matcher.
    #[must_use]
    pub fn from_parts(class_filter: Arc<dyn ClassFilter>, method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self {
            class_filter,
            method_matcher,
            parts: Vec::new(),
        }
    }

    /// Pointcut equivalent to `pointcut`.
    #[must_use]
    pub fn from_pointcut(pointcut: Arc<dyn Pointcut>) -> Self {
        Self {
            class_filter: Arc::new(PointcutClassFilter(Arc::clone(&pointcut))),
            method_matcher: Arc::new(PointcutMethodMatcher(Arc::clone(&pointcut))),
            parts: vec![pointcut],
        }
    }

    /// Widens the class filter.
    #[must_use]
    pub fn union_class_filter(mut self, filter: Arc<dyn ClassFilter>) -> Self {
        self.class_filter = ClassFilters::union(self.class_filter, filter);
        self
    }

    /// Narrows the class filter.
    #[must_use]
    pub fn intersect_class_filter(mut self, filter: Arc<dyn ClassFilter>) -> Self {
        self.class_filter = ClassFilters::intersection(self.class_filter, filter);
        self
    }

    /// Widens the method matcher.
    #[must_use]
    pub fn union_method_matcher(mut self, matcher: Arc<dyn MethodMatcher>) -> Self {
        self.method_matcher = MethodMatchers::union(self.method_matcher, matcher);
        self
    }

    /// Narrows the method matcher.
    #[must_use]
    pub fn intersect_method_matcher(mut self, matcher: Arc<dyn MethodMatcher>) -> Self {
        self.method_matcher = MethodMatchers::intersection(self.method_matcher, matcher);
        self
    }

    /// Matches where this or `other` matches; each side keeps its own class filter.
    #[must_use]
    pub fn union(mut self, other: Arc<dyn Pointcut>) -> Self {
        let other_filter: Arc<dyn ClassFilter> = Arc::new(PointcutClassFilter(Arc::clone(&other)));
        self.method_matcher = Arc::new(UnionMethodMatcher {
            left: Gated::new(self.method_matcher, Some(Arc::clone(&self.class_filter))),
            right: Gated::new(Arc::new(PointcutMethodMatcher(Arc::clone(&other))), Some(Arc::clone(&other_filter))),
        });
        self.class_filter = ClassFilters::union(self.class_filter, other_filter);
        self.parts.push(other);
        self
    }

    /// Matches where this and `other` match.
    #[must_use]
    pub fn intersection(mut self, other: Arc<dyn Pointcut>) -> Self {
        self.class_filter =
            ClassFilters::intersection(self.class_filter, Arc::new(PointcutClassFilter(Arc::clone(&other))));
        self.method_matcher =
            MethodMatchers::intersection(self.method_matcher, Arc::new(PointcutMethodMatcher(Arc::clone(&other))));
        self.parts.push(other);
        self
    }
}

impl Pointcut for ComposablePointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        self.class_filter.as_ref()
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self.method_matcher.as_ref()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.parts.iter().try_for_each(|part| part.validate())
    }
}

impl fmt::Display for ComposablePointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComposablePointcut({} parts)", self.parts.len())
    }
}
