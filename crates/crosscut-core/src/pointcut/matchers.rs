// crates/crosscut-core/src/pointcut/matchers.rs
// ============================================================================
// Module: Static Pointcuts
// Description: Name, regex, annotation, and root-class predicates.
// Purpose: Cover the common static selections without an expression.
// Dependencies: crate::{core, interfaces, pointcut}, crosscut_expr, crosscut_meta, regex
// ============================================================================

//! ## Overview
//! Every pointcut here is decided from types alone and never needs a
//! per-call check.

use std::sync::Arc;

use crosscut_expr::NamePattern;
use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodRef;
use crosscut_meta::most_specific_method;
use regex::Regex;

use crate::core::ConfigError;
use crate::interfaces::ClassFilter;
use crate::interfaces::MethodMatcher;
use crate::interfaces::Pointcut;
use crate::pointcut::TrueClassFilter;

// ============================================================================
// SECTION: Name Match
// ============================================================================

/// Matches methods by simple name, with `*` wildcards.
#[derive(Debug, Clone)]
pub struct NameMatchPointcut {
    /// Accepted name patterns.
    patterns: Vec<NamePattern>,
}

impl NameMatchPointcut {
    /// Pointcut accepting any of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for malformed patterns.
    pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = names
            .into_iter()
            .map(|name| {
                NamePattern::parse(name.as_ref()).map_err(|reason| ConfigError::InvalidPattern {
                    pattern: name.as_ref().to_string(),
                    reason,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            patterns,
        })
    }
}

impl MethodMatcher for NameMatchPointcut {
    fn matches(&self, method: &MethodRef, _target_class: &ClassInfo) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(method.name()))
    }
}

impl Pointcut for NameMatchPointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        &TrueClassFilter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

// ============================================================================
// SECTION: Regex
// ============================================================================

/// Matches `Class.method` against regular expressions.
///
/// Both the target class and the declaring class are tried. A candidate
/// matches when it matches a pattern and no exclusion.
#[derive(Debug, Clone)]
pub struct RegexMethodPointcut {
    /// Accepted patterns, anchored.
    patterns: Vec<Regex>,
    /// Excluded patterns, anchored.
    exclusions: Vec<Regex>,
}

impl RegexMethodPointcut {
    /// Pointcut accepting any of `patterns` except `exclusions`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] when a regex does not compile.
    pub fn new<I, J, S, T>(patterns: I, exclusions: J) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Ok(Self {
            patterns: patterns.into_iter().map(|pattern| anchored(pattern.as_ref())).collect::<Result<_, _>>()?,
            exclusions: exclusions.into_iter().map(|pattern| anchored(pattern.as_ref())).collect::<Result<_, _>>()?,
        })
    }

    fn candidate_matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(candidate))
            && !self.exclusions.iter().any(|exclusion| exclusion.is_match(candidate))
    }
}

fn anchored(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

impl MethodMatcher for RegexMethodPointcut {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.candidate_matches(&format!("{}.{}", target_class.name(), method.name()))
            || (method.declaring() != target_class.name()
                && self.candidate_matches(&format!("{}.{}", method.declaring(), method.name())))
    }
}

impl Pointcut for RegexMethodPointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        &TrueClassFilter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

// ============================================================================
// SECTION: Annotation Match
// ============================================================================

/// Class filter on a class-level annotation.
#[derive(Debug, Clone)]
struct AnnotationClassFilter {
    /// Required annotation; `None` accepts every class.
    annotation: Option<String>,
    /// Also look at superclasses and interfaces.
    inherited: bool,
}

impl ClassFilter for AnnotationClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        let Some(annotation) = &self.annotation else {
            return true;
        };
        class.has_annotation(annotation)
            || (self.inherited
                && (class.superclasses().any(|parent| parent.has_annotation(annotation))
                    || class.all_interfaces().iter().any(|iface| iface.has_annotation(annotation))))
    }
}

/// Method matcher on a method-level annotation.
#[derive(Debug, Clone)]
struct AnnotationMethodMatcher {
    /// Required annotation; `None` accepts every method.
    annotation: Option<String>,
    /// Also look at overridden declarations.
    inherited: bool,
}

impl MethodMatcher for AnnotationMethodMatcher {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        let Some(annotation) = &self.annotation else {
            return true;
        };
        if method.has_annotation(annotation) || most_specific_method(method, target_class).has_annotation(annotation) {
            return true;
        }
        self.inherited && overridden(method, target_class).iter().any(|declared| declared.has_annotation(annotation))
    }

    fn is_match_all(&self) -> bool {
        self.annotation.is_none()
    }
}

/// Declarations of the same signature across the hierarchy of `class`.
fn overridden(method: &MethodRef, class: &ClassInfo) -> Vec<MethodRef> {
    let mut hierarchy: Vec<ClassRef> = class.superclasses().cloned().collect();
    hierarchy.extend(class.all_interfaces());
    hierarchy.iter().filter_map(|owner| owner.declared_method(method.name(), method.params())).collect()
}

/// Matches on class and/or method annotations.
#[derive(Debug, Clone)]
pub struct AnnotationMatchingPointcut {
    /// Class-level part.
    class_filter: AnnotationClassFilter,
    /// Method-level part.
    method_matcher: AnnotationMethodMatcher,
}

impl AnnotationMatchingPointcut {
    /// Pointcut requiring the given annotations; `None` means "any".
    #[must_use]
    pub fn new(class_annotation: Option<&str>, method_annotation: Option<&str>) -> Self {
        Self {
            class_filter: AnnotationClassFilter {
                annotation: class_annotation.map(str::to_string),
                inherited: false,
            },
            method_matcher: AnnotationMethodMatcher {
                annotation: method_annotation.map(str::to_string),
                inherited: false,
            },
        }
    }

    /// Pointcut on a class-level annotation only.
    #[must_use]
    pub fn for_class_annotation(annotation: &str) -> Self {
        Self::new(Some(annotation), None)
    }

    /// Pointcut on a method-level annotation only.
    #[must_use]
    pub fn for_method_annotation(annotation: &str) -> Self {
        Self::new(None, Some(annotation))
    }

    /// Also honors annotations on superclasses, interfaces, and overridden methods.
    #[must_use]
    pub const fn inherited(mut self) -> Self {
        self.class_filter.inherited = true;
        self.method_matcher.inherited = true;
        self
    }
}

impl Pointcut for AnnotationMatchingPointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        &self.class_filter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        &self.method_matcher
    }
}

// ============================================================================
// SECTION: Root Class
// ============================================================================

/// Accepts subtypes of a root type.
#[derive(Debug, Clone)]
pub struct RootClassFilter {
    /// Root type name.
    root: String,
}

impl RootClassFilter {
    /// Filter accepting `root` and its subtypes.
    #[must_use]
    pub fn new(root: &ClassRef) -> Self {
        Self {
            root: root.name().to_string(),
        }
    }

    /// Filter wrapped for composition.
    #[must_use]
    pub fn shared(root: &ClassRef) -> Arc<dyn ClassFilter> {
        Arc::new(Self::new(root))
    }
}

impl ClassFilter for RootClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        class.is_subtype_of_name(&self.root)
    }
}
