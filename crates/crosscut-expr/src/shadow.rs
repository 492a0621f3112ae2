// crates/crosscut-expr/src/shadow.rs
// ============================================================================
// Module: Shadow Matches
// Description: Per-method static verdicts and the runtime tests they leave.
// Purpose: Decide once per method what can be decided, defer the rest.
// Dependencies: crate::{designator, expr, tristate}, crosscut_meta
// ============================================================================

//! ## Overview
//! A [`ShadowMatch`] is the answer to "does this expression select this
//! method on this class". `True` and `False` are final. `Unknown` comes with
//! a residue: the [`RuntimeTest`]s that only the actual call can settle.
//!
//! Residue tests on `this`, `target`, or target annotations depend only on
//! runtime *types*. When those types are fixed (a proxy's class and its
//! target's class never change), [`ShadowMatch::resolve_static`] settles the
//! tests once instead of on every call.

use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassInfo;
use crosscut_meta::Value;

use crate::designator::ContextMatcher;
use crate::designator::MatchContext;
use crate::expr::Expr;
use crate::expr::Partial;
use crate::tristate::KleeneLogic;
use crate::tristate::TriState;

// ============================================================================
// SECTION: Runtime Tests
// ============================================================================

/// Test left over after static matching.
#[derive(Clone)]
pub enum RuntimeTest {
    /// The executing object (`this`, the proxy) is an instance of the type.
    ThisInstanceOf(String),
    /// The target object is an instance of the type.
    TargetInstanceOf(String),
    /// The argument at `index` is a non-null instance of the type.
    ArgInstanceOf {
        /// Zero-based argument index.
        index: usize,
        /// Required type name.
        type_name: String,
    },
    /// The target object's class carries the annotation.
    TargetAnnotated(String),
    /// A custom designator that abstained statically.
    Context {
        /// Designator source text, for diagnostics.
        designator: String,
        /// Compiled matcher.
        matcher: Arc<dyn ContextMatcher>,
    },
}

impl RuntimeTest {
    /// Returns true when the test depends only on the runtime type of `this` or the target.
    #[must_use]
    pub const fn is_subtype_sensitive(&self) -> bool {
        matches!(self, Self::ThisInstanceOf(_) | Self::TargetInstanceOf(_) | Self::TargetAnnotated(_))
    }

    /// Evaluates the test against a call.
    #[must_use]
    pub fn evaluate(&self, context: &RuntimeContext<'_>) -> TriState {
        match self {
            Self::ThisInstanceOf(type_name) => {
                context.this.map_or(TriState::Unknown, |value| instance_of(value, type_name).into())
            }
            Self::TargetInstanceOf(type_name) => {
                context.target.map_or(TriState::Unknown, |value| instance_of(value, type_name).into())
            }
            Self::ArgInstanceOf {
                index,
                type_name,
            } => context.args.get(*index).is_some_and(|value| instance_of(value, type_name)).into(),
            Self::TargetAnnotated(annotation) => context
                .target
                .and_then(Value::as_object)
                .is_some_and(|object| object.class().has_annotation(annotation))
                .into(),
            Self::Context {
                matcher, ..
            } => matcher.matches(&MatchContext {
                bean_name: context.bean_name,
            }),
        }
    }
}

impl fmt::Debug for RuntimeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThisInstanceOf(name) => write!(f, "this instanceof {name}"),
            Self::TargetInstanceOf(name) => write!(f, "target instanceof {name}"),
            Self::ArgInstanceOf {
                index,
                type_name,
            } => write!(f, "arg[{index}] instanceof {type_name}"),
            Self::TargetAnnotated(name) => write!(f, "target annotated @{name}"),
            Self::Context {
                designator, ..
            } => f.write_str(designator),
        }
    }
}

impl PartialEq for RuntimeTest {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ThisInstanceOf(a), Self::ThisInstanceOf(b))
            | (Self::TargetInstanceOf(a), Self::TargetInstanceOf(b))
            | (Self::TargetAnnotated(a), Self::TargetAnnotated(b)) => a == b,
            (
                Self::ArgInstanceOf {
                    index: a,
                    type_name: ta,
                },
                Self::ArgInstanceOf {
                    index: b,
                    type_name: tb,
                },
            ) => a == b && ta == tb,
            (
                Self::Context {
                    designator: a,
                    matcher: ma,
                },
                Self::Context {
                    designator: b,
                    matcher: mb,
                },
            ) => a == b && Arc::ptr_eq(ma, mb),
            _ => false,
        }
    }
}

/// Instanceof semantics: `null` is never an instance.
fn instance_of(value: &Value, type_name: &str) -> bool {
    !value.is_null() && value.is_instance_of_name(type_name)
}

/// Values of one call, as seen by runtime tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeContext<'a> {
    /// The executing object (the proxy).
    pub this: Option<&'a Value>,
    /// The target object.
    pub target: Option<&'a Value>,
    /// Current arguments.
    pub args: &'a [Value],
    /// Name of the component the proxy was created for.
    pub bean_name: Option<&'a str>,
}

// ============================================================================
// SECTION: Bindings
// ============================================================================

/// Where a bound parameter takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    /// The executing object.
    This,
    /// The target object.
    Target,
    /// Argument at the index.
    Arg(usize),
    /// Annotation on the executing method; bound as its type name.
    MethodAnnotation(String),
    /// Annotation on the target class; bound as its type name.
    TargetAnnotation(String),
}

/// One bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Parameter name.
    pub name: String,
    /// Value source.
    pub source: BindingSource,
}

// ============================================================================
// SECTION: Shadow Match
// ============================================================================

/// Static verdict for one method plus whatever must be checked per call.
///
/// # Invariants
/// - `residue` is `Some` exactly when `verdict` is [`TriState::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMatch {
    /// Always / never / maybe.
    verdict: TriState,
    /// Tests to run per call when the verdict is maybe.
    residue: Option<Expr<RuntimeTest>>,
    /// Parameter bindings for matching calls.
    bindings: Vec<Binding>,
}

impl ShadowMatch {
    /// Verdict for a method that never matches.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            verdict: TriState::False,
            residue: None,
            bindings: Vec::new(),
        }
    }

    /// Verdict for a method that always matches, without bindings.
    #[must_use]
    pub const fn always() -> Self {
        Self {
            verdict: TriState::True,
            residue: None,
            bindings: Vec::new(),
        }
    }

    /// Builds a shadow match from a partial evaluation.
    #[must_use]
    pub fn from_partial(partial: Partial<RuntimeTest>, bindings: Vec<Binding>) -> Self {
        let verdict = partial.verdict();
        let residue = match partial {
            Partial::Residual(residue) => Some(residue),
            Partial::Known(_) => None,
        };
        let bindings = if verdict.is_false() { Vec::new() } else { bindings };
        Self {
            verdict,
            residue,
            bindings,
        }
    }

    /// Returns the static verdict.
    #[must_use]
    pub const fn verdict(&self) -> TriState {
        self.verdict
    }

    /// Returns true when every call matches.
    #[must_use]
    pub const fn always_matches(&self) -> bool {
        self.verdict.is_true()
    }

    /// Returns true when no call can match.
    #[must_use]
    pub const fn never_matches(&self) -> bool {
        self.verdict.is_false()
    }

    /// Returns true when the answer depends on the call.
    #[must_use]
    pub const fn maybe_matches(&self) -> bool {
        self.verdict.is_unknown()
    }

    /// Returns the runtime residue.
    #[must_use]
    pub const fn residue(&self) -> Option<&Expr<RuntimeTest>> {
        self.residue.as_ref()
    }

    /// Returns the parameter bindings.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Returns true when the residue tests `this`/`target` types or target annotations.
    #[must_use]
    pub fn tests_subtype_sensitive_vars(&self) -> bool {
        self.residue.as_ref().is_some_and(|residue| residue.any_primitive(&RuntimeTest::is_subtype_sensitive))
    }

    /// Settles subtype-sensitive tests against known runtime classes.
    ///
    /// Tests for which no class is supplied are kept.
    #[must_use]
    pub fn resolve_static(&self, this_class: Option<&ClassInfo>, target_class: Option<&ClassInfo>) -> Self {
        let Some(residue) = &self.residue else {
            return self.clone();
        };
        let partial = residue.partially_evaluate(&mut |test: &RuntimeTest| match (test, this_class, target_class) {
            (RuntimeTest::ThisInstanceOf(name), Some(class), _)
            | (RuntimeTest::TargetInstanceOf(name), _, Some(class)) => Partial::Known(class.is_subtype_of_name(name)),
            (RuntimeTest::TargetAnnotated(annotation), _, Some(class)) => {
                Partial::Known(class.has_annotation(annotation))
            }
            _ => Partial::Residual(Expr::primitive(test.clone())),
        });
        Self::from_partial(partial, self.bindings.clone())
    }

    /// Evaluates the match for one call.
    #[must_use]
    pub fn evaluate(&self, context: &RuntimeContext<'_>) -> TriState {
        match (&self.residue, self.verdict) {
            (Some(residue), TriState::Unknown) => {
                residue.eval_tristate(&KleeneLogic, &mut |test: &RuntimeTest| test.evaluate(context))
            }
            (_, verdict) => verdict,
        }
    }

    /// Extracts bound parameter values for a matching call.
    #[must_use]
    pub fn bind(&self, context: &RuntimeContext<'_>) -> Vec<(String, Value)> {
        self.bindings
            .iter()
            .map(|binding| {
                let value = match &binding.source {
                    BindingSource::This => context.this.cloned().unwrap_or_default(),
                    BindingSource::Target => context.target.cloned().unwrap_or_default(),
                    BindingSource::Arg(index) => context.args.get(*index).cloned().unwrap_or_default(),
                    BindingSource::MethodAnnotation(name) | BindingSource::TargetAnnotation(name) => {
                        Value::from(name.as_str())
                    }
                };
                (binding.name.clone(), value)
            })
            .collect()
    }
}
