// crates/crosscut-expr/src/compile.rs
// ============================================================================
// Module: Expression Compilation
// Description: Resolves parsed designators against a scope and checks bindings.
// Purpose: Fail fast on malformed expressions before any method is matched.
// Dependencies: crate::{designator, error, expr, parser, pattern}, crosscut_meta
// ============================================================================

//! ## Overview
//! Compilation turns `Expr<Designator>` into `Expr<Primitive>`:
//!
//! - Identifiers in `this`, `target`, `args`, `@annotation`, and `@target`
//!   are parameter bindings when they name a declared parameter, and type
//!   names otherwise. Type names must be visible to the scope's loader.
//! - Every declared parameter must be bound exactly once, and never under
//!   `||` or `!`.
//! - Custom designators are compiled by their registered handler.

use std::collections::HashSet;
use std::sync::Arc;

use crosscut_meta::ClassRef;
use crosscut_meta::TypeLoader;

use crate::designator::ContextMatcher;
use crate::designator::DesignatorHandler;
use crate::error::CompileError;
use crate::expr::Expr;
use crate::parser::Designator;
use crate::parser::ParseLimits;
use crate::pattern::ArgPattern;
use crate::pattern::SignaturePattern;
use crate::pattern::TypePattern;

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Where an expression is declared and what it may bind.
#[derive(Debug, Clone)]
pub struct ExpressionScope {
    /// Loader used to resolve type names.
    pub loader: Arc<TypeLoader>,
    /// Type that declares the expression, if any (diagnostics only).
    pub declaring_type: Option<String>,
    /// Names of the advice parameters the expression binds.
    pub parameter_names: Vec<String>,
    /// Types of the advice parameters, parallel to `parameter_names`.
    pub parameter_types: Vec<String>,
    /// Parser limits.
    pub limits: ParseLimits,
}

impl ExpressionScope {
    /// Scope with no parameters over `loader`.
    #[must_use]
    pub fn new(loader: &Arc<TypeLoader>) -> Self {
        Self {
            loader: Arc::clone(loader),
            declaring_type: None,
            parameter_names: Vec::new(),
            parameter_types: Vec::new(),
            limits: ParseLimits::default(),
        }
    }

    /// Sets the parameters the expression must bind.
    #[must_use]
    pub fn with_parameters<N, T>(mut self, names: N, types: T) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        self.parameter_names = names.into_iter().map(Into::into).collect();
        self.parameter_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the declaring type.
    #[must_use]
    pub fn with_declaring_type(mut self, declaring_type: impl Into<String>) -> Self {
        self.declaring_type = Some(declaring_type.into());
        self
    }

    /// Sets the parser limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Same scope over another loader.
    #[must_use]
    pub fn with_loader(&self, loader: &Arc<TypeLoader>) -> Self {
        Self {
            loader: Arc::clone(loader),
            ..self.clone()
        }
    }

    /// Returns the declared type of a parameter.
    fn parameter_type(&self, name: &str) -> Option<&str> {
        self.parameter_names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|index| self.parameter_types.get(index))
            .map(String::as_str)
    }
}

// ============================================================================
// SECTION: Compiled Primitives
// ============================================================================

/// Instance-of test with an optional binding.
#[derive(Debug, Clone)]
pub struct TypeTest {
    /// Required type.
    pub class: ClassRef,
    /// Parameter bound to the tested value.
    pub binding: Option<String>,
}

/// One compiled `args(..)` entry.
#[derive(Debug, Clone)]
pub enum ArgSlot {
    /// Any run of arguments.
    AnyRun,
    /// Exactly one argument of any type.
    Any,
    /// One argument tested against a type.
    Typed(TypeTest),
}

/// Annotation test with an optional binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationTest {
    /// Annotation type name.
    pub annotation: String,
    /// Parameter bound to the annotation.
    pub binding: Option<String>,
}

/// Custom designator compiled by its handler.
#[derive(Debug, Clone)]
pub struct CustomTest {
    /// Source text, for diagnostics.
    pub source: String,
    /// Compiled matcher.
    pub matcher: Arc<dyn ContextMatcher>,
}

/// Compiled designator.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// `execution(..)`
    Execution(SignaturePattern),
    /// `within(..)`
    Within(TypePattern),
    /// `this(..)`
    This(TypeTest),
    /// `target(..)`
    Target(TypeTest),
    /// `args(..)`
    Args(Vec<ArgSlot>),
    /// `@annotation(..)`
    AtAnnotation(AnnotationTest),
    /// `@within(..)`
    AtWithin(String),
    /// `@target(..)`
    AtTarget(AnnotationTest),
    /// Handler-provided designator.
    Custom(CustomTest),
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles a parsed expression.
///
/// # Errors
///
/// Returns [`CompileError`] for count mismatches, invisible types, unknown
/// designators, rejected custom bodies, or binding violations.
pub fn compile(
    parsed: &Expr<Designator>,
    scope: &ExpressionScope,
    handlers: &[Arc<dyn DesignatorHandler>],
) -> Result<Expr<Primitive>, CompileError> {
    if scope.parameter_names.len() != scope.parameter_types.len() {
        return Err(CompileError::ParameterCountMismatch {
            names: scope.parameter_names.len(),
            types: scope.parameter_types.len(),
        });
    }
    let compiled = parsed.try_map(&mut |designator| compile_designator(designator, scope, handlers))?;

    let mut bound = HashSet::new();
    check_bindings(&compiled, false, &mut bound)?;
    if let Some(unbound) = scope.parameter_names.iter().find(|name| !bound.contains(name.as_str())) {
        return Err(CompileError::UnboundParameter(unbound.clone()));
    }
    Ok(compiled)
}

/// Compiles one designator.
fn compile_designator(
    designator: &Designator,
    scope: &ExpressionScope,
    handlers: &[Arc<dyn DesignatorHandler>],
) -> Result<Primitive, CompileError> {
    Ok(match designator {
        Designator::Execution(signature) => Primitive::Execution(signature.clone()),
        Designator::Within(pattern) => Primitive::Within(pattern.clone()),
        Designator::This(reference) => Primitive::This(type_test(reference, scope)?),
        Designator::Target(reference) => Primitive::Target(type_test(reference, scope)?),
        Designator::Args(patterns) => Primitive::Args(
            patterns
                .iter()
                .map(|pattern| match pattern {
                    ArgPattern::AnyRun => Ok(ArgSlot::AnyRun),
                    ArgPattern::Any => Ok(ArgSlot::Any),
                    ArgPattern::Named(reference) => type_test(reference, scope).map(ArgSlot::Typed),
                })
                .collect::<Result<_, _>>()?,
        ),
        Designator::AtAnnotation(reference) => Primitive::AtAnnotation(annotation_test(reference, scope)),
        Designator::AtWithin(annotation) => Primitive::AtWithin(annotation.clone()),
        Designator::AtTarget(reference) => Primitive::AtTarget(annotation_test(reference, scope)),
        Designator::Custom {
            name,
            body,
        } => {
            let handler = handlers
                .iter()
                .find(|handler| handler.name() == name)
                .ok_or_else(|| CompileError::UnknownDesignator(name.clone()))?;
            let matcher = handler.compile(body).map_err(|reason| CompileError::DesignatorBody {
                name: name.clone(),
                body: body.clone(),
                reason,
            })?;
            Primitive::Custom(CustomTest {
                source: format!("{name}({body})"),
                matcher,
            })
        }
    })
}

/// Resolves a type-or-parameter reference into an instance-of test.
fn type_test(reference: &str, scope: &ExpressionScope) -> Result<TypeTest, CompileError> {
    let (type_name, binding) = match scope.parameter_type(reference) {
        Some(declared) => (declared, Some(reference.to_string())),
        None => (reference, None),
    };
    let class = scope.loader.load(type_name).ok_or_else(|| CompileError::UnknownType {
        name: type_name.to_string(),
        loader: scope.loader.name().to_string(),
    })?;
    Ok(TypeTest {
        class,
        binding,
    })
}

/// Resolves an annotation-or-parameter reference.
fn annotation_test(reference: &str, scope: &ExpressionScope) -> AnnotationTest {
    match scope.parameter_type(reference) {
        Some(declared) => AnnotationTest {
            annotation: declared.to_string(),
            binding: Some(reference.to_string()),
        },
        None => AnnotationTest {
            annotation: reference.to_string(),
            binding: None,
        },
    }
}

/// Enforces single, conjunctive binding of every parameter.
fn check_bindings(
    expr: &Expr<Primitive>,
    disjunctive: bool,
    bound: &mut HashSet<String>,
) -> Result<(), CompileError> {
    match expr {
        Expr::And(parts) => {
            for part in parts {
                check_bindings(part, disjunctive, bound)?;
            }
        }
        Expr::Or(parts) => {
            for part in parts {
                check_bindings(part, parts.len() > 1 || disjunctive, bound)?;
            }
        }
        Expr::Not(inner) => check_bindings(inner, true, bound)?,
        Expr::Primitive(primitive) => {
            for name in primitive_bindings(primitive) {
                if disjunctive {
                    return Err(CompileError::BindingUnderDisjunction(name.to_string()));
                }
                if !bound.insert(name.to_string()) {
                    return Err(CompileError::AmbiguousBinding(name.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Lists the parameters a primitive binds.
pub(crate) fn primitive_bindings(primitive: &Primitive) -> Vec<&str> {
    match primitive {
        Primitive::This(test) | Primitive::Target(test) => test.binding.iter().map(String::as_str).collect(),
        Primitive::Args(slots) => slots
            .iter()
            .filter_map(|slot| match slot {
                ArgSlot::Typed(test) => test.binding.as_deref(),
                ArgSlot::AnyRun | ArgSlot::Any => None,
            })
            .collect(),
        Primitive::AtAnnotation(test) | Primitive::AtTarget(test) => {
            test.binding.iter().map(String::as_str).collect()
        }
        Primitive::Execution(_) | Primitive::Within(_) | Primitive::AtWithin(_) | Primitive::Custom(_) => {
            Vec::new()
        }
    }
}
