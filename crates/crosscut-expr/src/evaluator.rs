// crates/crosscut-expr/src/evaluator.rs
// ============================================================================
// Module: Expression Evaluator
// Description: Evaluator traits and the built-in pattern evaluator.
// Purpose: Compile expressions once, then answer class and method queries.
// Dependencies: crate::{compile, designator, error, expr, parser, shadow}, crosscut_meta, tracing
// ============================================================================

//! ## Overview
//! [`Evaluator`] and [`CompiledExpression`] are the seam between the
//! interception engine and any expression language. The engine only needs
//! two questions answered: could a class ever match (cheap pre-filter), and
//! what is the shadow match for one method on one class.
//!
//! [`PatternEvaluator`] answers them for the built-in designators. Static
//! rules per designator:
//!
//! | Designator | Static answer |
//! |---|---|
//! | `execution`, `within`, `@annotation`, `@within` | always decided |
//! | `target(T)`, `args(..)` | decided when the static type is a subtype of `T` or cannot be one; residue otherwise |
//! | `this(T)`, `@target(A)` | residue (the executing object is the proxy) |
//! | custom | decided when the handler answers; residue when it abstains |

use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodRef;
use crosscut_meta::TypeLoader;
use crosscut_meta::most_specific_method;

use crate::compile::ArgSlot;
use crate::compile::ExpressionScope;
use crate::compile::Primitive;
use crate::compile::TypeTest;
use crate::compile::compile;
use crate::designator::DesignatorHandler;
use crate::designator::MatchContext;
use crate::error::CompileError;
use crate::error::EvaluatorError;
use crate::expr::Expr;
use crate::expr::Partial;
use crate::parser::parse_expression;
use crate::shadow::Binding;
use crate::shadow::BindingSource;
use crate::shadow::RuntimeTest;
use crate::shadow::ShadowMatch;
use crate::tristate::TriState;

// ============================================================================
// SECTION: Evaluator Interfaces
// ============================================================================

/// Compiles expression text into a reusable matcher.
pub trait Evaluator: Send + Sync {
    /// Compiles `expression` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when the expression is malformed or its
    /// bindings do not fit the scope.
    fn compile(&self, expression: &str, scope: &ExpressionScope) -> Result<Arc<dyn CompiledExpression>, CompileError>;
}

/// Compiled expression.
pub trait CompiledExpression: Send + Sync + fmt::Debug {
    /// Returns the source text.
    fn expression(&self) -> &str;

    /// Returns the loader the expression was compiled against.
    fn loader(&self) -> &Arc<TypeLoader>;

    /// Returns the names of the parameters the expression binds.
    fn parameter_names(&self) -> &[String];

    /// Returns true when matching depends on a [`MatchContext`].
    fn is_context_sensitive(&self) -> bool;

    /// Returns true when some method may need a per-call test or binding.
    ///
    /// Expressions that answer false only ever produce `always` or `never`
    /// shadow verdicts without bindings.
    fn may_need_dynamic_test(&self) -> bool {
        true
    }

    /// Returns false only when no method of `class` can ever match.
    fn could_match_class(&self, class: &ClassInfo) -> bool;

    /// Computes the shadow match for `method` executing on `target_class`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError::TypeNotVisible`] when the method's declaring
    /// type or the target class is not visible to the expression's loader.
    fn shadow_match(
        &self,
        method: &MethodRef,
        target_class: &ClassInfo,
        context: &MatchContext<'_>,
    ) -> Result<ShadowMatch, EvaluatorError>;
}

// ============================================================================
// SECTION: Pattern Evaluator
// ============================================================================

/// Built-in evaluator for the pointcut expression language.
#[derive(Clone, Default)]
pub struct PatternEvaluator {
    /// Registered custom designators.
    handlers: Vec<Arc<dyn DesignatorHandler>>,
}

impl PatternEvaluator {
    /// Evaluator with only the built-in designators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom designator.
    #[must_use]
    pub fn with_designator(mut self, handler: Arc<dyn DesignatorHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Returns the names of the registered custom designators.
    #[must_use]
    pub fn designator_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }
}

impl fmt::Debug for PatternEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternEvaluator").field("designators", &self.designator_names()).finish()
    }
}

impl Evaluator for PatternEvaluator {
    fn compile(&self, expression: &str, scope: &ExpressionScope) -> Result<Arc<dyn CompiledExpression>, CompileError> {
        let parsed = parse_expression(expression, &scope.limits)?;
        let tree = compile(&parsed, scope, &self.handlers)?;
        let context_sensitive = tree.any_primitive(&|primitive| matches!(primitive, Primitive::Custom(_)));
        let dynamic = !scope.parameter_names.is_empty()
            || tree.any_primitive(&|primitive| {
                matches!(
                    primitive,
                    Primitive::This(_)
                        | Primitive::Target(_)
                        | Primitive::Args(_)
                        | Primitive::AtTarget(_)
                        | Primitive::Custom(_)
                )
            });
        tracing::debug!(
            target: "crosscut::expression",
            expression,
            loader = scope.loader.name(),
            nodes = tree.node_count(),
            "compiled pointcut expression"
        );
        Ok(Arc::new(PatternExpression {
            text: expression.to_string(),
            loader: Arc::clone(&scope.loader),
            parameter_names: scope.parameter_names.clone(),
            tree,
            context_sensitive,
            dynamic,
        }))
    }
}

// ============================================================================
// SECTION: Compiled Pattern Expression
// ============================================================================

/// Expression compiled by [`PatternEvaluator`].
#[derive(Debug)]
pub struct PatternExpression {
    /// Source text.
    text: String,
    /// Loader types were resolved against.
    loader: Arc<TypeLoader>,
    /// Bound parameter names.
    parameter_names: Vec<String>,
    /// Compiled tree.
    tree: Expr<Primitive>,
    /// True when the tree contains custom designators.
    context_sensitive: bool,
    /// True when some primitive or binding may defer to the call.
    dynamic: bool,
}

impl CompiledExpression for PatternExpression {
    fn expression(&self) -> &str {
        &self.text
    }

    fn loader(&self) -> &Arc<TypeLoader> {
        &self.loader
    }

    fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    fn is_context_sensitive(&self) -> bool {
        self.context_sensitive
    }

    fn may_need_dynamic_test(&self) -> bool {
        self.dynamic
    }

    fn could_match_class(&self, class: &ClassInfo) -> bool {
        let partial = self.tree.partially_evaluate(&mut |primitive: &Primitive| match primitive {
            Primitive::Within(pattern) => Partial::Known(
                pattern.matches_class(class) || class.superclasses().any(|parent| pattern.matches_class(parent)),
            ),
            Primitive::AtWithin(annotation) => Partial::Known(
                class.has_annotation(annotation)
                    || class.superclasses().any(|parent| parent.has_annotation(annotation)),
            ),
            Primitive::Execution(signature) => Partial::Known(class.all_methods().iter().any(|method| {
                let specific = most_specific_method(method, class);
                signature.matches(&specific, class, &self.loader)
            })),
            _ => Partial::Residual(Expr::primitive(())),
        });
        !matches!(partial, Partial::Known(false))
    }

    fn shadow_match(
        &self,
        method: &MethodRef,
        target_class: &ClassInfo,
        context: &MatchContext<'_>,
    ) -> Result<ShadowMatch, EvaluatorError> {
        let specific = most_specific_method(method, target_class);
        let declaring = declaring_class(&specific, target_class).ok_or_else(|| EvaluatorError::ForeignMethod {
            method: specific.signature(),
            class: target_class.name().to_string(),
        })?;
        for class in [declaring, target_class] {
            if !visible(&self.loader, class) {
                return Err(EvaluatorError::TypeNotVisible {
                    name: class.name().to_string(),
                    loader: self.loader.name().to_string(),
                });
            }
        }

        let shadow = ShadowContext {
            method: &specific,
            declaring,
            target_class,
            loader: &self.loader,
            context,
        };
        let partial = self.tree.partially_evaluate(&mut |primitive: &Primitive| shadow.decide(primitive));
        let bindings = if partial.verdict().is_false() { Vec::new() } else { shadow.bindings(&self.tree) };
        Ok(ShadowMatch::from_partial(partial, bindings))
    }
}

// ============================================================================
// SECTION: Static Matching
// ============================================================================

/// Everything known about one method before it is called.
struct ShadowContext<'a> {
    /// Most specific declaration of the method.
    method: &'a MethodRef,
    /// Class declaring `method`.
    declaring: &'a ClassInfo,
    /// Class of the target object.
    target_class: &'a ClassInfo,
    /// Loader used for subtype patterns.
    loader: &'a TypeLoader,
    /// Ambient match context.
    context: &'a MatchContext<'a>,
}

impl ShadowContext<'_> {
    /// Decides one primitive or defers it to a runtime test.
    fn decide(&self, primitive: &Primitive) -> Partial<RuntimeTest> {
        match primitive {
            Primitive::Execution(signature) => {
                Partial::Known(signature.matches(self.method, self.target_class, self.loader))
            }
            Primitive::Within(pattern) => Partial::Known(pattern.matches_class(self.declaring)),
            Primitive::This(test) => {
                Partial::Residual(Expr::primitive(RuntimeTest::ThisInstanceOf(test.class.name().to_string())))
            }
            Primitive::Target(test) => instance_rule(self.target_class, &test.class, || {
                RuntimeTest::TargetInstanceOf(test.class.name().to_string())
            }),
            Primitive::Args(slots) => self.decide_args(slots),
            Primitive::AtAnnotation(test) => Partial::Known(self.method.has_annotation(&test.annotation)),
            Primitive::AtWithin(annotation) => Partial::Known(self.declaring.has_annotation(annotation)),
            Primitive::AtTarget(test) => {
                Partial::Residual(Expr::primitive(RuntimeTest::TargetAnnotated(test.annotation.clone())))
            }
            Primitive::Custom(custom) => match custom.matcher.matches(self.context) {
                TriState::True => Partial::Known(true),
                TriState::False => Partial::Known(false),
                TriState::Unknown => Partial::Residual(Expr::primitive(RuntimeTest::Context {
                    designator: custom.source.clone(),
                    matcher: Arc::clone(&custom.matcher),
                })),
            },
        }
    }

    /// Decides an `args(..)` list against the declared parameter types.
    fn decide_args(&self, slots: &[ArgSlot]) -> Partial<RuntimeTest> {
        let Some(positioned) = align_args(slots, self.method.arity()) else {
            return Partial::Known(false);
        };
        let mut residues = Vec::new();
        for (index, test) in positioned {
            let Some(param) = self.method.params().get(index) else {
                return Partial::Known(false);
            };
            let outcome = match self.loader.load(param) {
                Some(param_class) => instance_rule(&param_class, &test.class, || RuntimeTest::ArgInstanceOf {
                    index,
                    type_name: test.class.name().to_string(),
                }),
                None => Partial::Known(param == test.class.name()),
            };
            match outcome {
                Partial::Known(false) => return Partial::Known(false),
                Partial::Known(true) => {}
                Partial::Residual(residue) => residues.push(residue),
            }
        }
        match residues.len() {
            0 => Partial::Known(true),
            1 => residues.pop().map_or(Partial::Known(true), Partial::Residual),
            _ => Partial::Residual(Expr::and(residues)),
        }
    }

    /// Collects bindings from the top-level conjunction.
    fn bindings(&self, tree: &Expr<Primitive>) -> Vec<Binding> {
        let mut bindings = Vec::new();
        tree.for_each_primitive(&mut |primitive| match primitive {
            Primitive::This(TypeTest {
                binding: Some(name),
                ..
            }) => bindings.push(Binding {
                name: name.clone(),
                source: BindingSource::This,
            }),
            Primitive::Target(TypeTest {
                binding: Some(name),
                ..
            }) => bindings.push(Binding {
                name: name.clone(),
                source: BindingSource::Target,
            }),
            Primitive::Args(slots) => {
                for (index, test) in align_args(slots, self.method.arity()).unwrap_or_default() {
                    if let Some(name) = &test.binding {
                        bindings.push(Binding {
                            name: name.clone(),
                            source: BindingSource::Arg(index),
                        });
                    }
                }
            }
            Primitive::AtAnnotation(test) => {
                if let Some(name) = &test.binding {
                    bindings.push(Binding {
                        name: name.clone(),
                        source: BindingSource::MethodAnnotation(test.annotation.clone()),
                    });
                }
            }
            Primitive::AtTarget(test) => {
                if let Some(name) = &test.binding {
                    bindings.push(Binding {
                        name: name.clone(),
                        source: BindingSource::TargetAnnotation(test.annotation.clone()),
                    });
                }
            }
            _ => {}
        });
        bindings
    }
}

/// Positions the typed slots of an `args(..)` list for a given arity.
///
/// Slots before `..` count from the front, slots after it from the back.
/// Returns `None` when the arity cannot fit the list.
fn align_args(slots: &[ArgSlot], arity: usize) -> Option<Vec<(usize, &TypeTest)>> {
    let run = slots.iter().position(|slot| matches!(slot, ArgSlot::AnyRun));
    let fixed = slots.len() - usize::from(run.is_some());
    let fits = if run.is_some() { fixed <= arity } else { fixed == arity };
    if !fits {
        return None;
    }
    let mut positioned = Vec::new();
    for (slot_index, slot) in slots.iter().enumerate() {
        let ArgSlot::Typed(test) = slot else {
            continue;
        };
        let index = match run {
            Some(run_index) if slot_index > run_index => arity - (slots.len() - slot_index),
            _ => slot_index,
        };
        positioned.push((index, test));
    }
    Some(positioned)
}

/// Decides `value-of-static-type instanceof required`.
fn instance_rule(
    static_class: &ClassInfo,
    required: &ClassRef,
    residue: impl FnOnce() -> RuntimeTest,
) -> Partial<RuntimeTest> {
    if static_class.is_primitive() || required.is_primitive() {
        return Partial::Known(static_class.name() == required.name());
    }
    if static_class.is_assignable_to(required) {
        return Partial::Known(true);
    }
    let could_narrow = required.is_assignable_to(static_class)
        || (!static_class.is_final() && (required.is_interface() || static_class.is_interface()) && !required.is_final());
    if could_narrow { Partial::Residual(Expr::primitive(residue())) } else { Partial::Known(false) }
}

/// Finds the class that declares `method` within the target hierarchy.
fn declaring_class<'a>(method: &MethodRef, target_class: &'a ClassInfo) -> Option<&'a ClassInfo> {
    if method.declaring() == target_class.name() {
        return Some(target_class);
    }
    if let Some(parent) = target_class.superclasses().find(|class| class.name() == method.declaring()) {
        return Some(&**parent);
    }
    find_interface(target_class, method.declaring())
}

/// Depth-first search of the interface graph reachable from `class`.
fn find_interface<'a>(class: &'a ClassInfo, name: &str) -> Option<&'a ClassInfo> {
    for iface in class.interfaces() {
        if iface.name() == name {
            return Some(iface);
        }
        if let Some(found) = find_interface(iface, name) {
            return Some(found);
        }
    }
    class.superclass().and_then(|parent| find_interface(parent, name))
}

/// Returns true when `loader` resolves the class's name to this exact descriptor.
fn visible(loader: &TypeLoader, class: &ClassInfo) -> bool {
    loader.load(class.name()).is_some_and(|found| std::ptr::eq(Arc::as_ptr(&found), class))
}
