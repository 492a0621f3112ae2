// crates/crosscut-core/src/pointcut/expression.rs
// ============================================================================
// Module: Expression Pointcut
// Description: Pointcut backed by a compiled pattern expression.
// Purpose: Adapt the expression evaluator to the matching interfaces with caching.
// Dependencies: crate::{core, interfaces, pointcut, runtime}, crosscut_expr, crosscut_meta, dashmap
// ============================================================================

//! ## Overview
//! An [`ExpressionPointcut`] compiles its expression lazily, on first use,
//! against a loader chosen in this order: an explicitly supplied loader, the
//! loader of the declaration-scope class, then [`TypeLoader::system`].
//!
//! Shadow matches are cached per (most specific method, target class, and,
//! for context-sensitive expressions, component name). Lookups for distinct
//! keys never contend; concurrent lookups of one missing key compute once.
//!
//! When the declaring type of a method is not visible to the expression's
//! loader, the expression is recompiled once against the target class's
//! loader. If that also fails the method is cached as never matching.
//!
//! Static verdicts map as follows: `always` matches with no per-call work
//! unless the expression binds parameters, `never` does not match, and `maybe` matches statically and defers to
//! [`MethodMatcher::matches_runtime`]. A `maybe` on a class that carries
//! introduced interfaces is treated as a match. Residues that test only the
//! runtime type of `this` or the target are resolved once per proxy shape:
//! the supertypes a proxy class carries, not its generated name.
//!
//! # Security
//! - Matching never fails a call: evaluator errors degrade to a non-match.

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crosscut_expr::CompileError;
use crosscut_expr::CompiledExpression;
use crosscut_expr::Evaluator;
use crosscut_expr::EvaluatorError;
use crosscut_expr::ExpressionScope;
use crosscut_expr::MatchContext;
use crosscut_expr::ParseLimits;
use crosscut_expr::PatternEvaluator;
use crosscut_expr::RuntimeContext;
use crosscut_expr::ShadowMatch;
use crosscut_expr::TriState;
use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodKey;
use crosscut_meta::MethodRef;
use crosscut_meta::TypeLoader;
use crosscut_meta::Value;
use crosscut_meta::most_specific_method;
use dashmap::DashMap;

use crate::core::ConfigError;
use crate::interfaces::ClassFilter;
use crate::interfaces::MethodMatcher;
use crate::interfaces::Pointcut;
use crate::pointcut::BeanNameDesignator;
use crate::runtime::MethodInvocation;
use crate::runtime::ProxyCreationContext;
use crate::runtime::current_joinpoint;

// ============================================================================
// SECTION: Cache Keys
// ============================================================================

/// Shadow cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShadowKey {
    /// Most specific method.
    method: MethodKey,
    /// Target class name.
    target_class: String,
    /// Loader of the target class.
    loader: String,
    /// Component name, only for context-sensitive expressions.
    bean_name: Option<String>,
}

/// Resolved-residue cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolvedKey {
    /// Shadow the residue came from.
    shadow: ShadowKey,
    /// Supertypes of the proxy class, qualified by loader and sorted.
    proxy_supertypes: Vec<String>,
    /// Runtime class of the target.
    target_class: Option<String>,
}

/// Slot filled at most once.
type Slot = Arc<OnceLock<Arc<ShadowMatch>>>;

// ============================================================================
// SECTION: Expression Pointcut
// ============================================================================

/// Pointcut defined by an expression such as `execution(* app..*.save(..))`.
///
/// # Invariants
/// - The expression is compiled at most once per pointcut.
/// - Each cache slot is computed at most once, failures included.
pub struct ExpressionPointcut {
    /// Expression text.
    expression: String,
    /// Parameter names available for binding.
    parameter_names: Vec<String>,
    /// Declared parameter types, paired with the names.
    parameter_types: Vec<String>,
    /// Class whose loader and name scope the expression.
    declaration_scope: Option<ClassRef>,
    /// Explicit evaluation loader.
    loader: Option<Arc<TypeLoader>>,
    /// Parser limits.
    limits: ParseLimits,
    /// Evaluator that compiles the expression.
    evaluator: Arc<dyn Evaluator>,
    /// Compiled expression, or the compile error.
    compiled: OnceLock<Result<Arc<dyn CompiledExpression>, CompileError>>,
    /// Shadow matches.
    shadows: DashMap<ShadowKey, Slot>,
    /// Shadow matches with subtype-sensitive tests resolved for a proxy class.
    resolved: DashMap<ResolvedKey, Slot>,
}

impl ExpressionPointcut {
    /// Pointcut for `expression` with no parameters.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            parameter_names: Vec::new(),
            parameter_types: Vec::new(),
            declaration_scope: None,
            loader: None,
            limits: ParseLimits::default(),
            evaluator: Arc::new(PatternEvaluator::new().with_designator(Arc::new(BeanNameDesignator))),
            compiled: OnceLock::new(),
            shadows: DashMap::new(),
            resolved: DashMap::new(),
        }
    }

    /// Declares bindable parameters; counts are checked at compile time.
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

    /// Scopes the expression to a declaring class.
    #[must_use]
    pub fn with_declaration_scope(mut self, scope: &ClassRef) -> Self {
        self.declaration_scope = Some(Arc::clone(scope));
        self
    }

    /// Uses an explicit evaluation loader.
    #[must_use]
    pub fn with_loader(mut self, loader: &Arc<TypeLoader>) -> Self {
        self.loader = Some(Arc::clone(loader));
        self
    }

    /// Uses another evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Applies parser limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the expression text.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the number of cached shadow matches.
    #[must_use]
    pub fn cached_shadows(&self) -> usize {
        self.shadows.len()
    }

    /// Returns the number of residues resolved against a proxy shape.
    #[must_use]
    pub fn cached_resolutions(&self) -> usize {
        self.resolved.len()
    }

    /// Returns a value bound by this pointcut for the invocation's join point.
    #[must_use]
    pub fn bound_value(&self, invocation: &MethodInvocation, name: &str) -> Option<Value> {
        invocation.joinpoint().attribute(&self.binding_key(name))
    }

    fn binding_key(&self, name: &str) -> String {
        format!("{}#{name}", self.expression)
    }

    // ------------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------------

    fn primary_loader(&self) -> Arc<TypeLoader> {
        self.loader
            .clone()
            .or_else(|| self.declaration_scope.as_ref().and_then(|scope| scope.loader()))
            .unwrap_or_else(TypeLoader::system)
    }

    fn scope(&self, loader: &Arc<TypeLoader>) -> ExpressionScope {
        let scope = ExpressionScope::new(loader)
            .with_parameters(self.parameter_names.iter().cloned(), self.parameter_types.iter().cloned())
            .with_limits(self.limits);
        match &self.declaration_scope {
            Some(class) => scope.with_declaring_type(class.name()),
            None => scope,
        }
    }

    fn compiled(&self) -> Result<&Arc<dyn CompiledExpression>, &CompileError> {
        self.compiled
            .get_or_init(|| {
                let loader = self.primary_loader();
                let compiled = self.evaluator.compile(&self.expression, &self.scope(&loader));
                if let Err(err) = &compiled {
                    tracing::warn!(
                        target: "crosscut::expression",
                        expression = %self.expression,
                        error = %err,
                        "pointcut expression failed to compile"
                    );
                }
                compiled
            })
            .as_ref()
    }

    // ------------------------------------------------------------------------
    // Shadow Matching
    // ------------------------------------------------------------------------

    fn shadow_key(&self, compiled: &dyn CompiledExpression, method: &MethodRef, target_class: &ClassInfo) -> ShadowKey {
        ShadowKey {
            method: method.key(),
            target_class: target_class.name().to_string(),
            loader: target_class.loader_name().to_string(),
            bean_name: if compiled.is_context_sensitive() { ProxyCreationContext::current_bean_name() } else { None },
        }
    }

    /// Returns the cached shadow match, computing it on first use.
    fn shadow_match(&self, method: &MethodRef, target_class: &ClassInfo) -> Option<(ShadowKey, Arc<ShadowMatch>)> {
        let compiled = self.compiled().ok()?;
        let specific = most_specific_method(method, target_class);
        let key = self.shadow_key(compiled.as_ref(), &specific, target_class);
        let slot = match self.shadows.get(&key) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(self.shadows.entry(key.clone()).or_default().value()),
        };
        let shadow = slot.get_or_init(|| {
            let context = MatchContext {
                bean_name: key.bean_name.as_deref(),
            };
            Arc::new(self.compute_shadow(compiled, &specific, target_class, &context))
        });
        Some((key, Arc::clone(shadow)))
    }

    fn compute_shadow(
        &self,
        compiled: &Arc<dyn CompiledExpression>,
        method: &MethodRef,
        target_class: &ClassInfo,
        context: &MatchContext<'_>,
    ) -> ShadowMatch {
        match compiled.shadow_match(method, target_class, context) {
            Ok(shadow) => shadow,
            Err(EvaluatorError::TypeNotVisible {
                name,
                loader,
            }) => {
                tracing::debug!(
                    target: "crosscut::expression",
                    expression = %self.expression,
                    method = %method.key(),
                    type_name = %name,
                    loader = %loader,
                    "type not visible, retrying with the target class loader"
                );
                self.retry_with_target_loader(method, target_class, context)
            }
            Err(err @ EvaluatorError::ForeignMethod { .. }) => {
                tracing::debug!(
                    target: "crosscut::expression",
                    expression = %self.expression,
                    error = %err,
                    "method not applicable to target class"
                );
                ShadowMatch::never()
            }
            Err(err) => {
                tracing::warn!(
                    target: "crosscut::expression",
                    expression = %self.expression,
                    method = %method.key(),
                    error = %err,
                    "shadow match failed, treating as never"
                );
                ShadowMatch::never()
            }
        }
    }

    fn retry_with_target_loader(
        &self,
        method: &MethodRef,
        target_class: &ClassInfo,
        context: &MatchContext<'_>,
    ) -> ShadowMatch {
        let Some(fallback) = target_class.loader() else {
            tracing::warn!(
                target: "crosscut::expression",
                expression = %self.expression,
                target_class = target_class.name(),
                "target class has no loader, treating as never"
            );
            return ShadowMatch::never();
        };
        let outcome = self
            .evaluator
            .compile(&self.expression, &self.scope(&fallback))
            .map_err(|err| err.to_string())
            .and_then(|compiled| compiled.shadow_match(method, target_class, context).map_err(|err| err.to_string()));
        match outcome {
            Ok(shadow) => shadow,
            Err(reason) => {
                tracing::warn!(
                    target: "crosscut::expression",
                    expression = %self.expression,
                    method = %method.key(),
                    loader = fallback.name(),
                    error = %reason,
                    "fallback loader failed, treating as never"
                );
                ShadowMatch::never()
            }
        }
    }

    fn resolved_for(&self, key: &ShadowKey, shadow: &ShadowMatch, proxy: &ClassInfo, target: Option<&ClassInfo>) -> Arc<ShadowMatch> {
        let key = ResolvedKey {
            shadow: key.clone(),
            proxy_supertypes: supertypes(proxy),
            target_class: target.map(|class| class.name().to_string()),
        };
        let slot = match self.resolved.get(&key) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(self.resolved.entry(key).or_default().value()),
        };
        Arc::clone(slot.get_or_init(|| Arc::new(shadow.resolve_static(Some(proxy), target))))
    }
}

/// Names every supertype of a generated proxy class.
fn supertypes(proxy: &ClassInfo) -> Vec<String> {
    let mut names: Vec<String> = proxy
        .superclasses()
        .map(|class| format!("{}:{}", class.loader_name(), class.name()))
        .chain(proxy.all_interfaces().iter().map(|iface| format!("{}:{}", iface.loader_name(), iface.name())))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

impl ClassFilter for ExpressionPointcut {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.compiled().is_ok_and(|compiled| compiled.could_match_class(class))
    }
}

impl MethodMatcher for ExpressionPointcut {
    fn matches(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.matches_with_introductions(method, target_class, false)
    }

    fn is_runtime(&self) -> bool {
        self.compiled().is_ok_and(|compiled| compiled.may_need_dynamic_test())
    }

    fn is_runtime_for(&self, method: &MethodRef, target_class: &ClassInfo) -> bool {
        self.is_runtime()
            && self
                .shadow_match(method, target_class)
                .is_none_or(|(_, shadow)| !shadow.always_matches() || !shadow.bindings().is_empty())
    }

    fn matches_runtime(&self, method: &MethodRef, target_class: &ClassInfo, args: &[Value]) -> bool {
        let Some((key, shadow)) = self.shadow_match(method, target_class) else {
            return false;
        };
        if shadow.never_matches() {
            return false;
        }
        let joinpoint = current_joinpoint();
        let proxy = joinpoint.as_ref().map(|joinpoint| joinpoint.proxy().clone());
        let target = joinpoint.as_ref().and_then(|joinpoint| joinpoint.target().cloned()).map(Value::Object);
        let bean_name = joinpoint.as_ref().and_then(|joinpoint| joinpoint.bean_name());
        let context = RuntimeContext {
            this: proxy.as_ref(),
            target: target.as_ref(),
            args,
            bean_name,
        };

        let effective = match proxy.as_ref().and_then(Value::as_object) {
            Some(proxy_object) if shadow.tests_subtype_sensitive_vars() => {
                let target_object = target.as_ref().and_then(Value::as_object);
                self.resolved_for(&key, &shadow, proxy_object.class(), target_object.map(|object| object.class().as_ref()))
            }
            _ => shadow,
        };
        if effective.evaluate(&context) != TriState::True {
            return false;
        }
        if let Some(joinpoint) = &joinpoint {
            for (name, value) in effective.bind(&context) {
                joinpoint.set_attribute(self.binding_key(&name), Some(value));
            }
        }
        true
    }

    fn is_introduction_aware(&self) -> bool {
        true
    }

    fn matches_with_introductions(&self, method: &MethodRef, target_class: &ClassInfo, has_introductions: bool) -> bool {
        let Some((_, shadow)) = self.shadow_match(method, target_class) else {
            return false;
        };
        match shadow.verdict() {
            TriState::True => true,
            TriState::False => false,
            TriState::Unknown => {
                has_introductions
                    || !shadow.tests_subtype_sensitive_vars()
                    || !shadow.resolve_static(None, Some(target_class)).never_matches()
            }
        }
    }
}

impl Pointcut for ExpressionPointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        self
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.compiled().map(|_| ()).map_err(|err| ConfigError::Expression(err.clone()))
    }
}

impl fmt::Debug for ExpressionPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionPointcut")
            .field("expression", &self.expression)
            .field("parameter_names", &self.parameter_names)
            .field("declaration_scope", &self.declaration_scope.as_ref().map(|scope| scope.name()))
            .field("cached_shadows", &self.shadows.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ExpressionPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
