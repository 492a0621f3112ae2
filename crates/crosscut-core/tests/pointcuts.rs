// crates/crosscut-core/tests/pointcuts.rs
// ============================================================================
// Module: Pointcut Tests
// Description: Name, regex, annotation, composed, and control-flow pointcuts.
// ============================================================================
//! ## Overview
//! Static pointcuts are checked directly through their filters and matchers;
//! dynamic ones through [`Pointcuts::matches`] or a live proxy.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

mod support;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crosscut_core::AdvisedConfig;
use crosscut_core::Advice;
use crosscut_core::Advisor;
use crosscut_core::AnnotationMatchingPointcut;
use crosscut_core::ChainElement;
use crosscut_core::ClassFilter;
use crosscut_core::ClassFilters;
use crosscut_core::ComposablePointcut;
use crosscut_core::ConfigError;
use crosscut_core::ControlFlowPointcut;
use crosscut_core::DispatchProxy;
use crosscut_core::ExpressionPointcut;
use crosscut_core::MethodInterceptor;
use crosscut_core::MethodInvocation;
use crosscut_core::MethodMatcher;
use crosscut_core::MethodMatchers;
use crosscut_core::NameMatchPointcut;
use crosscut_core::Pointcut;
use crosscut_core::Pointcuts;
use crosscut_core::RegexMethodPointcut;
use crosscut_core::RootClassFilter;
use crosscut_core::SingletonTargetSource;
use crosscut_core::TruePointcut;
use crosscut_meta::ClassBuilder;
use crosscut_meta::ClassInfo;
use crosscut_meta::MethodRef;
use crosscut_meta::MethodSpec;
use crosscut_meta::ReflectiveObject;
use crosscut_meta::Value;
use crosscut_meta::invoke_reflectively;
use support::Journal;
use support::method;
use support::order_target;
use support::orders;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runtime matcher accepting one method statically and counting per-call checks.
struct CountingRuntime {
    /// Method name accepted statically.
    accepts: &'static str,
    /// Per-call verdict.
    verdict: bool,
    /// Per-call checks performed.
    checks: AtomicUsize,
}

impl CountingRuntime {
    fn new(accepts: &'static str, verdict: bool) -> Self {
        Self {
            accepts,
            verdict,
            checks: AtomicUsize::new(0),
        }
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CountingRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingRuntime").field("accepts", &self.accepts).finish_non_exhaustive()
    }
}

impl MethodMatcher for CountingRuntime {
    fn matches(&self, method: &MethodRef, _target_class: &ClassInfo) -> bool {
        method.name() == self.accepts
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_runtime(&self, _method: &MethodRef, _target_class: &ClassInfo, _args: &[Value]) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

fn name_match(names: &[&str]) -> Arc<NameMatchPointcut> {
    Arc::new(NameMatchPointcut::new(names).unwrap())
}

fn static_match(pointcut: &dyn Pointcut, method: &MethodRef, class: &ClassInfo) -> bool {
    pointcut.class_filter().matches(class) && pointcut.method_matcher().matches(method, class)
}

// ============================================================================
// SECTION: Name and Regex
// ============================================================================

#[test]
fn name_patterns_support_wildcards() {
    let orders = orders("pc-names").unwrap();
    let class = &orders.implementation;
    let prefix = name_match(&["pla*"]);
    let suffix = name_match(&["*cel"]);
    let any = name_match(&["*"]);

    assert!(static_match(prefix.as_ref(), &method(class, "place"), class));
    assert!(!static_match(prefix.as_ref(), &method(class, "cancel"), class));
    assert!(static_match(suffix.as_ref(), &method(class, "cancel"), class));
    assert!(class.declared_methods().iter().all(|declared| static_match(any.as_ref(), declared, class)));
}

#[test]
fn regex_pointcut_tries_target_and_declaring_class() {
    let orders = orders("pc-regex").unwrap();
    let class = &orders.implementation;
    let by_target = RegexMethodPointcut::new([r"app\.DefaultOrderService\.pl.*"], Vec::<&str>::new()).unwrap();
    let by_interface = RegexMethodPointcut::new([r"app\.OrderService\..*"], [r".*\.current"]).unwrap();

    assert!(static_match(&by_target, &method(class, "place"), class));
    assert!(!static_match(&by_target, &method(class, "cancel"), class));
    assert!(static_match(&by_interface, &method(&orders.service, "cancel"), class));
    assert!(!static_match(&by_interface, &method(&orders.service, "current"), class));
    assert!(!static_match(&by_interface, &method(class, "version"), class));
}

#[test]
fn malformed_regex_is_a_configuration_error() {
    let err = RegexMethodPointcut::new(["("], Vec::<&str>::new()).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidPattern { pattern, .. } if pattern == "("));
}

// ============================================================================
// SECTION: Annotations
// ============================================================================

#[test]
fn annotation_pointcuts_check_class_and_method_markers() {
    let orders = orders("pc-annotations").unwrap();
    let contract = ClassBuilder::interface("app.Ledger")
        .annotate("tx.Transactional")
        .method(MethodSpec::new("post").params(["i64"]).annotate("audit.Logged"))
        .define(&orders.loader)
        .unwrap();
    let ledger = ClassBuilder::class("app.DefaultLedger")
        .implements(&contract)
        .method(MethodSpec::new("post").params(["i64"]))
        .method(MethodSpec::new("close").annotate("audit.Logged"))
        .define(&orders.loader)
        .unwrap();
    let post = method(&ledger, "post");
    let close = method(&ledger, "close");

    let direct_class = AnnotationMatchingPointcut::for_class_annotation("tx.Transactional");
    let inherited_class = AnnotationMatchingPointcut::for_class_annotation("tx.Transactional").inherited();
    let direct_method = AnnotationMatchingPointcut::for_method_annotation("audit.Logged");
    let inherited_method = AnnotationMatchingPointcut::for_method_annotation("audit.Logged").inherited();

    assert!(!direct_class.class_filter().matches(&ledger));
    assert!(inherited_class.class_filter().matches(&ledger));
    assert!(direct_method.method_matcher().matches(&close, &ledger));
    assert!(!direct_method.method_matcher().matches(&post, &ledger));
    assert!(inherited_method.method_matcher().matches(&post, &ledger));
}

// ============================================================================
// SECTION: Composition
// ============================================================================

#[test]
fn union_and_intersection_of_pointcuts() {
    let orders = orders("pc-compose").unwrap();
    let class = &orders.implementation;
    let place: Arc<dyn Pointcut> = name_match(&["place"]);
    let cancel: Arc<dyn Pointcut> = name_match(&["cancel"]);
    let either = Pointcuts::union(Arc::clone(&place), Arc::clone(&cancel));
    let both = Pointcuts::intersection(place, cancel);

    assert!(static_match(&either, &method(class, "place"), class));
    assert!(static_match(&either, &method(class, "cancel"), class));
    assert!(!static_match(&either, &method(class, "current"), class));
    assert!(!static_match(&both, &method(class, "place"), class));
    assert_eq!(either.to_string(), "ComposablePointcut(2 parts)");
}

#[test]
fn composed_filters_and_matchers_narrow_the_match() {
    let orders = orders("pc-filters").unwrap();
    let stranger = ClassBuilder::class("app.Stranger")
        .method(MethodSpec::new("place").params(["String"]))
        .define(&orders.loader)
        .unwrap();
    let composed = ComposablePointcut::new()
        .intersect_class_filter(RootClassFilter::shared(&orders.service))
        .intersect_method_matcher(MethodMatchers::negate(name_match(&["cancel"])));

    assert!(static_match(&composed, &method(&orders.implementation, "place"), &orders.implementation));
    assert!(!static_match(&composed, &method(&orders.implementation, "cancel"), &orders.implementation));
    assert!(!static_match(&composed, &method(&stranger, "place"), &stranger));

    let not_orders = ClassFilters::negate(RootClassFilter::shared(&orders.service));
    assert!(not_orders.matches(&stranger));
    assert!(!not_orders.matches(&orders.implementation));
}

#[test]
fn union_consults_runtime_checks_only_for_statically_matching_sides() {
    let orders = orders("pc-union-runtime").unwrap();
    let class = &orders.implementation;
    let dynamic = Arc::new(CountingRuntime::new("current", false));
    let matcher = MethodMatchers::union(name_match(&["place"]), dynamic.clone());

    assert!(matcher.is_runtime());
    assert!(matcher.matches(&method(class, "place"), class));
    assert!(matcher.matches(&method(class, "current"), class));
    assert!(!matcher.matches(&method(class, "cancel"), class));

    assert!(matcher.matches_runtime(&method(class, "place"), class, &[Value::from("x")]));
    assert_eq!(dynamic.checks(), 0, "static side already matched");
    assert!(!matcher.matches_runtime(&method(class, "current"), class, &[]));
    assert_eq!(dynamic.checks(), 1);
}

#[test]
fn negated_runtime_matcher_defers_to_the_call() {
    let orders = orders("pc-negate-runtime").unwrap();
    let class = &orders.implementation;
    let dynamic = Arc::new(CountingRuntime::new("place", true));
    let negated = MethodMatchers::negate(dynamic.clone());

    assert!(negated.matches(&method(class, "cancel"), class));
    assert!(negated.matches(&method(class, "place"), class));
    assert!(negated.matches_runtime(&method(class, "cancel"), class, &[]));
    assert!(!negated.matches_runtime(&method(class, "place"), class, &[Value::from("x")]));
    assert_eq!(dynamic.checks(), 1);
}

#[test]
fn full_match_runs_the_runtime_check_after_static_success() {
    let orders = orders("pc-full-match").unwrap();
    let class = &orders.implementation;
    let dynamic = Arc::new(CountingRuntime::new("place", false));
    let pointcut = ComposablePointcut::new().intersect_method_matcher(dynamic.clone());

    assert!(!Pointcuts::matches(&pointcut, &method(class, "place"), class, &[Value::from("x")]));
    assert!(!Pointcuts::matches(&pointcut, &method(class, "cancel"), class, &[Value::from("x")]));
    assert!(Pointcuts::matches(&TruePointcut, &method(class, "cancel"), class, &[Value::from("x")]));
    assert_eq!(dynamic.checks(), 1);
}

#[test]
fn composed_validation_reaches_every_part() {
    let broken: Arc<dyn Pointcut> = Arc::new(ExpressionPointcut::new("execution("));
    let composed = Pointcuts::union(Arc::new(TruePointcut), broken);

    assert!(matches!(composed.validate(), Err(ConfigError::Expression(_))));
    assert!(ComposablePointcut::new().validate().is_ok());
}

// ============================================================================
// SECTION: Control Flow
// ============================================================================

#[test]
fn control_flow_pointcut_matches_only_beneath_the_enclosing_call() {
    let orders = orders("pc-cflow").unwrap();
    let journal = Journal::default();
    let cflow = Arc::new(ControlFlowPointcut::for_method("app.Checkout", "run"));
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config.add_interface(&orders.service).unwrap();
    let advice_journal = journal.clone();
    config
        .add_advisor(Advisor::with_pointcut(
            cflow.clone(),
            Advice::before(move |method, _args, _target| {
                advice_journal.record(format!("cflow:{}", method.name()));
                Ok(())
            }),
        ))
        .unwrap();
    let proxy = DispatchProxy::create(Arc::new(config)).unwrap();
    let cancel = method(&orders.service, "cancel");

    invoke_reflectively(&proxy, &cancel, &[Value::from("direct")]).unwrap();

    let checkout = ClassBuilder::class("app.Checkout").method(MethodSpec::new("run")).define(&orders.loader).unwrap();
    let checkout_target = ReflectiveObject::builder(&checkout).on_args("run", |_args| Ok(Value::Null)).build_ref();
    let inner_proxy = Arc::clone(&proxy);
    let inner_cancel = Arc::clone(&cancel);
    let nested: Arc<dyn MethodInterceptor> = Arc::new(move |invocation: &mut MethodInvocation| {
        invoke_reflectively(&inner_proxy, &inner_cancel, &[Value::from("nested")])?;
        invocation.proceed()
    });
    MethodInvocation::new(
        Value::Null,
        Some(checkout_target),
        method(&checkout, "run"),
        Arc::clone(&checkout),
        Vec::new(),
        vec![ChainElement::Interceptor(nested)].into(),
    )
    .proceed()
    .unwrap();

    assert_eq!(journal.entries(), vec!["target:cancel", "cflow:cancel", "target:cancel"]);
    assert_eq!(cflow.evaluations(), 2);
}
