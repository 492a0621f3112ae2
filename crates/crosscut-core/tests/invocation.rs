// crates/crosscut-core/tests/invocation.rs
// ============================================================================
// Module: Method Invocation Tests
// Description: Proceed ordering, argument replacement, errors, and clones.
// ============================================================================
//! ## Overview
//! Drives [`MethodInvocation`] directly over hand-built chains so the proceed
//! state machine is tested without proxies in between.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

mod support;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crosscut_core::ChainElement;
use crosscut_core::ClassFilter;
use crosscut_core::InvocationError;
use crosscut_core::MethodInterceptor;
use crosscut_core::MethodInvocation;
use crosscut_core::MethodMatcher;
use crosscut_core::Pointcut;
use crosscut_core::TargetSourceError;
use crosscut_core::TrueClassFilter;
use crosscut_core::current_joinpoint;
use crosscut_meta::ClassInfo;
use crosscut_meta::DispatchError;
use crosscut_meta::MethodRef;
use crosscut_meta::ObjectRef;
use crosscut_meta::Raised;
use crosscut_meta::Value;
use support::Journal;
use support::Orders;
use support::method;
use support::order_target;
use support::orders;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Interceptor logging `<name>:before` and `<name>:after` around proceed.
fn logging_interceptor(name: &'static str, journal: &Journal) -> Arc<dyn MethodInterceptor> {
    let journal = journal.clone();
    Arc::new(move |invocation: &mut MethodInvocation| {
        journal.record(format!("{name}:before"));
        let result = invocation.proceed();
        journal.record(format!("{name}:after"));
        result
    })
}

fn logging(name: &'static str, journal: &Journal) -> ChainElement {
    ChainElement::Interceptor(logging_interceptor(name, journal))
}

fn place_invocation(orders: &Orders, target: &ObjectRef, chain: Vec<ChainElement>) -> MethodInvocation {
    MethodInvocation::new(
        Value::Null,
        Some(Arc::clone(target)),
        method(&orders.implementation, "place"),
        Arc::clone(&orders.implementation),
        vec![Value::from("book")],
        chain.into(),
    )
}

/// Runtime-only pointcut accepting calls whose first argument is not `skip`.
struct SkipMarker {
    /// Per-call checks performed.
    checks: AtomicUsize,
}

impl fmt::Debug for SkipMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SkipMarker")
    }
}

impl MethodMatcher for SkipMarker {
    fn matches(&self, _method: &MethodRef, _target_class: &ClassInfo) -> bool {
        true
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_runtime(&self, _method: &MethodRef, _target_class: &ClassInfo, args: &[Value]) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        args.first().and_then(Value::as_str) != Some("skip")
    }
}

impl Pointcut for SkipMarker {
    fn class_filter(&self) -> &dyn ClassFilter {
        &TrueClassFilter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

// ============================================================================
// SECTION: Proceed
// ============================================================================

#[test]
fn proceed_runs_entries_in_order_then_target_once() {
    let orders = orders("invocation-order").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let chain = vec![logging("outer", &journal), logging("inner", &journal)];

    let mut invocation = place_invocation(&orders, &target, chain);
    let result = invocation.proceed().unwrap();

    assert_eq!(result, Value::from("placed book"));
    assert_eq!(journal.entries(), vec!["outer:before", "inner:before", "target:place", "inner:after", "outer:after"]);
    assert!(invocation.target_reached());
}

#[test]
fn empty_chain_calls_target_directly() {
    let orders = orders("invocation-empty").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);

    let result = place_invocation(&orders, &target, Vec::new()).proceed().unwrap();

    assert_eq!(result, Value::from("placed book"));
    assert_eq!(journal.count("target:place"), 1);
}

#[test]
fn replaced_arguments_reach_the_target() {
    let orders = orders("invocation-args").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let rewrite: Arc<dyn MethodInterceptor> = Arc::new(|invocation: &mut MethodInvocation| {
        invocation.set_arguments(vec![Value::from("lamp")]);
        invocation.proceed()
    });

    let result = place_invocation(&orders, &target, vec![ChainElement::Interceptor(rewrite)]).proceed().unwrap();

    assert_eq!(result, Value::from("placed lamp"));
}

#[test]
fn deferred_entry_is_skipped_when_runtime_check_declines() {
    let orders = orders("invocation-deferred").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let marker = Arc::new(SkipMarker {
        checks: AtomicUsize::new(0),
    });
    let skip_rewrite: Arc<dyn MethodInterceptor> = Arc::new(|invocation: &mut MethodInvocation| {
        invocation.set_arguments(vec![Value::from("skip")]);
        invocation.proceed()
    });
    let gated = logging_interceptor("gated", &journal);
    let chain = vec![
        ChainElement::Interceptor(skip_rewrite),
        ChainElement::Deferred {
            interceptor: gated,
            pointcut: marker.clone(),
        },
    ];

    place_invocation(&orders, &target, chain).proceed().unwrap();

    assert_eq!(marker.checks.load(Ordering::SeqCst), 1);
    assert_eq!(journal.entries(), vec!["target:place"]);
}

// ============================================================================
// SECTION: Errors
// ============================================================================

#[test]
fn raised_errors_propagate_unchanged() {
    let orders = orders("invocation-raised").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let mut invocation = MethodInvocation::new(
        Value::Null,
        Some(target),
        method(&orders.implementation, "cancel"),
        Arc::clone(&orders.implementation),
        vec![Value::from("missing")],
        vec![logging("outer", &journal)].into(),
    );

    let err = invocation.proceed().unwrap_err();

    assert_eq!(err.as_raised(), Some(&Raised::new("app.UnknownOrder", "no such order")));
    assert!(!err.is_infrastructure());
    assert_eq!(err.to_string(), "app.UnknownOrder: no such order");
}

#[test]
fn reflection_failures_are_distinct_from_raised_errors() {
    let orders = orders("invocation-reflection").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let mut invocation = MethodInvocation::new(
        Value::Null,
        Some(target),
        method(&orders.implementation, "place"),
        Arc::clone(&orders.implementation),
        vec![Value::Int(3)],
        Vec::new().into(),
    );

    let err = invocation.proceed().unwrap_err();

    assert!(matches!(err, InvocationError::Reflection(DispatchError::ArgumentMismatch { .. })));
    assert!(err.is_infrastructure());
    assert_eq!(journal.count("target:place"), 0);
}

#[test]
fn proceeding_after_the_target_is_a_chain_error() {
    let orders = orders("invocation-twice").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let twice: Arc<dyn MethodInterceptor> = Arc::new(|invocation: &mut MethodInvocation| {
        invocation.proceed()?;
        invocation.proceed()
    });

    let err = place_invocation(&orders, &target, vec![ChainElement::Interceptor(twice)]).proceed().unwrap_err();

    assert!(matches!(err, InvocationError::Chain(_)));
    assert_eq!(journal.count("target:place"), 1);
}

#[test]
fn missing_target_is_reported_by_the_target_source_kind() {
    let orders = orders("invocation-no-target").unwrap();
    let mut invocation = MethodInvocation::new(
        Value::Null,
        None,
        method(&orders.implementation, "place"),
        Arc::clone(&orders.implementation),
        vec![Value::from("book")],
        Vec::new().into(),
    );

    let err = invocation.proceed().unwrap_err();

    assert!(matches!(err, InvocationError::TargetSource(TargetSourceError::Unavailable(_))));
}

// ============================================================================
// SECTION: Clones and Attributes
// ============================================================================

#[test]
fn clones_run_the_full_chain_independently() {
    let orders = orders("invocation-clones").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let attribute_journal = journal.clone();
    let marker: Arc<dyn MethodInterceptor> = Arc::new(move |invocation: &mut MethodInvocation| {
        let seen = invocation.user_attribute("seen").is_some();
        attribute_journal.record(format!("seen:{seen}"));
        invocation.set_user_attribute("seen", Some(Value::Bool(true)));
        invocation.proceed()
    });
    let invocation = place_invocation(&orders, &target, vec![ChainElement::Interceptor(marker)]);
    invocation.set_user_attribute("seen", Some(Value::Bool(true)));

    let mut first = invocation.invocable_clone();
    let mut second = invocation.invocable_clone_with(vec![Value::from("lamp")]);
    let first_result = first.proceed().unwrap();
    let second_result = second.proceed().unwrap();

    assert_eq!(first_result, Value::from("placed book"));
    assert_eq!(second_result, Value::from("placed lamp"));
    assert_eq!(journal.count("target:place"), 2);
    assert_eq!(journal.count("seen:false"), 2);
    assert!(first.user_attribute("seen").is_some());
    assert!(!invocation.target_reached());
}

#[test]
fn clearing_an_attribute_removes_it() {
    let orders = orders("invocation-attributes").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let invocation = place_invocation(&orders, &target, Vec::new());

    invocation.set_user_attribute("tenant", Some(Value::from("acme")));
    assert_eq!(invocation.user_attribute("tenant"), Some(Value::from("acme")));
    invocation.set_user_attribute("tenant", None);
    assert_eq!(invocation.user_attribute("tenant"), None);
}

// ============================================================================
// SECTION: Ambient Join Point
// ============================================================================

#[test]
fn current_joinpoint_nests_and_unwinds() {
    let orders = orders("invocation-ambient").unwrap();
    let journal = Journal::default();
    let target = order_target(&orders, &journal);
    let nested_target = Arc::clone(&target);
    let nested_orders_class = Arc::clone(&orders.implementation);
    let cancel = method(&orders.implementation, "cancel");
    let ambient_journal = journal.clone();

    let outer: Arc<dyn MethodInterceptor> = Arc::new(move |invocation: &mut MethodInvocation| {
        let inner_journal = ambient_journal.clone();
        let probe: Arc<dyn MethodInterceptor> = Arc::new(move |inner: &mut MethodInvocation| {
            let current = current_joinpoint().expect("inner join point exposed");
            inner_journal.record(format!("inside:{}", current.method().name()));
            inner.proceed()
        });
        let mut nested = MethodInvocation::new(
            Value::Null,
            Some(Arc::clone(&nested_target)),
            Arc::clone(&cancel),
            Arc::clone(&nested_orders_class),
            vec![Value::from("missing")],
            vec![ChainElement::Interceptor(probe)].into(),
        );
        let nested_err = nested.proceed();
        let restored = current_joinpoint().expect("outer join point restored");
        ambient_journal.record(format!("restored:{}", restored.method().name()));
        ambient_journal.record(format!("nested_failed:{}", nested_err.is_err()));
        invocation.proceed()
    });

    place_invocation(&orders, &target, vec![ChainElement::Interceptor(outer)]).proceed().unwrap();

    assert!(current_joinpoint().is_none());
    assert_eq!(journal.entries(), vec![
        "inside:cancel",
        "target:cancel",
        "restored:place",
        "nested_failed:true",
        "target:place"
    ]);
}
