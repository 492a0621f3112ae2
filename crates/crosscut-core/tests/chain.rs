// crates/crosscut-core/tests/chain.rs
// ============================================================================
// Module: Advisor Chain Tests
// Description: Chain resolution, dynamic matcher gating, and applicability.
// ============================================================================
//! ## Overview
//! Resolves chains through [`AdvisedConfig`] and checks which advisors land
//! in them, how often matchers run, and that declared order survives.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

mod support;

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crosscut_core::AdvisedConfig;
use crosscut_core::Advice;
use crosscut_core::Advisor;
use crosscut_core::AdvisorChainFactory;
use crosscut_core::ChainElement;
use crosscut_core::ClassFilter;
use crosscut_core::ConfigError;
use crosscut_core::DefaultChainFactory;
use crosscut_core::DelegatingIntroduction;
use crosscut_core::DispatchProxy;
use crosscut_core::MethodMatcher;
use crosscut_core::NameMatchPointcut;
use crosscut_core::Pointcut;
use crosscut_core::SingletonTargetSource;
use crosscut_core::TrueClassFilter;
use crosscut_core::can_apply;
use crosscut_core::find_applicable_advisors;
use crosscut_meta::ClassBuilder;
use crosscut_meta::ClassInfo;
use crosscut_meta::MethodRef;
use crosscut_meta::MethodSpec;
use crosscut_meta::ReflectiveObject;
use crosscut_meta::Value;
use crosscut_meta::invoke_reflectively;
use proptest::prelude::*;
use support::Journal;
use support::method;
use support::order_target;
use support::orders;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Chain factory that adds one advisor while the first chain is resolving.
struct InterleavingFactory {
    /// Advisor added during the first resolution.
    late: Mutex<Option<Advisor>>,
}

impl AdvisorChainFactory for InterleavingFactory {
    fn resolve(
        &self,
        config: &AdvisedConfig,
        method: &MethodRef,
        target_class: &ClassInfo,
    ) -> Result<Vec<ChainElement>, ConfigError> {
        let chain = DefaultChainFactory.resolve(config, method, target_class)?;
        if let Some(advisor) = self.late.lock().unwrap().take() {
            config.add_advisor(advisor)?;
        }
        Ok(chain)
    }
}

/// Dynamic matcher counting its static and per-call checks.
struct InstrumentedMatcher {
    /// Method name accepted statically.
    accepts: &'static str,
    /// Static checks performed.
    static_checks: AtomicUsize,
    /// Per-call checks performed.
    runtime_checks: AtomicUsize,
}

impl InstrumentedMatcher {
    fn new(accepts: &'static str) -> Self {
        Self {
            accepts,
            static_checks: AtomicUsize::new(0),
            runtime_checks: AtomicUsize::new(0),
        }
    }
}

impl fmt::Debug for InstrumentedMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedMatcher").field("accepts", &self.accepts).finish_non_exhaustive()
    }
}

impl MethodMatcher for InstrumentedMatcher {
    fn matches(&self, method: &MethodRef, _target_class: &ClassInfo) -> bool {
        self.static_checks.fetch_add(1, Ordering::SeqCst);
        method.name() == self.accepts
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_runtime(&self, _method: &MethodRef, _target_class: &ClassInfo, _args: &[Value]) -> bool {
        self.runtime_checks.fetch_add(1, Ordering::SeqCst);
        true
    }
}

impl Pointcut for InstrumentedMatcher {
    fn class_filter(&self) -> &dyn ClassFilter {
        &TrueClassFilter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

fn recording_before(label: String, journal: &Journal) -> Advice {
    let journal = journal.clone();
    Advice::before(move |_method, _args, _target| {
        journal.record(label.clone());
        Ok(())
    })
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

#[test]
fn unconditional_advisor_appears_in_every_chain() {
    let orders = orders("chain-unconditional").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config.add_advice(recording_before("before".to_string(), &journal)).unwrap();

    for declared in orders.implementation.declared_methods() {
        let chain = config.chain_for(declared, &orders.implementation).unwrap();
        assert_eq!(chain.len(), 1, "chain for {}", declared.name());
        assert!(!chain[0].is_deferred());
    }
}

#[test]
fn chains_are_resolved_per_method() {
    let orders = orders("chain-per-method").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    let pointcut = Arc::new(NameMatchPointcut::new(["place"]).unwrap());
    config.add_advisor(Advisor::with_pointcut(pointcut, recording_before("x".to_string(), &journal))).unwrap();

    let place = config.chain_for(&method(&orders.implementation, "place"), &orders.implementation).unwrap();
    let cancel = config.chain_for(&method(&orders.implementation, "cancel"), &orders.implementation).unwrap();
    let place_again = config.chain_for(&method(&orders.implementation, "place"), &orders.implementation).unwrap();

    assert_eq!(place.len(), 1);
    assert!(cancel.is_empty());
    assert!(Arc::ptr_eq(&place, &place_again));
}

#[test]
fn runtime_check_runs_only_after_static_match() {
    let orders = orders("chain-instrumented").unwrap();
    let journal = Journal::default();
    let matcher = Arc::new(InstrumentedMatcher::new("place"));
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config.add_interface(&orders.service).unwrap();
    config.add_advisor(Advisor::with_pointcut(matcher.clone(), recording_before("gated".to_string(), &journal))).unwrap();
    let proxy = DispatchProxy::create(Arc::new(config)).unwrap();

    let place = method(&orders.service, "place");
    let cancel = method(&orders.service, "cancel");
    invoke_reflectively(&proxy, &place, &[Value::from("a")]).unwrap();
    invoke_reflectively(&proxy, &place, &[Value::from("b")]).unwrap();
    invoke_reflectively(&proxy, &cancel, &[Value::from("c")]).unwrap();

    assert_eq!(matcher.static_checks.load(Ordering::SeqCst), 2, "one static check per resolved chain");
    assert_eq!(matcher.runtime_checks.load(Ordering::SeqCst), 2, "per-call checks only for place");
    assert_eq!(journal.count("gated"), 2);
    assert_eq!(journal.count("target:cancel"), 1);
}

#[test]
fn changing_advisors_invalidates_cached_chains() {
    let orders = orders("chain-invalidate").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    let place = method(&orders.implementation, "place");

    assert!(config.chain_for(&place, &orders.implementation).unwrap().is_empty());
    let advisor = Arc::new(Advisor::unconditional(recording_before("late".to_string(), &journal)));
    config.add_advisor(Arc::clone(&advisor)).unwrap();
    assert_eq!(config.chain_for(&place, &orders.implementation).unwrap().len(), 1);
    assert!(config.remove_advisor(&advisor).unwrap());
    assert!(config.chain_for(&place, &orders.implementation).unwrap().is_empty());
}

#[test]
fn chain_resolved_during_a_change_is_not_cached() {
    let orders = orders("chain-interleaved-change").unwrap();
    let journal = Journal::default();
    let factory = InterleavingFactory {
        late: Mutex::new(Some(Advisor::unconditional(recording_before("late".to_string(), &journal)))),
    };
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))))
        .with_chain_factory(Arc::new(factory));
    let place = method(&orders.implementation, "place");

    let during = config.chain_for(&place, &orders.implementation).unwrap();
    let after = config.chain_for(&place, &orders.implementation).unwrap();

    assert!(during.is_empty());
    assert_eq!(config.advisors().len(), 1);
    assert_eq!(after.len(), 1, "the chain reflects the advisor added mid-resolution");
}

#[test]
fn rejected_insert_leaves_interfaces_untouched() {
    let orders = orders("chain-rejected-introduction").unwrap();
    let journal = Journal::default();
    let auditable = ClassBuilder::interface("app.Auditable")
        .method(MethodSpec::new("audited").returns("String"))
        .define(&orders.loader)
        .unwrap();
    let audit_log = ClassBuilder::class("app.AuditLog")
        .implements(&auditable)
        .method(MethodSpec::new("audited").returns("String"))
        .define(&orders.loader)
        .unwrap();
    let delegate = ReflectiveObject::builder(&audit_log).on_args("audited", |_args| Ok(Value::from("audited"))).build_ref();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    let introduction = Advisor::introduction(DelegatingIntroduction::new(vec![Arc::clone(&auditable)], delegate));

    let result = config.insert_advisor(5, introduction);

    assert!(matches!(result, Err(ConfigError::IndexOutOfRange { index: 5, len: 0 })));
    assert!(config.interfaces().is_empty());
    assert!(!config.is_interface_proxied("app.Auditable"));
    assert!(config.advisors().is_empty());
}

#[test]
fn configuration_errors_surface_when_advisors_are_added() {
    let orders = orders("chain-config-errors").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));

    let custom = Advice::Custom {
        kind: "audit".to_string(),
        payload: Arc::new(()),
    };
    assert_eq!(config.add_advice(custom), Err(ConfigError::UnknownAdviceKind("audit".to_string())));
    assert!(matches!(
        config.insert_advisor(3, Advisor::unconditional(recording_before("x".to_string(), &journal))),
        Err(ConfigError::IndexOutOfRange { index: 3, len: 0 })
    ));

    config.set_frozen(true);
    assert_eq!(config.add_advice(recording_before("x".to_string(), &journal)), Err(ConfigError::Frozen));
    assert!(config.advisors().is_empty());
}

// ============================================================================
// SECTION: Applicability
// ============================================================================

#[test]
fn can_apply_requires_a_matching_method() {
    let orders = orders("chain-can-apply").unwrap();
    let journal = Journal::default();
    let cancel = Arc::new(Advisor::with_pointcut(
        Arc::new(NameMatchPointcut::new(["cancel"]).unwrap()),
        recording_before("c".to_string(), &journal),
    ));
    let refund = Arc::new(Advisor::with_pointcut(
        Arc::new(NameMatchPointcut::new(["refund"]).unwrap()),
        recording_before("r".to_string(), &journal),
    ));

    assert!(can_apply(&cancel, &orders.implementation, false));
    assert!(!can_apply(&refund, &orders.implementation, false));
    assert_eq!(find_applicable_advisors(&[Arc::clone(&cancel), refund], &orders.implementation).len(), 1);
}

#[test]
fn can_apply_sees_inherited_interface_methods() {
    let orders = orders("chain-can-apply-inherited").unwrap();
    let journal = Journal::default();
    let extended = ClassBuilder::interface("app.TrackedOrderService")
        .implements(&orders.service)
        .method(MethodSpec::new("track").params(["String"]))
        .define(&orders.loader)
        .unwrap();
    let bare = ClassBuilder::class("app.RemoteOrders").implements(&extended).define(&orders.loader).unwrap();
    let place = Arc::new(Advisor::with_pointcut(
        Arc::new(NameMatchPointcut::new(["pla*"]).unwrap()),
        recording_before("p".to_string(), &journal),
    ));

    assert!(bare.declared_methods().is_empty());
    assert!(can_apply(&place, &bare, false));
}

// ============================================================================
// SECTION: Order Preservation
// ============================================================================

proptest! {
    #[test]
    fn chain_preserves_declared_order(orders_by_position in proptest::collection::vec(-50i32..50, 1..8)) {
        let fixture = orders("chain-order-prop").unwrap();
        let journal = Journal::default();
        let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&fixture, &journal))));
        for (position, order) in orders_by_position.iter().enumerate() {
            let advisor = Advisor::unconditional(recording_before(position.to_string(), &journal)).with_order(*order);
            config.add_advisor(advisor).unwrap();
        }
        config.add_interface(&fixture.service).unwrap();
        let proxy = DispatchProxy::create(Arc::new(config)).unwrap();

        invoke_reflectively(&proxy, &method(&fixture.service, "place"), &[Value::from("x")]).unwrap();

        let mut expected: Vec<String> = (0..orders_by_position.len()).map(|position| position.to_string()).collect();
        expected.push("target:place".to_string());
        prop_assert_eq!(journal.entries(), expected);
    }
}
