// crates/crosscut-core/tests/advice.rs
// ============================================================================
// Module: Advice Adapter Tests
// Description: Built-in advice kinds and custom adapters behind a proxy.
// ============================================================================
//! ## Overview
//! Each built-in kind is adapted to an interceptor by [`AdapterRegistry`];
//! these tests pin down when each kind runs and how its errors surface.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]
#![allow(clippy::panic, reason = "Tests panic on unexpected variants.")]

mod support;

use std::sync::Arc;

use crosscut_core::AdapterRegistry;
use crosscut_core::AdvisedConfig;
use crosscut_core::Advice;
use crosscut_core::AdviceAdapter;
use crosscut_core::ConfigError;
use crosscut_core::DispatchProxy;
use crosscut_core::InvocationError;
use crosscut_core::MethodInterceptor;
use crosscut_core::MethodInvocation;
use crosscut_core::SingletonTargetSource;
use crosscut_meta::DispatchError;
use crosscut_meta::ObjectRef;
use crosscut_meta::Raised;
use crosscut_meta::Value;
use crosscut_meta::invoke_reflectively;
use support::Journal;
use support::Orders;
use support::method;
use support::order_target;
use support::orders;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Adapter for `audit` advice whose payload is a tag string.
struct AuditAdapter {
    /// Where audit entries go.
    journal: Journal,
}

impl AdviceAdapter for AuditAdapter {
    fn supports(&self, advice: &Advice) -> bool {
        advice.kind() == "audit"
    }

    fn interceptor(&self, advice: &Advice) -> Result<Arc<dyn MethodInterceptor>, ConfigError> {
        let Advice::Custom {
            payload, ..
        } = advice
        else {
            return Err(ConfigError::UnknownAdviceKind(advice.kind().to_string()));
        };
        let tag = payload.downcast_ref::<String>().cloned().unwrap_or_default();
        let journal = self.journal.clone();
        Ok(Arc::new(move |invocation: &mut MethodInvocation| {
            journal.record(format!("audit[{tag}]:{}", invocation.method().name()));
            invocation.proceed()
        }))
    }
}

fn proxy_with(orders: &Orders, config: AdvisedConfig) -> ObjectRef {
    config.add_interface(&orders.service).unwrap();
    DispatchProxy::create(Arc::new(config)).unwrap()
}

fn expect_raised(err: DispatchError) -> Raised {
    let DispatchError::Raised(raised) = err else {
        panic!("expected a raised error");
    };
    raised
}

// ============================================================================
// SECTION: Built-In Kinds
// ============================================================================

#[test]
fn failing_before_advice_skips_the_target() {
    let orders = orders("advice-before-veto").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config
        .add_advice(Advice::before(|method, _args, _target| {
            Err(InvocationError::Raised(Raised::new("app.Denied", format!("{} refused", method.name()))))
        }))
        .unwrap();
    let proxy = proxy_with(&orders, config);

    let err = invoke_reflectively(&proxy, &method(&orders.service, "place"), &[Value::from("kettle")]).unwrap_err();

    let raised = expect_raised(err);
    assert_eq!(raised.type_name, "app.Denied");
    assert_eq!(raised.message, "place refused");
    assert_eq!(journal.count("target:place"), 0);
}

#[test]
fn after_returning_sees_the_value_and_skips_failures() {
    let orders = orders("advice-after-returning").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    let seen = journal.clone();
    config
        .add_advice(Advice::after_returning(move |value, method, _args, _target| {
            seen.record(format!("returned:{}:{}", method.name(), value.as_str().unwrap_or("-")));
            Ok(())
        }))
        .unwrap();
    let proxy = proxy_with(&orders, config);

    let placed = invoke_reflectively(&proxy, &method(&orders.service, "place"), &[Value::from("kettle")]).unwrap();
    invoke_reflectively(&proxy, &method(&orders.service, "cancel"), &[Value::from("missing")]).unwrap_err();

    assert_eq!(placed.as_str(), Some("placed kettle"));
    assert_eq!(journal.entries(), vec!["target:place", "returned:place:placed kettle", "target:cancel"]);
}

#[test]
fn after_returning_error_replaces_the_value() {
    let orders = orders("advice-after-returning-error").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config
        .add_advice(Advice::after_returning(|_value, _method, _args, _target| {
            Err(InvocationError::Raised(Raised::new("app.Rejected", "post-check failed")))
        }))
        .unwrap();
    let proxy = proxy_with(&orders, config);

    let err = invoke_reflectively(&proxy, &method(&orders.service, "place"), &[Value::from("kettle")]).unwrap_err();

    assert_eq!(expect_raised(err).type_name, "app.Rejected");
    assert_eq!(journal.entries(), vec!["target:place"]);
}

#[test]
fn throws_advice_can_translate_the_failure() {
    let orders = orders("advice-throws-translate").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config
        .add_advice(Advice::after_throwing(|error, _method, _args| match error.as_raised() {
            Some(raised) if raised.type_name == "app.UnknownOrder" => {
                Err(InvocationError::Raised(Raised::new("app.OrderFault", raised.message.clone())))
            }
            _ => Ok(()),
        }))
        .unwrap();
    let proxy = proxy_with(&orders, config);

    let err = invoke_reflectively(&proxy, &method(&orders.service, "cancel"), &[Value::from("missing")]).unwrap_err();
    let ok = invoke_reflectively(&proxy, &method(&orders.service, "cancel"), &[Value::from("o-1")]);

    let raised = expect_raised(err);
    assert_eq!(raised.type_name, "app.OrderFault");
    assert_eq!(raised.message, "no such order");
    assert!(ok.is_ok());
}

#[test]
fn around_advice_can_rewrite_arguments() {
    let orders = orders("advice-around-args").unwrap();
    let journal = Journal::default();
    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))));
    config
        .add_advice(Advice::around(|invocation: &mut MethodInvocation| {
            let upper: Vec<Value> = invocation
                .arguments()
                .iter()
                .map(|arg| arg.as_str().map_or_else(|| arg.clone(), |text| Value::from(text.to_uppercase())))
                .collect();
            invocation.set_arguments(upper);
            invocation.proceed()
        }))
        .unwrap();
    let proxy = proxy_with(&orders, config);

    let placed = invoke_reflectively(&proxy, &method(&orders.service, "place"), &[Value::from("kettle")]).unwrap();

    assert_eq!(placed.as_str(), Some("placed KETTLE"));
}

// ============================================================================
// SECTION: Custom Kinds
// ============================================================================

#[test]
fn registered_adapter_handles_custom_kind() {
    let orders = orders("advice-custom").unwrap();
    let journal = Journal::default();
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(AuditAdapter {
        journal: journal.clone(),
    }));
    let registry = Arc::new(registry);
    let audit = Advice::Custom {
        kind: "audit".to_string(),
        payload: Arc::new("orders".to_string()),
    };
    assert!(registry.supports(&audit));
    assert!(!AdapterRegistry::new().supports(&audit));

    let config = AdvisedConfig::new(Arc::new(SingletonTargetSource::new(order_target(&orders, &journal))))
        .with_adapter_registry(registry);
    config.add_advice(audit).unwrap();
    let proxy = proxy_with(&orders, config);

    invoke_reflectively(&proxy, &method(&orders.service, "place"), &[Value::from("kettle")]).unwrap();

    assert_eq!(journal.entries(), vec!["audit[orders]:place", "target:place"]);
}
