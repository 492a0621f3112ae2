// crates/crosscut-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Result helpers and an order-service fixture for engine tests.
// ============================================================================
//! ## Overview
//! Shared test helpers for consistent Result-based assertions, plus a small
//! type model (`app.OrderService` and its default implementation) and a
//! journal that advice and targets append to.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassBuilder;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodRef;
use crosscut_meta::MethodSpec;
use crosscut_meta::Modifiers;
use crosscut_meta::ObjectRef;
use crosscut_meta::Raised;
use crosscut_meta::ReflectiveObject;
use crosscut_meta::TypeLoader;
use crosscut_meta::Value;
use parking_lot::Mutex;

// ========================================================================
// Test Result Helpers
// ========================================================================

/// Standard result type used across engine integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Lightweight error type for test assertions.
#[derive(Debug)]
struct TestError {
    /// Human-readable failure message.
    message: String,
}

impl TestError {
    /// Creates a new test error with the provided message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for TestError {}

/// Returns an error when a test condition fails.
///
/// # Errors
/// Returns a `TestError` when the condition is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition { Ok(()) } else { Err(Box::new(TestError::new(message))) }
}

// ========================================================================
// Journal
// ========================================================================

/// Append-only event log shared between advice, targets, and assertions.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    /// Returns a snapshot of all entries.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Counts entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|recorded| recorded.as_str() == entry).count()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// ========================================================================
// Order Service Fixture
// ========================================================================

/// `app.OrderService` and `app.DefaultOrderService` in their own loader.
pub struct Orders {
    /// Loader defining the fixture types.
    pub loader: Arc<TypeLoader>,
    /// Interface: `place(String) -> String`, `cancel(String)`, `current() -> app.OrderService`.
    pub service: ClassRef,
    /// Implementation adding a final `version() -> i64`.
    pub implementation: ClassRef,
}

/// Defines the order-service types in a fresh loader named `name`.
pub fn orders(name: &str) -> TestResult<Orders> {
    let loader = TypeLoader::isolated(name);
    let service = ClassBuilder::interface("app.OrderService")
        .method(MethodSpec::new("place").params(["String"]).returns("String"))
        .method(MethodSpec::new("cancel").params(["String"]))
        .method(MethodSpec::new("current").returns("app.OrderService"))
        .define(&loader)?;
    let implementation = ClassBuilder::class("app.DefaultOrderService")
        .implements(&service)
        .method(MethodSpec::new("place").params(["String"]).returns("String"))
        .method(MethodSpec::new("cancel").params(["String"]))
        .method(MethodSpec::new("current").returns("app.OrderService"))
        .method(MethodSpec::new("version").returns("i64").with_modifier(Modifiers::FINAL))
        .define(&loader)?;
    Ok(Orders {
        loader,
        service,
        implementation,
    })
}

/// Target object that logs `target:<method>` for every call.
///
/// `place` echoes its argument, `cancel` raises `app.UnknownOrder` for the
/// order id `missing`, and `current` returns the object itself.
pub fn order_target(orders: &Orders, journal: &Journal) -> ObjectRef {
    let place = journal.clone();
    let cancel = journal.clone();
    let current = journal.clone();
    let version = journal.clone();
    ReflectiveObject::builder(&orders.implementation)
        .on_args("place", move |args| {
            place.record("target:place");
            let item = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(Value::from(format!("placed {item}")))
        })
        .on_args("cancel", move |args| {
            cancel.record("target:cancel");
            match args.first().and_then(Value::as_str) {
                Some("missing") => Err(Raised::new("app.UnknownOrder", "no such order")),
                _ => Ok(Value::Null),
            }
        })
        .on("current", move |this, _args| {
            current.record("target:current");
            Ok(Value::Object(Arc::clone(this)))
        })
        .on_args("version", move |_args| {
            version.record("target:version");
            Ok(Value::Int(7))
        })
        .build_ref()
}

/// Returns the method named `name` declared directly by `class`.
pub fn method(class: &ClassRef, name: &str) -> MethodRef {
    class.declared_methods().iter().find(|method| method.name() == name).cloned().unwrap()
}
