// crates/crosscut-core/src/core/advice.rs
// ============================================================================
// Module: Advice and Adapters
// Description: Advice kinds and their conversion into interceptors.
// Purpose: Reduce every behavior to the canonical around shape at assembly time.
// Dependencies: crate::{core, interfaces, runtime}, crosscut_meta
// ============================================================================

//! ## Overview
//! [`Advice`] is a closed sum over the built-in behavior kinds plus an open
//! [`Advice::Custom`] variant. An [`AdapterRegistry`] converts any advice
//! into a [`MethodInterceptor`]; built-in kinds are matched exhaustively,
//! custom kinds go to registered [`AdviceAdapter`]s. A custom kind without
//! an adapter is a [`ConfigError`] raised when the advisor is added.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crosscut_meta::MethodRef;
use crosscut_meta::Value;

use crate::core::error::ConfigError;
use crate::core::error::InvocationError;
use crate::interfaces::MethodInterceptor;
use crate::runtime::MethodInvocation;

// ============================================================================
// SECTION: Advice Kinds
// ============================================================================

/// Runs before the call; an error aborts the call.
pub trait BeforeAdvice: Send + Sync {
    /// Called with the method, current arguments, and target.
    ///
    /// # Errors
    ///
    /// An error is returned to the caller instead of running the chain.
    fn before(&self, method: &MethodRef, args: &[Value], target: Option<&Value>) -> Result<(), InvocationError>;
}

impl<F> BeforeAdvice for F
where
    F: Fn(&MethodRef, &[Value], Option<&Value>) -> Result<(), InvocationError> + Send + Sync,
{
    fn before(&self, method: &MethodRef, args: &[Value], target: Option<&Value>) -> Result<(), InvocationError> {
        self(method, args, target)
    }
}

/// Runs after a normal return.
pub trait AfterReturningAdvice: Send + Sync {
    /// Called with the returned value.
    ///
    /// # Errors
    ///
    /// An error replaces the returned value.
    fn after_returning(
        &self,
        returned: &Value,
        method: &MethodRef,
        args: &[Value],
        target: Option<&Value>,
    ) -> Result<(), InvocationError>;
}

impl<F> AfterReturningAdvice for F
where
    F: Fn(&Value, &MethodRef, &[Value], Option<&Value>) -> Result<(), InvocationError> + Send + Sync,
{
    fn after_returning(
        &self,
        returned: &Value,
        method: &MethodRef,
        args: &[Value],
        target: Option<&Value>,
    ) -> Result<(), InvocationError> {
        self(returned, method, args, target)
    }
}

/// Runs after the chain failed.
pub trait ThrowsAdvice: Send + Sync {
    /// Called with the failure; the original error is rethrown unless this returns another.
    ///
    /// # Errors
    ///
    /// An error replaces the original failure.
    fn after_throwing(&self, error: &InvocationError, method: &MethodRef, args: &[Value]) -> Result<(), InvocationError>;
}

impl<F> ThrowsAdvice for F
where
    F: Fn(&InvocationError, &MethodRef, &[Value]) -> Result<(), InvocationError> + Send + Sync,
{
    fn after_throwing(&self, error: &InvocationError, method: &MethodRef, args: &[Value]) -> Result<(), InvocationError> {
        self(error, method, args)
    }
}

/// A cross-cutting behavior.
#[derive(Clone)]
pub enum Advice {
    /// Before the call.
    Before(Arc<dyn BeforeAdvice>),
    /// After a normal return.
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    /// After a failure.
    AfterThrowing(Arc<dyn ThrowsAdvice>),
    /// Around the call; already canonical.
    Around(Arc<dyn MethodInterceptor>),
    /// Kind understood only by a registered [`AdviceAdapter`].
    Custom {
        /// Kind name adapters dispatch on.
        kind: String,
        /// Adapter-specific payload.
        payload: Arc<dyn Any + Send + Sync>,
    },
}

impl Advice {
    /// Before advice from a closure.
    pub fn before<F>(advice: F) -> Self
    where
        F: Fn(&MethodRef, &[Value], Option<&Value>) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self::Before(Arc::new(advice))
    }

    /// After-returning advice from a closure.
    pub fn after_returning<F>(advice: F) -> Self
    where
        F: Fn(&Value, &MethodRef, &[Value], Option<&Value>) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self::AfterReturning(Arc::new(advice))
    }

    /// Throws advice from a closure.
    pub fn after_throwing<F>(advice: F) -> Self
    where
        F: Fn(&InvocationError, &MethodRef, &[Value]) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self::AfterThrowing(Arc::new(advice))
    }

    /// Around advice from a closure.
    pub fn around<F>(interceptor: F) -> Self
    where
        F: Fn(&mut MethodInvocation) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self::Around(Arc::new(interceptor))
    }

    /// Returns the kind name used in diagnostics and adapter dispatch.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Before(_) => "before",
            Self::AfterReturning(_) => "after-returning",
            Self::AfterThrowing(_) => "after-throwing",
            Self::Around(_) => "around",
            Self::Custom {
                kind, ..
            } => kind,
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advice({})", self.kind())
    }
}

// ============================================================================
// SECTION: Built-In Interceptors
// ============================================================================

/// Target of the current call as a value, for advice signatures.
fn target_value(invocation: &MethodInvocation) -> Option<Value> {
    invocation.target().map(|target| Value::Object(Arc::clone(target)))
}

/// Adapts [`BeforeAdvice`].
struct BeforeInterceptor(Arc<dyn BeforeAdvice>);

impl MethodInterceptor for BeforeInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value, InvocationError> {
        let target = target_value(invocation);
        self.0.before(invocation.method(), invocation.arguments(), target.as_ref())?;
        invocation.proceed()
    }
}

/// Adapts [`AfterReturningAdvice`].
struct AfterReturningInterceptor(Arc<dyn AfterReturningAdvice>);

impl MethodInterceptor for AfterReturningInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value, InvocationError> {
        let returned = invocation.proceed()?;
        let target = target_value(invocation);
        self.0.after_returning(&returned, invocation.method(), invocation.arguments(), target.as_ref())?;
        Ok(returned)
    }
}

/// Adapts [`ThrowsAdvice`].
struct ThrowsInterceptor(Arc<dyn ThrowsAdvice>);

impl MethodInterceptor for ThrowsInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value, InvocationError> {
        invocation.proceed().or_else(|error| {
            self.0.after_throwing(&error, invocation.method(), invocation.arguments())?;
            Err(error)
        })
    }
}

// ============================================================================
// SECTION: Adapter Registry
// ============================================================================

/// Converts custom advice kinds into interceptors.
pub trait AdviceAdapter: Send + Sync {
    /// Returns true when this adapter understands `advice`.
    fn supports(&self, advice: &Advice) -> bool;

    /// Wraps `advice` in an interceptor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the payload is malformed.
    fn interceptor(&self, advice: &Advice) -> Result<Arc<dyn MethodInterceptor>, ConfigError>;
}

/// Registry of advice adapters, owned by whoever assembles proxies.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    /// Adapters for custom kinds, consulted in registration order.
    adapters: Vec<Arc<dyn AdviceAdapter>>,
}

impl AdapterRegistry {
    /// Registry that understands only the built-in kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter for custom kinds.
    pub fn register(&mut self, adapter: Arc<dyn AdviceAdapter>) {
        self.adapters.push(adapter);
    }

    /// Returns true when `advice` can be converted.
    #[must_use]
    pub fn supports(&self, advice: &Advice) -> bool {
        match advice {
            Advice::Custom {
                ..
            } => self.adapters.iter().any(|adapter| adapter.supports(advice)),
            _ => true,
        }
    }

    /// Converts `advice` into its interceptor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAdviceKind`] when no adapter supports a
    /// custom kind.
    pub fn wrap(&self, advice: &Advice) -> Result<Arc<dyn MethodInterceptor>, ConfigError> {
        match advice {
            Advice::Before(inner) => Ok(Arc::new(BeforeInterceptor(Arc::clone(inner)))),
            Advice::AfterReturning(inner) => Ok(Arc::new(AfterReturningInterceptor(Arc::clone(inner)))),
            Advice::AfterThrowing(inner) => Ok(Arc::new(ThrowsInterceptor(Arc::clone(inner)))),
            Advice::Around(inner) => Ok(Arc::clone(inner)),
            Advice::Custom {
                kind, ..
            } => self
                .adapters
                .iter()
                .find(|adapter| adapter.supports(advice))
                .ok_or_else(|| ConfigError::UnknownAdviceKind(kind.clone()))?
                .interceptor(advice),
        }
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry").field("custom_adapters", &self.adapters.len()).finish()
    }
}
