// crates/crosscut-meta/src/object.rs
// ============================================================================
// Module: Managed Objects
// Description: Objects whose methods are invoked reflectively.
// Purpose: Provide the terminal call at the end of every interceptor chain.
// Dependencies: crate::{class, method, value}, thiserror
// ============================================================================

//! ## Overview
//! Anything that can sit behind a proxy implements [`Managed`]: it reports
//! its class and executes a method given a descriptor and arguments.
//! [`invoke_reflectively`] is the checked entry point. It validates arity,
//! argument types, visibility, and method existence before dispatching, so
//! signature problems surface as [`DispatchError`] variants that are never
//! confused with a business error ([`DispatchError::Raised`]).
//!
//! Security posture: dispatch never bypasses `private`; see
//! [`DispatchError::IllegalAccess`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use thiserror::Error;

use crate::class::ClassRef;
use crate::method::MethodInfo;
use crate::value::Raised;
use crate::value::Value;

/// Shared handle to a managed object.
pub type ObjectRef = Arc<dyn Managed>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced by reflective dispatch.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The method itself raised an error.
    #[error(transparent)]
    Raised(#[from] Raised),
    /// The receiver has no such method.
    #[error("no method `{method}` on `{class}`")]
    NoSuchMethod {
        /// Receiver class name.
        class: String,
        /// Requested signature.
        method: String,
    },
    /// Arguments do not fit the signature.
    #[error("argument mismatch calling `{method}`: {reason}")]
    ArgumentMismatch {
        /// Requested signature.
        method: String,
        /// Mismatch detail.
        reason: String,
    },
    /// The method is not accessible reflectively.
    #[error("illegal access to `{method}`")]
    IllegalAccess {
        /// Requested signature.
        method: String,
    },
    /// A nested layer (for example another proxy) failed for its own reasons.
    #[error("infrastructure failure: {0}")]
    Infrastructure(Arc<dyn StdError + Send + Sync>),
}

// ============================================================================
// SECTION: Managed Trait
// ============================================================================

/// Object that can receive reflective calls.
pub trait Managed: Send + Sync + 'static {
    /// Returns the runtime class.
    fn class(&self) -> &ClassRef;

    /// Executes `method` with already validated `args`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Raised`] when the method body fails, or
    /// another variant when the receiver cannot service the call.
    fn dispatch(&self, method: &MethodInfo, args: &[Value]) -> Result<Value, DispatchError>;

    /// Upcasts for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Invokes `method` on `target` after checking the call shape.
///
/// # Errors
///
/// Returns [`DispatchError::ArgumentMismatch`], [`DispatchError::NoSuchMethod`],
/// or [`DispatchError::IllegalAccess`] for malformed calls, and whatever the
/// receiver's [`Managed::dispatch`] returns otherwise.
pub fn invoke_reflectively(
    target: &ObjectRef,
    method: &MethodInfo,
    args: &[Value],
) -> Result<Value, DispatchError> {
    if args.len() != method.arity() {
        return Err(DispatchError::ArgumentMismatch {
            method: method.signature(),
            reason: format!("expected {} arguments, got {}", method.arity(), args.len()),
        });
    }
    for (index, (arg, param)) in args.iter().zip(method.params()).enumerate() {
        if !arg.is_instance_of_name(param) {
            return Err(DispatchError::ArgumentMismatch {
                method: method.signature(),
                reason: format!("argument {index} is `{}`, expected `{param}`", arg.type_name()),
            });
        }
    }
    let class = target.class();
    let resolved = class.find_method(method.name(), method.params()).ok_or_else(|| {
        DispatchError::NoSuchMethod {
            class: class.name().to_string(),
            method: method.signature(),
        }
    })?;
    if resolved.modifiers().is_private() {
        return Err(DispatchError::IllegalAccess {
            method: resolved.signature(),
        });
    }
    target.dispatch(&resolved, args)
}

// ============================================================================
// SECTION: Reflective Object
// ============================================================================

/// Method body: receives the object itself and the call arguments.
pub type Handler = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<Value, Raised> + Send + Sync>;

/// Table-driven [`Managed`] implementation.
pub struct ReflectiveObject {
    /// Runtime class.
    class: ClassRef,
    /// Handlers by method name.
    handlers: HashMap<String, Handler>,
    /// Self handle passed to handlers.
    this: Weak<Self>,
}

impl ReflectiveObject {
    /// Starts building an object of `class`.
    #[must_use]
    pub fn builder(class: &ClassRef) -> ReflectiveObjectBuilder {
        ReflectiveObjectBuilder {
            class: Arc::clone(class),
            handlers: HashMap::new(),
        }
    }
}

impl fmt::Debug for ReflectiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveObject")
            .field("class", &self.class.name())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Managed for ReflectiveObject {
    fn class(&self) -> &ClassRef {
        &self.class
    }

    fn dispatch(&self, method: &MethodInfo, args: &[Value]) -> Result<Value, DispatchError> {
        let handler = self.handlers.get(method.name()).ok_or_else(|| DispatchError::NoSuchMethod {
            class: self.class.name().to_string(),
            method: method.signature(),
        })?;
        let this: ObjectRef = self.this.upgrade().ok_or_else(|| DispatchError::IllegalAccess {
            method: method.signature(),
        })?;
        Ok(handler(&this, args)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for [`ReflectiveObject`].
pub struct ReflectiveObjectBuilder {
    /// Runtime class.
    class: ClassRef,
    /// Handlers by method name.
    handlers: HashMap<String, Handler>,
}

impl ReflectiveObjectBuilder {
    /// Registers the body for every overload named `name`.
    #[must_use]
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Registers a body that ignores its receiver.
    #[must_use]
    pub fn on_args<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    {
        self.on(name, move |_this, args| handler(args))
    }

    /// Finishes the object.
    #[must_use]
    pub fn build(self) -> Arc<ReflectiveObject> {
        Arc::new_cyclic(|this| ReflectiveObject {
            class: self.class,
            handlers: self.handlers,
            this: this.clone(),
        })
    }

    /// Finishes the object as a type-erased handle.
    #[must_use]
    pub fn build_ref(self) -> ObjectRef {
        self.build()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::ClassBuilder;
    use crate::MethodSpec;
    use crate::Modifiers;
    use crate::TypeLoader;

    #[test]
    fn reflective_call_checks_argument_types() {
        let loader = TypeLoader::isolated("obj");
        let class = ClassBuilder::class("o.Calc")
            .method(MethodSpec::new("twice").params(["i64"]).returns("i64"))
            .define(&loader)
            .unwrap();
        let target = ReflectiveObject::builder(&class)
            .on_args("twice", |args| Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2)))
            .build_ref();
        let method = class.declared_method("twice", &["i64".to_string()]).unwrap();

        let ok = invoke_reflectively(&target, &method, &[Value::Int(4)]).unwrap();
        assert_eq!(ok, Value::Int(8));
        let err = invoke_reflectively(&target, &method, &[Value::from("x")]).unwrap_err();
        assert!(matches!(err, DispatchError::ArgumentMismatch { .. }));
    }

    #[test]
    fn private_methods_are_not_reflectively_accessible() {
        let loader = TypeLoader::isolated("obj-private");
        let class = ClassBuilder::class("o.Hidden")
            .method(MethodSpec::new("secret").modifiers(Modifiers::PRIVATE))
            .define(&loader)
            .unwrap();
        let target = ReflectiveObject::builder(&class).on_args("secret", |_| Ok(Value::Null)).build_ref();
        let method = class.declared_method("secret", &[]).unwrap();
        let err = invoke_reflectively(&target, &method, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::IllegalAccess { .. }));
    }
}
