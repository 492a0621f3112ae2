// crates/crosscut-core/src/core/introduction.rs
// ============================================================================
// Module: Introductions
// Description: Interceptor that serves introduced interfaces from a delegate.
// Purpose: Let a proxy implement interfaces its target does not.
// Dependencies: crate::{core, interfaces, runtime}, crosscut_meta
// ============================================================================

//! ## Overview
//! Calls to a method declared by one of the introduced interfaces are sent
//! to the delegate object; every other call proceeds down the chain.

use std::fmt;

use crosscut_meta::ClassRef;
use crosscut_meta::OBJECT_TYPE;
use crosscut_meta::ObjectRef;
use crosscut_meta::Value;
use crosscut_meta::invoke_reflectively;

use crate::core::error::InvocationError;
use crate::interfaces::MethodInterceptor;
use crate::runtime::MethodInvocation;

/// Around-interceptor implementing introduced interfaces with a delegate.
pub struct DelegatingIntroduction {
    /// Introduced interfaces.
    interfaces: Vec<ClassRef>,
    /// Object implementing them.
    delegate: ObjectRef,
}

impl DelegatingIntroduction {
    /// Introduces `interfaces`, served by `delegate`.
    #[must_use]
    pub fn new(interfaces: Vec<ClassRef>, delegate: ObjectRef) -> Self {
        Self {
            interfaces,
            delegate,
        }
    }

    /// Returns the introduced interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    /// Returns true when `declaring` is an introduced interface or one of its super-interfaces.
    fn introduces(&self, declaring: &str) -> bool {
        declaring != OBJECT_TYPE && self.interfaces.iter().any(|iface| iface.is_subtype_of_name(declaring))
    }
}

impl fmt::Debug for DelegatingIntroduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.interfaces.iter().map(|iface| iface.name()).collect();
        f.debug_struct("DelegatingIntroduction").field("interfaces", &names).finish()
    }
}

impl MethodInterceptor for DelegatingIntroduction {
    fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value, InvocationError> {
        if self.introduces(invocation.method().declaring()) {
            return Ok(invoke_reflectively(&self.delegate, invocation.method(), invocation.arguments())?);
        }
        invocation.proceed()
    }
}
