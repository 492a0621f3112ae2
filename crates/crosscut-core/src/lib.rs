// crates/crosscut-core/src/lib.rs
// ============================================================================
// Module: Crosscut Core Library
// Description: Public API surface for the method-interception engine.
// Purpose: Expose the interception model, matching interfaces, and runtime.
// Dependencies: crate::{core, interfaces, pointcut, runtime}
// ============================================================================

//! ## Overview
//! Crosscut core decides, per component and per method, which cross-cutting
//! behaviors apply, and runs them around the real call through a proxy.
//! Matching is expressed with pointcuts (static, dynamic, composed, or
//! expression-based); behaviors are adapted into one canonical interceptor
//! shape; chains are resolved once per method and then shared by every
//! thread calling the proxy.
//!
//! The engine integrates with a container through the collaborator traits in
//! [`interfaces`] and never depends on a particular proxying technique.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod pointcut;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AdvisorSource;
pub use interfaces::ClassFilter;
pub use interfaces::MethodInterceptor;
pub use interfaces::MethodMatcher;
pub use interfaces::Pointcut;
pub use interfaces::ProxyConstructor;
pub use interfaces::TargetSource;
pub use interfaces::TargetSourceCreator;
pub use interfaces::static_match;
pub use pointcut::AnnotationMatchingPointcut;
pub use pointcut::BeanNameDesignator;
pub use pointcut::ClassFilters;
pub use pointcut::ComposablePointcut;
pub use pointcut::ControlFlowPointcut;
pub use pointcut::ExpressionPointcut;
pub use pointcut::MethodMatchers;
pub use pointcut::NameMatchPointcut;
pub use pointcut::Pointcuts;
pub use pointcut::RegexMethodPointcut;
pub use pointcut::RootClassFilter;
pub use pointcut::TrueClassFilter;
pub use pointcut::TrueMethodMatcher;
pub use pointcut::TruePointcut;
pub use runtime::AdvisedConfig;
pub use runtime::AdvisorChainFactory;
pub use runtime::AutoProxyEngine;
pub use runtime::ChainElement;
pub use runtime::DefaultChainFactory;
pub use runtime::DefaultProxyConstructor;
pub use runtime::DispatchProxy;
pub use runtime::JoinPoint;
pub use runtime::MethodInvocation;
pub use runtime::ProxyCreationContext;
pub use runtime::ProxyKind;
pub use runtime::can_apply;
pub use runtime::current_joinpoint;
pub use runtime::current_proxy;
pub use runtime::find_applicable_advisors;
