// crates/crosscut-core/src/runtime/mod.rs
// ============================================================================
// Module: Interception Runtime
// Description: Chain resolution, proceed engine, proxies, and auto-proxying.
// Purpose: Execute advice around target calls on shared proxies.
// Dependencies: crate::{core, interfaces, pointcut}, crosscut-meta, dashmap, parking_lot
// ============================================================================

//! ## Overview
//! Runtime modules turn an [`AdvisedConfig`] into behavior: the chain
//! factory decides which interceptors apply to a method, the invocation
//! walks them around exactly one target call, and the proxy and auto-proxy
//! layers decide when that machinery is placed in front of an object.
//! Per-call state stays on the calling thread; caches are shared.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod advised;
pub mod autoproxy;
pub mod chain;
pub mod creation;
pub mod invocation;
pub mod proxy;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use advised::AdvisedConfig;
pub use autoproxy::AutoProxyEngine;
pub use chain::AdvisorChainFactory;
pub use chain::ChainElement;
pub use chain::DefaultChainFactory;
pub use chain::can_apply;
pub use chain::can_apply_pointcut;
pub use chain::find_applicable_advisors;
pub use chain::has_matching_introduction;
pub use creation::ProxyCreationContext;
pub use invocation::JoinPoint;
pub use invocation::MethodInvocation;
pub use invocation::current_joinpoint;
pub use invocation::enclosing_joinpoints;
pub use proxy::DefaultProxyConstructor;
pub use proxy::DispatchProxy;
pub use proxy::ProxyKind;
pub use proxy::current_proxy;
