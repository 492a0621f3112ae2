// crates/crosscut-core/src/core/mod.rs
// ============================================================================
// Module: Interception Model
// Description: Advice, advisors, target sources, settings, and errors.
// Purpose: Provide the data model the runtime assembles proxies from.
// Dependencies: crosscut-expr, crosscut-meta, serde, thiserror
// ============================================================================

//! ## Overview
//! The model is plain data plus small adapters: what behavior to run
//! ([`Advice`]), where it applies ([`Advisor`]), what it runs against
//! ([`crate::interfaces::TargetSource`] implementations), and how failures
//! are reported ([`ConfigError`], [`InvocationError`]).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod advice;
pub mod advisor;
pub mod error;
pub mod introduction;
pub mod settings;
pub mod target;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use advice::AdapterRegistry;
pub use advice::Advice;
pub use advice::AdviceAdapter;
pub use advice::AfterReturningAdvice;
pub use advice::BeforeAdvice;
pub use advice::ThrowsAdvice;
pub use advisor::Advisor;
pub use advisor::AdvisorBinding;
pub use advisor::AdvisorRef;
pub use advisor::LOWEST_PRECEDENCE;
pub use error::ConfigError;
pub use error::InvocationError;
pub use error::TargetSourceError;
pub use introduction::DelegatingIntroduction;
pub use settings::AutoProxyOptions;
pub use settings::DEFAULT_CALLBACK_INTERFACES;
pub use settings::INFRASTRUCTURE_ANNOTATION;
pub use settings::INFRASTRUCTURE_TYPES;
pub use settings::ORIGINAL_INSTANCE_SUFFIX;
pub use settings::ProxySettings;
pub use target::EmptyTargetSource;
pub use target::PrototypeTargetSource;
pub use target::SingletonTargetSource;
pub use target::TargetFactory;
