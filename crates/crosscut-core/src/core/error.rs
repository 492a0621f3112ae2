// crates/crosscut-core/src/core/error.rs
// ============================================================================
// Module: Interception Errors
// Description: Configuration-time and call-time error taxonomy.
// Purpose: Keep "the proxy setup is broken" apart from "the method failed".
// Dependencies: crosscut_expr, crosscut_meta, thiserror
// ============================================================================

//! ## Overview
//! [`ConfigError`] is raised while assembling advisors and proxies and never
//! at call time. [`InvocationError`] is what a proxied call returns; its
//! [`InvocationError::Raised`] variant carries the target's own error
//! unchanged, every other variant is an infrastructure failure.

use std::error::Error as StdError;
use std::sync::Arc;

use crosscut_expr::CompileError;
use crosscut_meta::DispatchError;
use crosscut_meta::MetaError;
use crosscut_meta::Raised;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Errors raised while configuring advisors, proxies, or auto-proxying.
///
/// # Invariants
/// - Raised synchronously by configuration calls, never by a proxied call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A pointcut expression failed to compile.
    #[error("invalid pointcut expression: {0}")]
    Expression(#[from] CompileError),
    /// The advisor list was modified after the configuration was frozen.
    #[error("configuration is frozen")]
    Frozen,
    /// No registered adapter understands the advice kind.
    #[error("no adapter registered for advice kind `{0}`")]
    UnknownAdviceKind(String),
    /// An introduction or proxied type named a class instead of an interface.
    #[error("`{0}` is not an interface")]
    NotAnInterface(String),
    /// A class-based proxy was requested for a final class.
    #[error("cannot create a class-based proxy for final class `{0}`")]
    FinalClass(String),
    /// Neither interfaces nor a target class were available.
    #[error("proxy requires a target class or at least one interface")]
    MissingTarget,
    /// An advisor position was outside the advisor list.
    #[error("advisor index {index} out of range for {len} advisors")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Current list length.
        len: usize,
    },
    /// A pattern outside the expression language was malformed.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        reason: String,
    },
    /// The runtime type model rejected a synthesized proxy class.
    #[error(transparent)]
    TypeModel(#[from] MetaError),
}

// ============================================================================
// SECTION: Target Source Errors
// ============================================================================

/// Errors raised while obtaining or releasing a target object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetSourceError {
    /// The source could not produce a target.
    #[error("target unavailable: {0}")]
    Unavailable(String),
    /// The source failed to release a target.
    #[error("target release failed: {0}")]
    Release(String),
}

// ============================================================================
// SECTION: Invocation Errors
// ============================================================================

/// Errors returned by a proxied call.
///
/// # Invariants
/// - [`InvocationError::Raised`] is the target's or an advice's own error and
///   displays exactly as raised.
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    /// Error raised by the target method or an advice body.
    #[error(transparent)]
    Raised(#[from] Raised),
    /// The reflective call itself failed (no such method, argument mismatch, access).
    #[error("reflective invocation failed: {0}")]
    Reflection(DispatchError),
    /// An interceptor violated the proceed contract.
    #[error("interceptor chain misuse: {0}")]
    Chain(String),
    /// The target source failed.
    #[error(transparent)]
    TargetSource(#[from] TargetSourceError),
    /// The proxy configuration could not serve the call.
    #[error("proxy configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// A nested proxy failed for infrastructure reasons.
    #[error("nested proxy failure: {0}")]
    Nested(Arc<dyn StdError + Send + Sync>),
}

impl InvocationError {
    /// Returns the raised error when this is a target or advice failure.
    #[must_use]
    pub const fn as_raised(&self) -> Option<&Raised> {
        match self {
            Self::Raised(raised) => Some(raised),
            _ => None,
        }
    }

    /// Returns true for every failure that is not the target's own error.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::Raised(_))
    }
}

impl From<DispatchError> for InvocationError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Raised(raised) => Self::Raised(raised),
            DispatchError::Infrastructure(inner) => Self::Nested(inner),
            other => Self::Reflection(other),
        }
    }
}

impl From<InvocationError> for DispatchError {
    fn from(error: InvocationError) -> Self {
        match error {
            InvocationError::Raised(raised) => Self::Raised(raised),
            InvocationError::Reflection(inner) => inner,
            InvocationError::Nested(inner) => Self::Infrastructure(inner),
            other => Self::Infrastructure(Arc::new(other)),
        }
    }
}
