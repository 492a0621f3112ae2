// crates/crosscut-meta/src/error.rs
// ============================================================================
// Module: Meta Errors
// Description: Errors raised while defining classes and methods.
// Purpose: Reject malformed hierarchies at definition time.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Type definition is a configuration step; every failure here is reported
//! synchronously from [`crate::ClassBuilder::define`] and never at call time.

use thiserror::Error;

/// Errors produced while defining types in a [`crate::TypeLoader`].
///
/// # Invariants
/// - None. Variants capture structured definition failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    /// A type with the same name is already defined by this loader.
    #[error("type `{name}` is already defined in loader `{loader}`")]
    DuplicateType {
        /// Duplicated type name.
        name: String,
        /// Loader that already defines it.
        loader: String,
    },
    /// The requested hierarchy is not legal (final superclass, class as interface, ...).
    #[error("invalid hierarchy for `{name}`: {reason}")]
    InvalidHierarchy {
        /// Type being defined.
        name: String,
        /// Human-readable reason.
        reason: String,
    },
    /// Two methods with the same signature were declared on one type.
    #[error("duplicate method `{signature}` on `{name}`")]
    DuplicateMethod {
        /// Type being defined.
        name: String,
        /// Duplicated signature.
        signature: String,
    },
    /// A type name was empty or contained whitespace.
    #[error("invalid type name `{0}`")]
    InvalidName(String),
}
