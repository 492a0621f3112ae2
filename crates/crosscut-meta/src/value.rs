// crates/crosscut-meta/src/value.rs
// ============================================================================
// Module: Dynamic Values
// Description: Argument and return values crossing the reflective boundary.
// Purpose: Carry call arguments, results, and raised errors without generics.
// Dependencies: crate::{loader, object}, thiserror
// ============================================================================

//! ## Overview
//! Intercepted calls move arguments and results as [`Value`]s. Object values
//! are shared handles compared by identity. A [`Raised`] is the error a
//! business method throws; the engine propagates it untouched.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::loader::BOOL_TYPE;
use crate::loader::FLOAT_TYPE;
use crate::loader::INT_TYPE;
use crate::loader::OBJECT_TYPE;
use crate::loader::STRING_TYPE;
use crate::loader::VOID_TYPE;
use crate::object::ObjectRef;

// ============================================================================
// SECTION: Value
// ============================================================================

/// Dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value; assignable to any reference type.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Immutable string.
    Str(Arc<str>),
    /// Managed object reference.
    Object(ObjectRef),
}

impl Value {
    /// Returns the runtime type name; `Null` reports `void`.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Null => VOID_TYPE.to_string(),
            Self::Bool(_) => BOOL_TYPE.to_string(),
            Self::Int(_) => INT_TYPE.to_string(),
            Self::Float(_) => FLOAT_TYPE.to_string(),
            Self::Str(_) => STRING_TYPE.to_string(),
            Self::Object(object) => object.class().name().to_string(),
        }
    }

    /// Returns true when the value may be passed where `type_name` is expected.
    ///
    /// `Null` is an instance of every reference type and of no primitive.
    #[must_use]
    pub fn is_instance_of_name(&self, type_name: &str) -> bool {
        match self {
            Self::Null => !matches!(type_name, BOOL_TYPE | INT_TYPE | FLOAT_TYPE | VOID_TYPE),
            Self::Bool(_) => type_name == BOOL_TYPE,
            Self::Int(_) => type_name == INT_TYPE,
            Self::Float(_) => type_name == FLOAT_TYPE,
            Self::Str(_) => type_name == STRING_TYPE || type_name == OBJECT_TYPE,
            Self::Object(object) => object.class().is_subtype_of_name(type_name),
        }
    }

    /// Returns the object reference, if any.
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Self::Str(value) => f.debug_tuple("Str").field(value).finish(),
            Self::Object(object) => write!(f, "Object({})", object.class().name()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Arc::from(value))
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

// ============================================================================
// SECTION: Raised Errors
// ============================================================================

/// Error thrown by a business method or an advice body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name}: {message}")]
pub struct Raised {
    /// Exception type name.
    pub type_name: String,
    /// Human-readable message.
    pub message: String,
}

impl Raised {
    /// Builds a raised error.
    #[must_use]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}
