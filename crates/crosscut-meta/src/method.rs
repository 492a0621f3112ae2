// crates/crosscut-meta/src/method.rs
// ============================================================================
// Module: Method Metadata
// Description: Method descriptors, identity keys, and override resolution.
// Purpose: Give every cache a stable method identity and resolve overrides.
// Dependencies: crate::class, serde
// ============================================================================

//! ## Overview
//! A [`MethodInfo`] is owned by the class that declares it. Caches never key
//! on the descriptor pointer; they key on [`MethodKey`], which is the
//! declaring type plus the signature. Bridge methods carry the parameter
//! list of the method they forward to so matchers can test the bridged
//! method instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::class::ClassInfo;
use crate::class::Modifiers;

/// Shared handle to a method descriptor.
pub type MethodRef = Arc<MethodInfo>;

// ============================================================================
// SECTION: Method Identity
// ============================================================================

/// Identity of a method: declaring type plus signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey {
    /// Declaring type name.
    pub declaring: String,
    /// Method name.
    pub name: String,
    /// Parameter type names.
    pub params: Vec<String>,
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.declaring, self.name, self.params.join(","))
    }
}

// ============================================================================
// SECTION: Method Descriptor
// ============================================================================

/// Immutable method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name.
    name: String,
    /// Declaring type name.
    declaring: String,
    /// Parameter type names.
    params: Vec<String>,
    /// Return type name (`void` for no value).
    return_type: String,
    /// Method modifiers.
    modifiers: Modifiers,
    /// Annotation type names present on the method.
    annotations: BTreeSet<String>,
    /// Parameters of the bridged method when this is a bridge.
    bridge_params: Option<Vec<String>>,
}

impl MethodInfo {
    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declaring type name.
    #[must_use]
    pub fn declaring(&self) -> &str {
        &self.declaring
    }

    /// Returns the parameter type names.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Returns the return type name.
    #[must_use]
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Returns the method modifiers.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns the method annotations.
    #[must_use]
    pub const fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    /// Returns true when the annotation is present on the method.
    #[must_use]
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// Returns true for bridge methods.
    #[must_use]
    pub const fn is_bridge(&self) -> bool {
        self.bridge_params.is_some()
    }

    /// Returns the identity key.
    #[must_use]
    pub fn key(&self) -> MethodKey {
        MethodKey {
            declaring: self.declaring.clone(),
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }

    /// Returns true when both methods share name and parameter types.
    #[must_use]
    pub fn same_signature(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }

    /// Renders `name(p1,p2)`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(","))
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.return_type, self.declaring, self.signature())
    }
}

// ============================================================================
// SECTION: Method Spec
// ============================================================================

/// Builder for methods declared through [`crate::ClassBuilder::method`].
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// Method name.
    name: String,
    /// Parameter type names.
    params: Vec<String>,
    /// Return type name.
    return_type: String,
    /// Modifiers.
    modifiers: Modifiers,
    /// Annotations.
    annotations: BTreeSet<String>,
    /// Bridged parameter list.
    bridge_params: Option<Vec<String>>,
}

impl MethodSpec {
    /// Starts a public `void` method with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: "void".to_string(),
            modifiers: Modifiers::PUBLIC,
            annotations: BTreeSet::new(),
            bridge_params: None,
        }
    }

    /// Sets the parameter types.
    #[must_use]
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    /// Replaces the modifiers.
    #[must_use]
    pub const fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Adds a modifier to the current set.
    #[must_use]
    pub const fn with_modifier(mut self, modifier: Modifiers) -> Self {
        self.modifiers = self.modifiers.with(modifier);
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotate(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// Marks this method as a bridge forwarding to the method with `params`.
    #[must_use]
    pub fn bridge_to<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bridge_params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    /// Finalizes the descriptor for its declaring type.
    pub(crate) fn into_method(self, declaring: &str) -> MethodInfo {
        MethodInfo {
            name: self.name,
            declaring: declaring.to_string(),
            params: self.params,
            return_type: self.return_type,
            modifiers: self.modifiers,
            annotations: self.annotations,
            bridge_params: self.bridge_params,
        }
    }
}

// ============================================================================
// SECTION: Override Resolution
// ============================================================================

/// Resolves `method` to the most specific declaration visible on `target_class`.
///
/// Walks the target hierarchy for an override with the same signature and
/// then replaces a bridge with the method it forwards to. Returns the input
/// unchanged when no better declaration exists.
#[must_use]
pub fn most_specific_method(method: &MethodRef, target_class: &ClassInfo) -> MethodRef {
    let specific = if method.declaring() == target_class.name() {
        Arc::clone(method)
    } else {
        target_class
            .find_method(method.name(), method.params())
            .filter(|found| !found.modifiers().is_private())
            .unwrap_or_else(|| Arc::clone(method))
    };
    bridged_method(&specific, target_class)
}

/// Returns the method a bridge forwards to, or the input when it is not a bridge.
#[must_use]
pub fn bridged_method(method: &MethodRef, target_class: &ClassInfo) -> MethodRef {
    let Some(bridged) = &method.bridge_params else {
        return Arc::clone(method);
    };
    target_class
        .find_method(method.name(), bridged)
        .filter(|found| !found.is_bridge())
        .unwrap_or_else(|| Arc::clone(method))
}
