// crates/crosscut-meta/src/class.rs
// ============================================================================
// Module: Class Metadata
// Description: Runtime class descriptors and their builder.
// Purpose: Describe types, hierarchies, and declared methods for matching.
// Dependencies: crate::{error, loader, method}, serde
// ============================================================================

//! ## Overview
//! A [`ClassInfo`] is immutable once defined. Hierarchy questions (is this a
//! subtype of that, which interfaces does it implement transitively, which
//! methods can be called on it) are answered by walking the superclass chain
//! and the interface closure. Classes remember the loader that defined them
//! so matching can fall back to it when another loader cannot see them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use serde::Deserialize;
use serde::Serialize;

use crate::error::MetaError;
use crate::loader::OBJECT_TYPE;
use crate::loader::TypeLoader;
use crate::method::MethodInfo;
use crate::method::MethodRef;
use crate::method::MethodSpec;

/// Shared handle to a class descriptor.
pub type ClassRef = Arc<ClassInfo>;

// ============================================================================
// SECTION: Kind + Modifiers
// ============================================================================

/// Kind of a runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Concrete or abstract class with an optional superclass.
    Class,
    /// Interface; only ever implemented, never extended by a class.
    Interface,
    /// Builtin value type (`bool`, `i64`, `f64`, `void`).
    Primitive,
}

/// Access and inheritance modifiers shared by classes and methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Publicly accessible.
    pub const PUBLIC: Self = Self(1);
    /// Only accessible from the declaring type.
    pub const PRIVATE: Self = Self(1 << 1);
    /// Not bound to an instance.
    pub const STATIC: Self = Self(1 << 2);
    /// Cannot be overridden (methods) or extended (classes).
    pub const FINAL: Self = Self(1 << 3);
    /// Declared without a body.
    pub const ABSTRACT: Self = Self(1 << 4);

    /// Returns the union of two modifier sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true when every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true for public members.
    #[must_use]
    pub const fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// Returns true for private members.
    #[must_use]
    pub const fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// Returns true for static members.
    #[must_use]
    pub const fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    /// Returns true for final members.
    #[must_use]
    pub const fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Returns true for abstract members.
    #[must_use]
    pub const fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    /// Parses a modifier keyword (`public`, `private`, `static`, `final`, `abstract`).
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" => Some(Self::PUBLIC),
            "private" => Some(Self::PRIVATE),
            "static" => Some(Self::STATIC),
            "final" => Some(Self::FINAL),
            "abstract" => Some(Self::ABSTRACT),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Class Descriptor
// ============================================================================

/// Immutable runtime descriptor of a type.
///
/// # Invariants
/// - `superclass` is `None` for interfaces, primitives, and the root `Object`.
/// - `interfaces` only contains [`ClassKind::Interface`] types.
/// - Declared methods have unique signatures and name this class as declaring type.
pub struct ClassInfo {
    /// Fully qualified type name.
    name: String,
    /// Type kind.
    kind: ClassKind,
    /// Class-level modifiers.
    modifiers: Modifiers,
    /// Direct superclass, if any.
    superclass: Option<ClassRef>,
    /// Directly implemented (or extended, for interfaces) interfaces.
    interfaces: Vec<ClassRef>,
    /// Methods declared directly on this type.
    methods: Vec<MethodRef>,
    /// Annotation type names present on this type.
    annotations: BTreeSet<String>,
    /// Defining loader.
    loader: Weak<TypeLoader>,
    /// Defining loader name (kept for diagnostics after the loader is gone).
    loader_name: String,
}

impl ClassInfo {
    /// Returns the fully qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name without its package prefix.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Returns the type kind.
    #[must_use]
    pub const fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Returns true for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Returns true for primitive value types.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.kind == ClassKind::Primitive
    }

    /// Returns true when the class cannot be extended.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    /// Returns the class-level modifiers.
    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns the direct superclass.
    #[must_use]
    pub const fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    /// Returns the directly implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    /// Returns the methods declared directly on this type.
    #[must_use]
    pub fn declared_methods(&self) -> &[MethodRef] {
        &self.methods
    }

    /// Returns the annotations present on this type.
    #[must_use]
    pub const fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    /// Returns true when the annotation is present on this type.
    #[must_use]
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// Returns the defining loader while it is alive.
    #[must_use]
    pub fn loader(&self) -> Option<Arc<TypeLoader>> {
        self.loader.upgrade()
    }

    /// Returns the defining loader name.
    #[must_use]
    pub fn loader_name(&self) -> &str {
        &self.loader_name
    }

    /// Iterates the superclass chain, nearest first, excluding `self`.
    pub fn superclasses(&self) -> impl Iterator<Item = &ClassRef> {
        std::iter::successors(self.superclass.as_ref(), |class| class.superclass.as_ref())
    }

    /// Returns every interface reachable from this type, nearest first.
    ///
    /// Includes interfaces of superclasses and super-interfaces; never includes `self`.
    #[must_use]
    pub fn all_interfaces(&self) -> Vec<ClassRef> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut pending: Vec<ClassRef> = self.interfaces.clone();
        for class in self.superclasses() {
            pending.extend(class.interfaces.iter().cloned());
        }
        let mut index = 0;
        while index < pending.len() {
            let candidate = Arc::clone(&pending[index]);
            index += 1;
            if seen.insert(candidate.name.clone()) {
                pending.extend(candidate.interfaces.iter().cloned());
                ordered.push(candidate);
            }
        }
        ordered
    }

    /// Returns true when a value of this type can be used where `name` is expected.
    #[must_use]
    pub fn is_subtype_of_name(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        if self.kind == ClassKind::Primitive {
            return false;
        }
        if name == OBJECT_TYPE {
            return true;
        }
        self.superclasses().any(|class| class.name == name)
            || self.all_interfaces().iter().any(|iface| iface.name == name)
    }

    /// Returns true when a value of this type can be used where `other` is expected.
    #[must_use]
    pub fn is_assignable_to(&self, other: &Self) -> bool {
        self.is_subtype_of_name(&other.name)
    }

    /// Returns every callable method: declared, inherited, then interface methods.
    ///
    /// Signatures are de-duplicated; the most specific declaration wins.
    #[must_use]
    pub fn all_methods(&self) -> Vec<MethodRef> {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        let chain = std::iter::once(self).chain(self.superclasses().map(AsRef::as_ref));
        let interfaces = self.all_interfaces();
        let declaring = chain.chain(interfaces.iter().map(AsRef::as_ref));
        for class in declaring {
            for method in &class.methods {
                if seen.insert((method.name().to_string(), method.params().to_vec())) {
                    methods.push(Arc::clone(method));
                }
            }
        }
        methods
    }

    /// Finds the most specific declaration of a signature visible on this type.
    #[must_use]
    pub fn find_method(&self, name: &str, params: &[String]) -> Option<MethodRef> {
        let chain = std::iter::once(self).chain(self.superclasses().map(AsRef::as_ref));
        for class in chain {
            if let Some(found) = class.declared_method(name, params) {
                return Some(found);
            }
        }
        self.all_interfaces().iter().find_map(|iface| iface.declared_method(name, params))
    }

    /// Finds a method declared directly on this type.
    #[must_use]
    pub fn declared_method(&self, name: &str, params: &[String]) -> Option<MethodRef> {
        self.methods
            .iter()
            .find(|method| method.name() == name && method.params() == params)
            .cloned()
    }

    /// Returns true when a method with this signature is declared by this type.
    #[must_use]
    pub fn declares(&self, method: &MethodInfo) -> bool {
        self.declared_method(method.name(), method.params()).is_some()
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("loader", &self.loader_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// SECTION: Class Builder
// ============================================================================

/// Builder for [`ClassInfo`] descriptors.
#[derive(Debug)]
pub struct ClassBuilder {
    /// Fully qualified type name.
    name: String,
    /// Type kind.
    kind: ClassKind,
    /// Class-level modifiers.
    modifiers: Modifiers,
    /// Explicit superclass.
    superclass: Option<ClassRef>,
    /// Implemented interfaces.
    interfaces: Vec<ClassRef>,
    /// Declared methods.
    methods: Vec<MethodSpec>,
    /// Type annotations.
    annotations: BTreeSet<String>,
}

impl ClassBuilder {
    /// Starts a public class definition.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::Class)
    }

    /// Starts a public interface definition.
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::Interface)
    }

    /// Starts a primitive type definition.
    #[must_use]
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::Primitive).modifiers(Modifiers::PUBLIC.with(Modifiers::FINAL))
    }

    /// Shared constructor.
    fn with_kind(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Modifiers::PUBLIC,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            annotations: BTreeSet::new(),
        }
    }

    /// Sets the superclass.
    #[must_use]
    pub fn extends(mut self, superclass: &ClassRef) -> Self {
        self.superclass = Some(Arc::clone(superclass));
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: &ClassRef) -> Self {
        self.interfaces.push(Arc::clone(interface));
        self
    }

    /// Replaces the class-level modifiers.
    #[must_use]
    pub const fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Marks the class final.
    #[must_use]
    pub const fn final_class(mut self) -> Self {
        self.modifiers = self.modifiers.with(Modifiers::FINAL);
        self
    }

    /// Adds a type annotation.
    #[must_use]
    pub fn annotate(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// Declares a method.
    #[must_use]
    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    /// Validates the definition and registers it with the loader.
    ///
    /// Classes without an explicit superclass extend the root `Object` type
    /// when the loader can see it.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError`] for illegal names, hierarchies, duplicate
    /// method signatures, or a name already defined by the loader.
    pub fn define(self, loader: &Arc<TypeLoader>) -> Result<ClassRef, MetaError> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(MetaError::InvalidName(self.name));
        }
        self.validate_hierarchy()?;

        let superclass = match (&self.superclass, self.kind) {
            (Some(superclass), _) => Some(Arc::clone(superclass)),
            (None, ClassKind::Class) if self.name != OBJECT_TYPE => loader.load(OBJECT_TYPE),
            _ => None,
        };

        let mut methods: Vec<MethodRef> = Vec::with_capacity(self.methods.len());
        for spec in self.methods {
            let method = spec.into_method(&self.name);
            if methods.iter().any(|existing| existing.same_signature(&method)) {
                return Err(MetaError::DuplicateMethod {
                    name: self.name,
                    signature: method.signature(),
                });
            }
            methods.push(Arc::new(method));
        }

        let class = Arc::new(ClassInfo {
            name: self.name,
            kind: self.kind,
            modifiers: self.modifiers,
            superclass,
            interfaces: self.interfaces,
            methods,
            annotations: self.annotations,
            loader: Arc::downgrade(loader),
            loader_name: loader.name().to_string(),
        });
        loader.register(Arc::clone(&class))?;
        Ok(class)
    }

    /// Rejects hierarchies the model cannot represent.
    fn validate_hierarchy(&self) -> Result<(), MetaError> {
        let invalid = |reason: String| MetaError::InvalidHierarchy {
            name: self.name.clone(),
            reason,
        };
        if let Some(superclass) = &self.superclass {
            if self.kind != ClassKind::Class {
                return Err(invalid("only classes may declare a superclass".to_string()));
            }
            if superclass.kind != ClassKind::Class {
                return Err(invalid(format!("`{}` is not a class", superclass.name)));
            }
            if superclass.is_final() {
                return Err(invalid(format!("`{}` is final", superclass.name)));
            }
        }
        if let Some(iface) = self.interfaces.iter().find(|iface| !iface.is_interface()) {
            return Err(invalid(format!("`{}` is not an interface", iface.name)));
        }
        if self.kind == ClassKind::Primitive && !self.interfaces.is_empty() {
            return Err(invalid("primitives cannot implement interfaces".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn interface_closure_includes_superclass_interfaces() {
        let loader = TypeLoader::isolated("test");
        let base_iface = ClassBuilder::interface("a.Base").define(&loader).unwrap();
        let iface = ClassBuilder::interface("a.Service").implements(&base_iface).define(&loader).unwrap();
        let parent = ClassBuilder::class("a.Parent").implements(&iface).define(&loader).unwrap();
        let child = ClassBuilder::class("a.Child").extends(&parent).define(&loader).unwrap();

        let names: Vec<String> =
            child.all_interfaces().iter().map(|class| class.name().to_string()).collect();
        assert_eq!(names, vec!["a.Service".to_string(), "a.Base".to_string()]);
        assert!(child.is_subtype_of_name("a.Base"));
        assert!(!parent.is_subtype_of_name("a.Child"));
    }

    #[test]
    fn final_superclass_is_rejected() {
        let loader = TypeLoader::isolated("test");
        let sealed = ClassBuilder::class("a.Sealed").final_class().define(&loader).unwrap();
        let err = ClassBuilder::class("a.Sub").extends(&sealed).define(&loader).unwrap_err();
        assert!(matches!(err, MetaError::InvalidHierarchy { .. }));
    }
}
