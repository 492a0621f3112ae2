// crates/crosscut-meta/src/loader.rs
// ============================================================================
// Module: Type Loaders
// Description: Named, parent-first registries of class descriptors.
// Purpose: Decide which types are visible to which evaluation scope.
// Dependencies: crate::{class, error}, parking_lot
// ============================================================================

//! ## Overview
//! Loaders form a tree. Lookups delegate to the parent first, so a child can
//! see everything its ancestors define but not its siblings. Visibility is
//! identity-based: a loader can "see" a class only if a lookup by name
//! returns that exact descriptor. Expression compilation uses this to detect
//! the case where a method's declaring type lives in a loader the
//! expression's scope cannot reach.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::class::ClassBuilder;
use crate::class::ClassRef;
use crate::error::MetaError;

/// Name of the root class type.
pub const OBJECT_TYPE: &str = "Object";
/// Name of the builtin string type.
pub const STRING_TYPE: &str = "String";
/// Name of the builtin boolean type.
pub const BOOL_TYPE: &str = "bool";
/// Name of the builtin integer type.
pub const INT_TYPE: &str = "i64";
/// Name of the builtin float type.
pub const FLOAT_TYPE: &str = "f64";
/// Name of the no-value return type.
pub const VOID_TYPE: &str = "void";

/// Named, parent-first type registry.
#[derive(Debug)]
pub struct TypeLoader {
    /// Loader name used in diagnostics.
    name: String,
    /// Parent loader consulted first.
    parent: Option<Arc<TypeLoader>>,
    /// Types defined directly by this loader.
    types: RwLock<HashMap<String, ClassRef>>,
}

impl TypeLoader {
    /// Returns the process-wide loader that defines the builtin types.
    #[must_use]
    pub fn system() -> Arc<Self> {
        static SYSTEM: OnceLock<Arc<TypeLoader>> = OnceLock::new();
        Arc::clone(SYSTEM.get_or_init(|| {
            let loader = Arc::new(Self {
                name: "system".to_string(),
                parent: None,
                types: RwLock::new(HashMap::new()),
            });
            define_builtins(&loader);
            loader
        }))
    }

    /// Creates a loader that delegates to `parent`.
    #[must_use]
    pub fn child(name: impl Into<String>, parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
            types: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a child of the system loader.
    #[must_use]
    pub fn isolated(name: impl Into<String>) -> Arc<Self> {
        Self::child(name, &Self::system())
    }

    /// Returns the loader name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent loader.
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Looks a type up, parent first.
    #[must_use]
    pub fn load(&self, name: &str) -> Option<ClassRef> {
        if let Some(found) = self.parent.as_ref().and_then(|parent| parent.load(name)) {
            return Some(found);
        }
        self.types.read().get(name).cloned()
    }

    /// Returns true when a lookup by name yields this exact descriptor.
    #[must_use]
    pub fn is_visible(&self, class: &ClassRef) -> bool {
        self.load(class.name()).is_some_and(|found| Arc::ptr_eq(&found, class))
    }

    /// Registers a freshly defined type.
    pub(crate) fn register(&self, class: ClassRef) -> Result<(), MetaError> {
        let mut types = self.types.write();
        if types.contains_key(class.name()) {
            return Err(MetaError::DuplicateType {
                name: class.name().to_string(),
                loader: self.name.clone(),
            });
        }
        types.insert(class.name().to_string(), class);
        Ok(())
    }
}

/// Defines the builtin types on the system loader.
fn define_builtins(loader: &Arc<TypeLoader>) {
    let builtins = [
        ClassBuilder::class(OBJECT_TYPE),
        ClassBuilder::class(STRING_TYPE).final_class(),
        ClassBuilder::primitive(BOOL_TYPE),
        ClassBuilder::primitive(INT_TYPE),
        ClassBuilder::primitive(FLOAT_TYPE),
        ClassBuilder::primitive(VOID_TYPE),
    ];
    for builder in builtins {
        // Builtin names are distinct and well formed; a failure here is unreachable.
        let _ = builder.define(loader);
    }
}
