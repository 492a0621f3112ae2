// crates/crosscut-core/src/core/target.rs
// ============================================================================
// Module: Target Sources
// Description: Built-in target sources.
// Purpose: Supply the object a proxied call finally reaches.
// Dependencies: crate::{core, interfaces}, crosscut_meta
// ============================================================================

//! ## Overview
//! [`SingletonTargetSource`] always returns one object. [`EmptyTargetSource`]
//! has no target (every call must be served by interceptors).
//! [`PrototypeTargetSource`] builds a fresh target per call and is told when
//! the call is done with it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crosscut_meta::ClassRef;
use crosscut_meta::ObjectRef;

use crate::core::error::TargetSourceError;
use crate::interfaces::TargetSource;

// ============================================================================
// SECTION: Singleton
// ============================================================================

/// Target source returning the same object on every call.
#[derive(Clone)]
pub struct SingletonTargetSource {
    /// The target.
    target: ObjectRef,
}

impl SingletonTargetSource {
    /// Wraps `target`.
    #[must_use]
    pub fn new(target: ObjectRef) -> Self {
        Self {
            target,
        }
    }
}

impl fmt::Debug for SingletonTargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonTargetSource").field("class", &self.target.class().name()).finish()
    }
}

impl TargetSource for SingletonTargetSource {
    fn target_class(&self) -> Option<ClassRef> {
        Some(Arc::clone(self.target.class()))
    }

    fn is_static(&self) -> bool {
        true
    }

    fn target(&self) -> Result<Option<ObjectRef>, TargetSourceError> {
        Ok(Some(Arc::clone(&self.target)))
    }
}

// ============================================================================
// SECTION: Empty
// ============================================================================

/// Target source without a target.
#[derive(Debug, Clone, Default)]
pub struct EmptyTargetSource {
    /// Declared class, if any.
    class: Option<ClassRef>,
}

impl EmptyTargetSource {
    /// Empty source with no declared class.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            class: None,
        }
    }

    /// Empty source that still reports a target class for matching.
    #[must_use]
    pub fn for_class(class: &ClassRef) -> Self {
        Self {
            class: Some(Arc::clone(class)),
        }
    }
}

impl TargetSource for EmptyTargetSource {
    fn target_class(&self) -> Option<ClassRef> {
        self.class.clone()
    }

    fn is_static(&self) -> bool {
        true
    }

    fn target(&self) -> Result<Option<ObjectRef>, TargetSourceError> {
        Ok(None)
    }
}

// ============================================================================
// SECTION: Prototype
// ============================================================================

/// Factory producing one target per call.
pub type TargetFactory = Arc<dyn Fn() -> Result<ObjectRef, TargetSourceError> + Send + Sync>;

/// Target source creating a new object for every call.
pub struct PrototypeTargetSource {
    /// Class of the produced targets.
    class: ClassRef,
    /// Object factory.
    factory: TargetFactory,
    /// Targets created so far.
    created: AtomicUsize,
    /// Targets released so far.
    released: AtomicUsize,
}

impl PrototypeTargetSource {
    /// Source producing instances of `class` through `factory`.
    pub fn new<F>(class: &ClassRef, factory: F) -> Self
    where
        F: Fn() -> Result<ObjectRef, TargetSourceError> + Send + Sync + 'static,
    {
        Self {
            class: Arc::clone(class),
            factory: Arc::new(factory),
            created: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Returns how many targets were created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Returns how many targets were released.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }
}

impl fmt::Debug for PrototypeTargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrototypeTargetSource")
            .field("class", &self.class.name())
            .field("created", &self.created())
            .field("released", &self.released())
            .finish()
    }
}

impl TargetSource for PrototypeTargetSource {
    fn target_class(&self) -> Option<ClassRef> {
        Some(Arc::clone(&self.class))
    }

    fn is_static(&self) -> bool {
        false
    }

    fn target(&self) -> Result<Option<ObjectRef>, TargetSourceError> {
        let target = (self.factory)()?;
        if !target.class().is_assignable_to(&self.class) {
            return Err(TargetSourceError::Unavailable(format!(
                "factory produced `{}`, expected `{}`",
                target.class().name(),
                self.class.name()
            )));
        }
        self.created.fetch_add(1, Ordering::AcqRel);
        Ok(Some(target))
    }

    fn release_target(&self, _target: &ObjectRef) -> Result<(), TargetSourceError> {
        self.released.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
