// crates/crosscut-meta/src/lib.rs
// ============================================================================
// Module: Crosscut Meta Root
// Description: Public API surface for the runtime type model.
// Purpose: Wire together classes, methods, loaders, values, and managed objects.
// Dependencies: crate::{class, error, loader, method, object, value}
// ============================================================================

//! ## Overview
//! Crosscut intercepts calls on objects whose shape is described at runtime:
//! classes with a superclass chain and interface closure, methods with
//! signatures and annotations, and type loaders that decide which classes are
//! visible to whom. This crate is that model plus the reflective call path
//! (`Managed::dispatch`) the interception engine ends every chain with.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod class;
pub mod error;
pub mod loader;
pub mod method;
pub mod object;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use class::ClassBuilder;
pub use class::ClassInfo;
pub use class::ClassKind;
pub use class::ClassRef;
pub use class::Modifiers;
pub use error::MetaError;
pub use loader::BOOL_TYPE;
pub use loader::FLOAT_TYPE;
pub use loader::INT_TYPE;
pub use loader::OBJECT_TYPE;
pub use loader::STRING_TYPE;
pub use loader::TypeLoader;
pub use loader::VOID_TYPE;
pub use method::MethodInfo;
pub use method::MethodKey;
pub use method::MethodRef;
pub use method::MethodSpec;
pub use method::bridged_method;
pub use method::most_specific_method;
pub use object::DispatchError;
pub use object::Handler;
pub use object::Managed;
pub use object::ObjectRef;
pub use object::ReflectiveObject;
pub use object::ReflectiveObjectBuilder;
pub use object::invoke_reflectively;
pub use value::Raised;
pub use value::Value;
