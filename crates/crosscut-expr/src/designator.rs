// crates/crosscut-expr/src/designator.rs
// ============================================================================
// Module: Custom Designators
// Description: Extension point for designators resolved against ambient context.
// Purpose: Let the engine plug in predicates such as `bean(name)`.
// Dependencies: crate::tristate
// ============================================================================

//! ## Overview
//! A custom designator does not look at the method being matched. It looks
//! at the [`MatchContext`]: who is asking, on behalf of which component.
//! When the context lacks what the matcher needs it must answer
//! [`TriState::Unknown`] rather than `False`, so that `!bean(x)` does not
//! turn a missing context into a match.

use std::fmt;
use std::sync::Arc;

use crate::tristate::TriState;

/// Ambient facts available to custom designators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchContext<'a> {
    /// Name of the component whose proxy is being created or invoked.
    pub bean_name: Option<&'a str>,
}

impl<'a> MatchContext<'a> {
    /// Context with a known component name.
    #[must_use]
    pub const fn for_bean(bean_name: &'a str) -> Self {
        Self {
            bean_name: Some(bean_name),
        }
    }
}

/// Compiled predicate produced by a [`DesignatorHandler`].
pub trait ContextMatcher: Send + Sync + fmt::Debug {
    /// Evaluates the predicate; `Unknown` abstains.
    fn matches(&self, context: &MatchContext<'_>) -> TriState;
}

/// Factory for a named custom designator.
pub trait DesignatorHandler: Send + Sync {
    /// Designator keyword, for example `bean`.
    fn name(&self) -> &str;

    /// Compiles a designator body.
    ///
    /// # Errors
    ///
    /// Returns a message when the body is not acceptable.
    fn compile(&self, body: &str) -> Result<Arc<dyn ContextMatcher>, String>;
}
