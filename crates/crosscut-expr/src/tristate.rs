// crates/crosscut-expr/src/tristate.rs
// ============================================================================
// Module: Tri-State Logic
// Description: Tri-state truth values and the Kleene logic table.
// Purpose: Express always / never / maybe verdicts for shadow matching.
// Dependencies: serde::{Deserialize, Serialize}
// ============================================================================

//! ## Overview
//! Defines tri-state truth values and the logic table used to combine them.
//! A shadow match is `True` when a method always matches, `False` when it
//! never matches, and `Unknown` when the answer depends on runtime values.
//! Strong Kleene logic keeps `Unknown` from hiding a definite answer: `False`
//! still wins an AND and `True` still wins an OR.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Tri-State Value
// ============================================================================

/// Tri-state truth value.
///
/// # Invariants
/// - Represents a closed set of truth values: true, false, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriState {
    /// Definitively true (always matches)
    True,
    /// Definitively false (never matches)
    False,
    /// Depends on values only known at call time (maybe matches)
    Unknown,
}

impl TriState {
    /// Returns true if the value is `True`
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Returns true if the value is `False`
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Returns true if the value is `Unknown`
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

// ============================================================================
// SECTION: Logic Tables
// ============================================================================

/// Tri-state logic tables for composable evaluation
pub trait TriLogic {
    /// Logical AND for tri-state values
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState;

    /// Logical OR for tri-state values
    fn or(&self, lhs: TriState, rhs: TriState) -> TriState;

    /// Logical NOT for tri-state values
    fn not(&self, value: TriState) -> TriState;
}

/// Strong Kleene logic
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct KleeneLogic;

impl TriLogic for KleeneLogic {
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState {
        match (lhs, rhs) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::True, TriState::True) => TriState::True,
            _ => TriState::Unknown,
        }
    }

    fn or(&self, lhs: TriState, rhs: TriState) -> TriState {
        match (lhs, rhs) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::False, TriState::False) => TriState::False,
            _ => TriState::Unknown,
        }
    }

    fn not(&self, value: TriState) -> TriState {
        match value {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }
}
