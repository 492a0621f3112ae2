// crates/crosscut-expr/src/expr.rs
// ============================================================================
// Module: Expression Tree
// Description: Boolean algebra over typed primitives.
// Purpose: Share one tree shape between parsed, compiled, and residual forms.
// Dependencies: serde::{Deserialize, Serialize}, smallvec::SmallVec
// ============================================================================

//! ## Overview
//! [`Expr`] is the boolean skeleton of every pointcut expression. The leaves
//! change as an expression moves through the pipeline: parsed designators,
//! then compiled primitives, then the runtime tests left over after static
//! matching. Partial evaluation ([`Expr::partially_evaluate`]) folds the
//! leaves that can be decided now and keeps the rest as a smaller tree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::tristate::TriLogic;
use crate::tristate::TriState;

// ============================================================================
// SECTION: Expression Definition
// ============================================================================

/// Boolean expression tree with domain-specific leaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr<P> {
    /// Logical AND. Empty AND is true.
    And(SmallVec<[Box<Self>; 4]>),
    /// Logical OR. Empty OR is false.
    Or(SmallVec<[Box<Self>; 4]>),
    /// Logical NOT.
    Not(Box<Self>),
    /// Domain leaf.
    Primitive(P),
}

/// Result of folding the decidable part of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partial<Q> {
    /// Every leaf that mattered was decided.
    Known(bool),
    /// Undecided leaves remain.
    Residual(Expr<Q>),
}

impl<Q> Partial<Q> {
    /// Maps the partial result to a tri-state verdict.
    #[must_use]
    pub const fn verdict(&self) -> TriState {
        match self {
            Self::Known(true) => TriState::True,
            Self::Known(false) => TriState::False,
            Self::Residual(_) => TriState::Unknown,
        }
    }
}

impl<P> Expr<P> {
    /// Creates an AND over the given expressions.
    #[must_use]
    pub fn and(parts: Vec<Self>) -> Self {
        Self::And(parts.into_iter().map(Box::new).collect())
    }

    /// Creates an OR over the given expressions.
    #[must_use]
    pub fn or(parts: Vec<Self>) -> Self {
        Self::Or(parts.into_iter().map(Box::new).collect())
    }

    /// Negates an expression.
    #[must_use]
    pub fn negate(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Wraps a leaf.
    #[must_use]
    pub const fn primitive(primitive: P) -> Self {
        Self::Primitive(primitive)
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::And(parts) | Self::Or(parts) => {
                1 + parts.iter().map(|part| part.node_count()).sum::<usize>()
            }
            Self::Not(inner) => 1 + inner.node_count(),
            Self::Primitive(_) => 1,
        }
    }

    /// Returns the depth of the tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::And(parts) | Self::Or(parts) => {
                1 + parts.iter().map(|part| part.depth()).max().unwrap_or(0)
            }
            Self::Not(inner) => 1 + inner.depth(),
            Self::Primitive(_) => 1,
        }
    }

    /// Visits every leaf in order.
    pub fn for_each_primitive<'a>(&'a self, visit: &mut impl FnMut(&'a P)) {
        match self {
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.for_each_primitive(visit);
                }
            }
            Self::Not(inner) => inner.for_each_primitive(visit),
            Self::Primitive(primitive) => visit(primitive),
        }
    }

    /// Returns true when any leaf satisfies the predicate.
    pub fn any_primitive(&self, predicate: &impl Fn(&P) -> bool) -> bool {
        match self {
            Self::And(parts) | Self::Or(parts) => {
                parts.iter().any(|part| part.any_primitive(predicate))
            }
            Self::Not(inner) => inner.any_primitive(predicate),
            Self::Primitive(primitive) => predicate(primitive),
        }
    }

    /// Maps every leaf, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `map`.
    pub fn try_map<Q, E>(&self, map: &mut impl FnMut(&P) -> Result<Q, E>) -> Result<Expr<Q>, E> {
        Ok(match self {
            Self::And(parts) => Expr::And(
                parts.iter().map(|part| part.try_map(map).map(Box::new)).collect::<Result<_, _>>()?,
            ),
            Self::Or(parts) => Expr::Or(
                parts.iter().map(|part| part.try_map(map).map(Box::new)).collect::<Result<_, _>>()?,
            ),
            Self::Not(inner) => Expr::negate(inner.try_map(map)?),
            Self::Primitive(primitive) => Expr::Primitive(map(primitive)?),
        })
    }

    /// Evaluates the tree with a tri-state leaf evaluator.
    ///
    /// AND stops at the first `False`; OR stops at the first `True`.
    pub fn eval_tristate<L: TriLogic>(&self, logic: &L, leaf: &mut impl FnMut(&P) -> TriState) -> TriState {
        match self {
            Self::Primitive(primitive) => leaf(primitive),
            Self::Not(inner) => logic.not(inner.eval_tristate(logic, leaf)),
            Self::And(parts) => {
                let mut result = TriState::True;
                for part in parts {
                    result = logic.and(result, part.eval_tristate(logic, leaf));
                    if result.is_false() {
                        break;
                    }
                }
                result
            }
            Self::Or(parts) => {
                let mut result = TriState::False;
                for part in parts {
                    result = logic.or(result, part.eval_tristate(logic, leaf));
                    if result.is_true() {
                        break;
                    }
                }
                result
            }
        }
    }

    /// Folds decidable leaves and returns what remains.
    ///
    /// Leaves that `decide` cannot settle become leaves of the residual tree.
    /// Absorbing values short-circuit: a known `false` under AND discards the
    /// other branches, a known `true` under OR likewise.
    pub fn partially_evaluate<Q>(&self, decide: &mut impl FnMut(&P) -> Partial<Q>) -> Partial<Q> {
        match self {
            Self::Primitive(primitive) => decide(primitive),
            Self::Not(inner) => match inner.partially_evaluate(decide) {
                Partial::Known(value) => Partial::Known(!value),
                Partial::Residual(residue) => Partial::Residual(Expr::negate(residue)),
            },
            Self::And(parts) => fold_parts(parts, decide, false),
            Self::Or(parts) => fold_parts(parts, decide, true),
        }
    }
}

/// Folds the children of an AND (`absorbing = false`) or OR (`absorbing = true`).
fn fold_parts<P, Q>(
    parts: &[Box<Expr<P>>],
    decide: &mut impl FnMut(&P) -> Partial<Q>,
    absorbing: bool,
) -> Partial<Q> {
    let mut remaining: Vec<Expr<Q>> = Vec::new();
    for part in parts {
        match part.partially_evaluate(decide) {
            Partial::Known(value) if value == absorbing => return Partial::Known(absorbing),
            Partial::Known(_) => {}
            Partial::Residual(residue) => remaining.push(residue),
        }
    }
    match remaining.len() {
        0 => Partial::Known(!absorbing),
        1 => remaining.pop().map_or(Partial::Known(!absorbing), Partial::Residual),
        _ if absorbing => Partial::Residual(Expr::or(remaining)),
        _ => Partial::Residual(Expr::and(remaining)),
    }
}
