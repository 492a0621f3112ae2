// crates/crosscut-expr/tests/tristate.rs
// ============================================================================
// Module: Tri-State Tests
// Description: Kleene logic laws and partial evaluation consistency.
// ============================================================================
//! ## Overview
//! Validates the Kleene tables and that folding an expression never changes
//! the verdict full evaluation would give.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod support;

use crosscut_expr::Expr;
use crosscut_expr::KleeneLogic;
use crosscut_expr::Partial;
use crosscut_expr::TriLogic;
use crosscut_expr::TriState;
use proptest::prelude::*;
use support::TestResult;
use support::ensure;

// ============================================================================
// SECTION: Strategies
// ============================================================================

fn tristate() -> impl Strategy<Value = TriState> {
    prop_oneof![Just(TriState::True), Just(TriState::False), Just(TriState::Unknown)]
}

fn expr_strategy() -> impl Strategy<Value = Expr<TriState>> {
    let leaf = tristate().prop_map(Expr::primitive);
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Expr::and),
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Expr::or),
            inner.prop_map(Expr::negate),
        ]
    })
}

// ============================================================================
// SECTION: Kleene Tables
// ============================================================================

#[test]
fn kleene_unknown_yields_to_absorbing_values() -> TestResult {
    let logic = KleeneLogic;
    ensure(logic.and(TriState::Unknown, TriState::False) == TriState::False, "Expected False to absorb AND")?;
    ensure(logic.or(TriState::Unknown, TriState::True) == TriState::True, "Expected True to absorb OR")?;
    ensure(logic.and(TriState::Unknown, TriState::True) == TriState::Unknown, "Expected Unknown AND True")?;
    ensure(logic.not(TriState::Unknown) == TriState::Unknown, "Expected NOT Unknown to stay Unknown")?;
    Ok(())
}

#[test]
fn empty_groups_follow_identities() -> TestResult {
    let and: Expr<TriState> = Expr::and(Vec::new());
    let or: Expr<TriState> = Expr::or(Vec::new());
    ensure(and.eval_tristate(&KleeneLogic, &mut |leaf| *leaf) == TriState::True, "Expected empty AND true")?;
    ensure(or.eval_tristate(&KleeneLogic, &mut |leaf| *leaf) == TriState::False, "Expected empty OR false")?;
    Ok(())
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn de_morgan_holds(a in tristate(), b in tristate()) {
        let logic = KleeneLogic;
        prop_assert_eq!(logic.not(logic.and(a, b)), logic.or(logic.not(a), logic.not(b)));
        prop_assert_eq!(logic.not(logic.or(a, b)), logic.and(logic.not(a), logic.not(b)));
    }

    #[test]
    fn partial_evaluation_agrees_with_full_evaluation(expr in expr_strategy()) {
        let full = expr.eval_tristate(&KleeneLogic, &mut |leaf| *leaf);
        let partial = expr.partially_evaluate(&mut |leaf: &TriState| match leaf {
            TriState::True => Partial::Known(true),
            TriState::False => Partial::Known(false),
            TriState::Unknown => Partial::Residual(Expr::primitive(())),
        });
        match partial {
            Partial::Known(value) => {
                prop_assert_eq!(full, TriState::from(value));
            }
            Partial::Residual(residue) => {
                let residual = residue.eval_tristate(&KleeneLogic, &mut |_: &()| TriState::Unknown);
                prop_assert_eq!(full, residual);
            }
        }
    }
}
