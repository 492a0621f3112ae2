// crates/crosscut-expr/src/lib.rs
// ============================================================================
// Module: Crosscut Expression Root
// Description: Public API surface for the pointcut expression language.
// Purpose: Wire together logic, parsing, compilation, and shadow matching.
// Dependencies: crate::{compile, designator, error, evaluator, expr, parser, pattern, shadow,
//              tristate}
// ============================================================================

//! ## Overview
//! A pointcut expression such as
//! `execution(* app..*Service.*(..)) && args(id, ..)` is parsed into a
//! boolean tree of designators, compiled against a type loader and a set of
//! parameter names, and then asked, per method, for a three-valued
//! [`ShadowMatch`]. The interception engine consumes this crate only
//! through the [`Evaluator`] and [`CompiledExpression`] traits.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod compile;
pub mod designator;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod parser;
pub mod pattern;
pub mod shadow;
pub mod tristate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use compile::ExpressionScope;
pub use designator::ContextMatcher;
pub use designator::DesignatorHandler;
pub use designator::MatchContext;
pub use error::CompileError;
pub use error::EvaluatorError;
pub use error::ParseError;
pub use evaluator::CompiledExpression;
pub use evaluator::Evaluator;
pub use evaluator::PatternEvaluator;
pub use expr::Expr;
pub use expr::Partial;
pub use parser::Designator;
pub use parser::ParseLimits;
pub use parser::parse_expression;
pub use pattern::NamePattern;
pub use pattern::SignaturePattern;
pub use pattern::TypePattern;
pub use shadow::Binding;
pub use shadow::BindingSource;
pub use shadow::RuntimeContext;
pub use shadow::RuntimeTest;
pub use shadow::ShadowMatch;
pub use tristate::KleeneLogic;
pub use tristate::TriLogic;
pub use tristate::TriState;
