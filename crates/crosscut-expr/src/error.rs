// crates/crosscut-expr/src/error.rs
// ============================================================================
// Module: Expression Errors
// Description: Parse, compile, and evaluation failures for pointcut expressions.
// Purpose: Separate configuration-time failures from matching-time failures.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ParseError`] and [`CompileError`] are configuration errors: they surface
//! when an expression is first built and never at call time.
//! [`EvaluatorError`] is raised while computing a shadow match; callers are
//! expected to retry or degrade to a non-match rather than fail a call.

use thiserror::Error;

// ============================================================================
// SECTION: Parse Errors
// ============================================================================

/// Errors that can occur while parsing an expression.
///
/// # Invariants
/// - Positions are byte offsets into the original input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input was empty or contained only whitespace.
    #[error("input is empty")]
    EmptyInput,
    /// Input exceeded the configured size limit.
    #[error("input exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Input exceeded the configured nesting depth.
    #[error("input nesting exceeds limit: depth {actual_depth} (max {max_depth}) at {position}")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Actual nesting depth when the error occurred.
        actual_depth: usize,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Unexpected token encountered during parsing.
    #[error("unexpected token `{found}` at {position}, expected {expected}")]
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// A designator body never closed its parenthesis.
    #[error("unbalanced parentheses in designator starting at {position}")]
    Unbalanced {
        /// Byte offset of the designator name.
        position: usize,
    },
    /// A designator body did not parse as the pattern it requires.
    #[error("invalid `{designator}` pattern at {position}: {reason}")]
    InvalidPattern {
        /// Designator name.
        designator: String,
        /// Failure detail.
        reason: String,
        /// Byte offset of the designator name.
        position: usize,
    },
    /// Unexpected trailing input after a complete expression.
    #[error("unexpected trailing input at {position}")]
    TrailingInput {
        /// Byte offset where unexpected input begins.
        position: usize,
    },
}

// ============================================================================
// SECTION: Compile Errors
// ============================================================================

/// Errors raised while compiling a parsed expression against a scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The expression failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Parameter names and parameter types differ in length.
    #[error("{names} parameter names but {types} parameter types")]
    ParameterCountMismatch {
        /// Number of names.
        names: usize,
        /// Number of types.
        types: usize,
    },
    /// A type named in the expression is not visible to the scope's loader.
    #[error("type `{name}` is not visible to loader `{loader}`")]
    UnknownType {
        /// Referenced type name.
        name: String,
        /// Loader consulted.
        loader: String,
    },
    /// A declared parameter is never bound by the expression.
    #[error("parameter `{0}` is not bound by the expression")]
    UnboundParameter(String),
    /// A parameter is bound more than once.
    #[error("parameter `{0}` is bound more than once")]
    AmbiguousBinding(String),
    /// A parameter is bound under `||` or `!`.
    #[error("parameter `{0}` cannot be bound under `||` or `!`")]
    BindingUnderDisjunction(String),
    /// A designator name is not built in and no handler is registered for it.
    #[error("unknown designator `{0}`")]
    UnknownDesignator(String),
    /// A custom designator rejected its body.
    #[error("designator `{name}` rejected `{body}`: {reason}")]
    DesignatorBody {
        /// Designator name.
        name: String,
        /// Raw body.
        body: String,
        /// Handler message.
        reason: String,
    },
}

// ============================================================================
// SECTION: Evaluation Errors
// ============================================================================

/// Errors raised while computing a shadow match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    /// A type needed for matching is not visible to the expression's loader.
    #[error("type `{name}` is not visible to loader `{loader}`")]
    TypeNotVisible {
        /// Type name.
        name: String,
        /// Loader consulted.
        loader: String,
    },
    /// The method's declaring type is not part of the target hierarchy.
    #[error("method `{method}` is not declared in the hierarchy of `{class}`")]
    ForeignMethod {
        /// Method signature.
        method: String,
        /// Target class name.
        class: String,
    },
    /// Any other evaluator failure.
    #[error("evaluator failure: {0}")]
    Internal(String),
}
