// crates/crosscut-expr/src/parser.rs
// ============================================================================
// Module: Pointcut Expression Parser
// Description: Lexer and recursive-descent parser for pointcut expressions.
// Purpose: Turn expression text into an `Expr<Designator>` with limits enforced.
// Dependencies: crate::{error, expr, pattern}, serde
// ============================================================================

//! ## Overview
//!
//! Expressions combine designators with boolean operators.
//! Security posture: expression text is configuration input; size and
//! nesting limits are enforced before and during parsing.
//!
//! ### Grammar (informal)
//! - **Designators**: `execution(..)`, `within(..)`, `this(..)`,
//!   `target(..)`, `args(..)`, `@annotation(..)`, `@within(..)`,
//!   `@target(..)`, and any custom `name(..)` resolved at compile time
//! - **Boolean operators**: `a && b`, `a || b`, `!a`, and the keywords
//!   `and`, `or`, `not`
//! - **Parentheses**: `( ... )` for explicit grouping
//!
//! Designator bodies are captured as raw balanced text by the lexer and
//! handed to the pattern parsers, so `*`, `..`, `+`, and commas inside a
//! body never reach the boolean grammar.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ParseError;
use crate::expr::Expr;
use crate::pattern::ArgPattern;
use crate::pattern::SignaturePattern;
use crate::pattern::TypePattern;
use crate::pattern::is_ident_char;
use crate::pattern::parse_reference;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum expression size in bytes.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024;
/// Hard ceiling for the expression size limit.
pub const MAX_INPUT_BYTES_CEILING: usize = 1024 * 1024;
/// Default maximum nesting depth.
pub const DEFAULT_MAX_NESTING: usize = 32;
/// Hard ceiling for the nesting limit.
pub const MAX_NESTING_CEILING: usize = 64;

/// Parser limits.
///
/// # Invariants
/// - Values are bounded by [`MAX_INPUT_BYTES_CEILING`] and [`MAX_NESTING_CEILING`]
///   when produced by configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseLimits {
    /// Maximum input size in bytes.
    pub max_input_bytes: usize,
    /// Maximum nesting depth of parentheses and negations.
    pub max_nesting: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

// ============================================================================
// SECTION: Designators
// ============================================================================

/// Parsed designator with its body already split into patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Designator {
    /// `execution(<signature>)`
    Execution(SignaturePattern),
    /// `within(<type pattern>)`
    Within(TypePattern),
    /// `this(<type or parameter>)`
    This(String),
    /// `target(<type or parameter>)`
    Target(String),
    /// `args(<arg patterns>)`
    Args(Vec<ArgPattern>),
    /// `@annotation(<annotation or parameter>)`
    AtAnnotation(String),
    /// `@within(<annotation>)`
    AtWithin(String),
    /// `@target(<annotation or parameter>)`
    AtTarget(String),
    /// Designator supplied by a registered handler.
    Custom {
        /// Designator name.
        name: String,
        /// Raw body text.
        body: String,
    },
}

impl Designator {
    /// Returns the designator keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::Execution(_) => "execution",
            Self::Within(_) => "within",
            Self::This(_) => "this",
            Self::Target(_) => "target",
            Self::Args(_) => "args",
            Self::AtAnnotation(_) => "@annotation",
            Self::AtWithin(_) => "@within",
            Self::AtTarget(_) => "@target",
            Self::Custom {
                name, ..
            } => name,
        }
    }

    /// Builds a designator from its name and raw body.
    fn from_parts(name: &str, body: &str, position: usize) -> Result<Self, ParseError> {
        let invalid = |reason: String| ParseError::InvalidPattern {
            designator: name.to_string(),
            reason,
            position,
        };
        let designator = match name {
            "execution" => Self::Execution(SignaturePattern::parse(body).map_err(invalid)?),
            "within" => Self::Within(TypePattern::parse(body).map_err(invalid)?),
            "this" => Self::This(parse_reference(body).map_err(invalid)?),
            "target" => Self::Target(parse_reference(body).map_err(invalid)?),
            "args" => Self::Args(ArgPattern::parse_list(body).map_err(invalid)?),
            "@annotation" => Self::AtAnnotation(parse_reference(body).map_err(invalid)?),
            "@within" => Self::AtWithin(parse_reference(body).map_err(invalid)?),
            "@target" => Self::AtTarget(parse_reference(body).map_err(invalid)?),
            other if other.starts_with('@') => {
                return Err(invalid("unknown annotation designator".to_string()));
            }
            other => Self::Custom {
                name: other.to_string(),
                body: body.trim().to_string(),
            },
        };
        Ok(designator)
    }
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Parses an expression into a designator tree.
///
/// # Errors
/// Returns [`ParseError`] for oversized input, syntax errors, malformed
/// designator bodies, nesting beyond the limit, or trailing input.
pub fn parse_expression(input: &str, limits: &ParseLimits) -> Result<Expr<Designator>, ParseError> {
    if input.len() > limits.max_input_bytes {
        return Err(ParseError::InputTooLarge {
            max_bytes: limits.max_input_bytes,
            actual_bytes: input.len(),
        });
    }
    let mut lexer = Lexer::new(input);
    let tokens = lexer.lex()?;

    let mut parser = Parser::new(tokens, limits.max_nesting);
    let expression = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expression)
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer token produced from the expression input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Designator call with its raw body.
    Designator {
        /// Designator name, including a leading `@`.
        name: &'a str,
        /// Text between the designator's parentheses.
        body: &'a str,
    },
    /// Bare identifier (not followed by a body).
    Ident(&'a str),
    /// Logical AND operator.
    And,
    /// Logical OR operator.
    Or,
    /// Logical NOT operator.
    Not,
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// End-of-input marker.
    Eof,
}

/// Token paired with its byte offset.
#[derive(Debug, Clone, Copy)]
struct SpannedToken<'a> {
    /// Token value.
    token: Token<'a>,
    /// Byte offset into the input.
    position: usize,
}

/// Lexer for pointcut expressions.
struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens.
    fn lex(&mut self) -> Result<Vec<SpannedToken<'a>>, ParseError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let ch = bytes[self.offset];
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                }
                b'(' => {
                    tokens.push(self.simple(Token::LParen));
                    self.offset += 1;
                }
                b')' => {
                    tokens.push(self.simple(Token::RParen));
                    self.offset += 1;
                }
                b'!' => {
                    tokens.push(self.simple(Token::Not));
                    self.offset += 1;
                }
                b'&' | b'|' => {
                    if self.peek_char(bytes) == Some(ch) {
                        let token = if ch == b'&' { Token::And } else { Token::Or };
                        tokens.push(self.simple(token));
                        self.offset += 2;
                    } else {
                        return Err(ParseError::UnexpectedToken {
                            expected: if ch == b'&' { "&&" } else { "||" },
                            found: char::from(ch).to_string(),
                            position: self.offset,
                        });
                    }
                }
                b'@' | b'a' ..= b'z' | b'A' ..= b'Z' | b'_' => {
                    tokens.push(self.word(bytes)?);
                }
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "designator or operator",
                        found: char::from(ch).to_string(),
                        position: self.offset,
                    });
                }
            }
        }

        if tokens.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Lexes a keyword, bare identifier, or designator call.
    fn word(&mut self, bytes: &[u8]) -> Result<SpannedToken<'a>, ParseError> {
        let start = self.offset;
        self.offset += 1;
        self.consume_while(bytes, |b| is_ident_char(char::from(b)));
        let name = &self.input[start .. self.offset];
        let keyword = match name {
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            _ => None,
        };
        if let Some(token) = keyword {
            return Ok(SpannedToken {
                token,
                position: start,
            });
        }

        let after_name = self.offset;
        self.consume_while(bytes, |b| b.is_ascii_whitespace());
        if bytes.get(self.offset) != Some(&b'(') {
            self.offset = after_name;
            return Ok(SpannedToken {
                token: Token::Ident(name),
                position: start,
            });
        }

        let body_start = self.offset + 1;
        let mut depth = 0usize;
        while let Some(&b) = bytes.get(self.offset) {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.input[body_start .. self.offset];
                        self.offset += 1;
                        return Ok(SpannedToken {
                            token: Token::Designator {
                                name,
                                body,
                            },
                            position: start,
                        });
                    }
                }
                _ => {}
            }
            self.offset += 1;
        }
        Err(ParseError::Unbalanced {
            position: start,
        })
    }

    /// Builds a token at the current offset.
    const fn simple(&self, token: Token<'a>) -> SpannedToken<'a> {
        SpannedToken {
            token,
            position: self.offset,
        }
    }

    /// Returns the next byte without advancing.
    fn peek_char(&self, bytes: &[u8]) -> Option<u8> {
        bytes.get(self.offset + 1).copied()
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser for pointcut expressions.
struct Parser<'input> {
    /// Token stream with source positions.
    tokens: Vec<SpannedToken<'input>>,
    /// Current token index.
    index: usize,
    /// Current nesting depth.
    nesting: usize,
    /// Maximum nesting depth.
    max_nesting: usize,
}

impl<'input> Parser<'input> {
    /// Creates a parser over the token stream.
    const fn new(tokens: Vec<SpannedToken<'input>>, max_nesting: usize) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
            max_nesting,
        }
    }

    /// Parses a full expression.
    fn parse_expression(&mut self) -> Result<Expr<Designator>, ParseError> {
        self.parse_or()
    }

    /// Parses OR expressions.
    fn parse_or(&mut self) -> Result<Expr<Designator>, ParseError> {
        let mut parts = vec![self.parse_and()?];
        while self.matches(Token::Or) {
            parts.push(self.parse_and()?);
        }
        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Expr::or(parts)) }
    }

    /// Parses AND expressions.
    fn parse_and(&mut self) -> Result<Expr<Designator>, ParseError> {
        let mut parts = vec![self.parse_unary()?];
        while self.matches(Token::And) {
            parts.push(self.parse_unary()?);
        }
        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Expr::and(parts)) }
    }

    /// Parses unary expressions, including NOT.
    fn parse_unary(&mut self) -> Result<Expr<Designator>, ParseError> {
        let position = self.current().position;
        if self.matches(Token::Not) {
            return self.with_nesting(position, |parser| {
                let inner = parser.parse_unary()?;
                Ok(Expr::negate(inner))
            });
        }
        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr<Designator>, ParseError> {
        let SpannedToken {
            token,
            position,
        } = *self.current();
        match token {
            Token::Designator {
                name,
                body,
            } => {
                self.advance();
                Ok(Expr::primitive(Designator::from_parts(name, body, position)?))
            }
            Token::LParen => {
                self.advance();
                self.with_nesting(position, |parser| {
                    let expr = parser.parse_expression()?;
                    parser.expect(Token::RParen, "`)`")?;
                    Ok(expr)
                })
            }
            Token::Ident(name) => Err(ParseError::UnexpectedToken {
                expected: "designator call such as `execution(..)`",
                found: name.to_string(),
                position,
            }),
            Token::RParen | Token::And | Token::Or | Token::Not | Token::Eof => {
                Err(ParseError::UnexpectedToken {
                    expected: "designator or `(`",
                    found: self.describe_current(),
                    position,
                })
            }
        }
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let next_depth = self.nesting + 1;
        if next_depth > self.max_nesting {
            return Err(ParseError::NestingTooDeep {
                max_depth: self.max_nesting,
                actual_depth: next_depth,
                position,
            });
        }
        self.nesting = next_depth;
        let result = f(self);
        self.nesting = self.nesting.saturating_sub(1);
        result
    }

    /// Consumes the expected token or returns an error.
    fn expect(&mut self, token: Token<'_>, expected: &'static str) -> Result<(), ParseError> {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(&token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected,
                found: self.describe_current(),
                position: self.current().position,
            })
        }
    }

    /// Ensures the parser is at end-of-input.
    fn expect_eof(&self) -> Result<(), ParseError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(ParseError::TrailingInput {
                position: self.current().position,
            })
        }
    }

    /// Consumes the token if it matches the expected kind.
    fn matches(&mut self, kind: Token<'_>) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'input> {
        debug_assert!(self.index < self.tokens.len(), "parser index out of bounds");
        &self.tokens[self.index]
    }

    /// Advances to the next token.
    const fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    /// Formats the current token for diagnostics.
    fn describe_current(&self) -> String {
        match &self.current().token {
            Token::Designator {
                name, ..
            } => format!("{name}(..)"),
            Token::Ident(name) => (*name).to_string(),
            Token::And => "&&".to_string(),
            Token::Or => "||".to_string(),
            Token::Not => "!".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
