// crates/crosscut-expr/src/pattern.rs
// ============================================================================
// Module: Name, Type, and Signature Patterns
// Description: Wildcard patterns used inside designator bodies.
// Purpose: Match method names, type names, and method signatures statically.
// Dependencies: crosscut_meta, serde
// ============================================================================

//! ## Overview
//! Patterns always match fully qualified names.
//!
//! - `*` matches any run of characters inside one name segment. A pattern
//!   that is exactly `*` matches every type.
//! - `..` in a type pattern matches any number of package segments
//!   (`app..*Service` matches `app.user.UserService`); in a parameter list it
//!   matches any run of parameters.
//! - A trailing `+` matches the named type and all of its subtypes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crosscut_meta::ClassInfo;
use crosscut_meta::MethodInfo;
use crosscut_meta::Modifiers;
use crosscut_meta::TypeLoader;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Name Pattern
// ============================================================================

/// Single-segment wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamePattern {
    /// Raw pattern text.
    raw: String,
}

impl NamePattern {
    /// Parses a name pattern.
    ///
    /// # Errors
    ///
    /// Returns a message when the pattern is empty or contains characters
    /// other than identifier characters and `*`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("empty name pattern".to_string());
        }
        if let Some(bad) = raw.chars().find(|ch| !(is_ident_char(*ch) || *ch == '*')) {
            return Err(format!("unexpected `{bad}` in name pattern `{raw}`"));
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// Returns true when `name` matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        glob_matches(self.raw.as_bytes(), name.as_bytes())
    }

    /// Returns true when the pattern contains no wildcard.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        !self.raw.contains('*')
    }

    /// Returns the raw pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Matches `*` against any run of bytes.
fn glob_matches(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&expected) if expected == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p ..].iter().all(|byte| *byte == b'*')
}

/// Returns true for characters allowed in type and member names.
pub(crate) const fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

// ============================================================================
// SECTION: Type Pattern
// ============================================================================

/// One dot-separated piece of a type pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum TypeSegment {
    /// One name segment.
    Name(NamePattern),
    /// Zero or more package segments (`..`).
    AnyPackages,
}

/// Pattern over fully qualified type names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypePattern {
    /// Raw pattern text.
    raw: String,
    /// Parsed segments; empty for the `*` pattern.
    segments: Vec<TypeSegment>,
    /// True for the bare `*` pattern.
    any: bool,
    /// True when a trailing `+` includes subtypes.
    subtypes: bool,
}

impl TypePattern {
    /// Parses a type pattern.
    ///
    /// # Errors
    ///
    /// Returns a message for empty patterns, illegal characters, or a
    /// pattern that ends in `..`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed == "*" {
            return Ok(Self {
                raw: trimmed.to_string(),
                segments: Vec::new(),
                any: true,
                subtypes: false,
            });
        }
        let (body, subtypes) =
            trimmed.strip_suffix('+').map_or((trimmed, false), |body| (body, true));
        if body.is_empty() {
            return Err("empty type pattern".to_string());
        }
        let mut segments = Vec::new();
        for part in body.split('.') {
            if part.is_empty() {
                if segments.last() != Some(&TypeSegment::AnyPackages) {
                    segments.push(TypeSegment::AnyPackages);
                }
            } else {
                segments.push(TypeSegment::Name(NamePattern::parse(part)?));
            }
        }
        if matches!(segments.last(), Some(TypeSegment::AnyPackages) | None) {
            return Err(format!("type pattern `{trimmed}` must end with a name"));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            segments,
            any: false,
            subtypes,
        })
    }

    /// Returns the pattern that matches every type.
    #[must_use]
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            segments: Vec::new(),
            any: true,
            subtypes: false,
        }
    }

    /// Returns the exact type name when the pattern has no wildcards.
    #[must_use]
    pub fn exact_name(&self) -> Option<&str> {
        let literal = !self.any
            && !self.subtypes
            && self.segments.iter().all(|segment| match segment {
                TypeSegment::Name(name) => name.is_literal(),
                TypeSegment::AnyPackages => false,
            });
        literal.then_some(self.raw.as_str())
    }

    /// Returns true when the pattern includes subtypes.
    #[must_use]
    pub const fn includes_subtypes(&self) -> bool {
        self.subtypes
    }

    /// Returns true for the `*` pattern.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        self.any
    }

    /// Returns the raw pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches a type name, ignoring the `+` suffix.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        if self.any {
            return true;
        }
        let parts: Vec<&str> = name.split('.').collect();
        match_segments(&self.segments, &parts)
    }

    /// Matches a class, including its supertypes when the pattern ends in `+`.
    #[must_use]
    pub fn matches_class(&self, class: &ClassInfo) -> bool {
        if self.matches_name(class.name()) {
            return true;
        }
        if !self.subtypes {
            return false;
        }
        class.superclasses().any(|parent| self.matches_name(parent.name()))
            || class.all_interfaces().iter().any(|iface| self.matches_name(iface.name()))
    }

    /// Matches a type given by name, loading it for `+` patterns.
    #[must_use]
    pub fn matches_type_name(&self, name: &str, loader: &TypeLoader) -> bool {
        if self.subtypes {
            if let Some(class) = loader.load(name) {
                return self.matches_class(&class);
            }
        }
        self.matches_name(name)
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Matches segments against the dot-split name.
fn match_segments(pattern: &[TypeSegment], name: &[&str]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((TypeSegment::AnyPackages, rest)) => {
            (0 ..= name.len()).any(|skip| match_segments(rest, &name[skip ..]))
        }
        Some((TypeSegment::Name(segment), rest)) => name
            .split_first()
            .is_some_and(|(head, tail)| segment.matches(head) && match_segments(rest, tail)),
    }
}

// ============================================================================
// SECTION: Signature Pattern
// ============================================================================

/// One entry of an `execution(..)` parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamPattern {
    /// `..`: any run of parameters.
    AnyRun,
    /// One parameter whose type matches.
    Type(TypePattern),
}

/// Pattern over method signatures, as written in `execution(..)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignaturePattern {
    /// Modifiers the method must carry.
    modifiers: Modifiers,
    /// Return type pattern.
    return_type: TypePattern,
    /// Declaring type pattern; `None` matches any declaring type.
    declaring: Option<TypePattern>,
    /// Method name pattern.
    name: NamePattern,
    /// Parameter patterns.
    params: Vec<ParamPattern>,
}

impl SignaturePattern {
    /// Parses `<modifiers>? <return> <declaring>.?<name>(<params>)`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first malformed piece.
    pub fn parse(body: &str) -> Result<Self, String> {
        let body = body.trim();
        let open = body.find('(').ok_or_else(|| "missing parameter list".to_string())?;
        let params_raw = body
            .strip_suffix(')')
            .and_then(|without_close| without_close.get(open + 1 ..))
            .ok_or_else(|| "parameter list must close the signature".to_string())?;
        if params_raw.contains(['(', ')']) {
            return Err("nested parentheses in parameter list".to_string());
        }

        let mut tokens: Vec<&str> = body[.. open].split_whitespace().collect();
        let mut modifiers = Modifiers::NONE;
        while let Some(modifier) = tokens.first().and_then(|token| Modifiers::from_keyword(token)) {
            modifiers = modifiers.with(modifier);
            tokens.remove(0);
        }
        let [return_raw, qualified] = tokens.as_slice() else {
            return Err("expected `<return type> <name>(<params>)`".to_string());
        };

        let (declaring, name) = match qualified.rsplit_once('.') {
            Some((declaring, _)) if declaring.ends_with('.') => {
                return Err(format!("`{qualified}` ends its type pattern with `..`"));
            }
            Some((declaring, name)) => (Some(TypePattern::parse(declaring)?), name),
            None => (None, *qualified),
        };

        let params = if params_raw.trim().is_empty() {
            Vec::new()
        } else {
            params_raw
                .split(',')
                .map(|param| match param.trim() {
                    ".." => Ok(ParamPattern::AnyRun),
                    other => TypePattern::parse(other).map(ParamPattern::Type),
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            modifiers,
            return_type: TypePattern::parse(return_raw)?,
            declaring,
            name: NamePattern::parse(name)?,
            params,
        })
    }

    /// Returns the declaring type pattern, if any.
    #[must_use]
    pub const fn declaring(&self) -> Option<&TypePattern> {
        self.declaring.as_ref()
    }

    /// Returns the method name pattern.
    #[must_use]
    pub const fn name(&self) -> &NamePattern {
        &self.name
    }

    /// Matches a method executing on `target_class`.
    ///
    /// The declaring pattern matches when any type in the target hierarchy
    /// that declares the signature matches it, so a pattern naming an
    /// interface also selects the implementing override.
    #[must_use]
    pub fn matches(&self, method: &MethodInfo, target_class: &ClassInfo, loader: &TypeLoader) -> bool {
        if !method.modifiers().contains(self.modifiers)
            || !self.name.matches(method.name())
            || !self.return_type.matches_type_name(method.return_type(), loader)
            || !match_params(&self.params, method.params(), loader)
        {
            return false;
        }
        let Some(declaring) = &self.declaring else {
            return true;
        };
        if target_class.declares(method) && declaring.matches_class(target_class) {
            return true;
        }
        let supers = target_class.superclasses().map(|class| class.as_ref());
        let interfaces = target_class.all_interfaces();
        supers
            .chain(interfaces.iter().map(AsRef::as_ref))
            .any(|class| class.declares(method) && declaring.matches_class(class))
    }
}

/// Matches parameter patterns against parameter type names.
fn match_params(patterns: &[ParamPattern], params: &[String], loader: &TypeLoader) -> bool {
    match patterns.split_first() {
        None => params.is_empty(),
        Some((ParamPattern::AnyRun, rest)) => {
            (0 ..= params.len()).any(|skip| match_params(rest, &params[skip ..], loader))
        }
        Some((ParamPattern::Type(pattern), rest)) => {
            params.split_first().is_some_and(|(head, tail)| {
                pattern.matches_type_name(head, loader) && match_params(rest, tail, loader)
            })
        }
    }
}

// ============================================================================
// SECTION: Argument Pattern
// ============================================================================

/// One entry of an `args(..)` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgPattern {
    /// `..`: any run of arguments.
    AnyRun,
    /// `*`: exactly one argument of any type.
    Any,
    /// A type name or a parameter name, decided at compile time.
    Named(String),
}

impl ArgPattern {
    /// Parses a comma separated `args(..)` body.
    ///
    /// # Errors
    ///
    /// Returns a message for malformed entries or more than one `..`.
    pub fn parse_list(body: &str) -> Result<Vec<Self>, String> {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let patterns = body
            .split(',')
            .map(|entry| match entry.trim() {
                ".." => Ok(Self::AnyRun),
                "*" => Ok(Self::Any),
                other => parse_reference(other).map(Self::Named),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if patterns.iter().filter(|pattern| **pattern == Self::AnyRun).count() > 1 {
            return Err("at most one `..` is supported in `args`".to_string());
        }
        Ok(patterns)
    }
}

/// Parses a single type-or-parameter reference (`app.User`, `user`).
///
/// # Errors
///
/// Returns a message when the reference is empty or not a dotted identifier.
pub fn parse_reference(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let valid = !raw.is_empty()
        && raw.split('.').all(|part| !part.is_empty() && part.chars().all(is_ident_char));
    if valid { Ok(raw.to_string()) } else { Err(format!("`{raw}` is not a type or parameter name")) }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn any_packages_matches_zero_or_more_segments() {
        let pattern = TypePattern::parse("app..*Service").unwrap();
        assert!(pattern.matches_name("app.UserService"));
        assert!(pattern.matches_name("app.user.admin.UserService"));
        assert!(!pattern.matches_name("lib.UserService"));
        assert!(!pattern.matches_name("app.UserServiceImpl"));
    }

    #[test]
    fn star_does_not_cross_segments() {
        let pattern = TypePattern::parse("app.*").unwrap();
        assert!(pattern.matches_name("app.Thing"));
        assert!(!pattern.matches_name("app.inner.Thing"));
    }

    #[test]
    fn signature_parses_modifiers_and_declaring_type() {
        let pattern = SignaturePattern::parse("public * app..*Repository.find*(i64, ..)").unwrap();
        assert_eq!(pattern.declaring().map(TypePattern::as_str), Some("app..*Repository"));
        assert!(pattern.name().matches("findById"));
        assert!(SignaturePattern::parse("foo(..)").is_err());
        assert!(SignaturePattern::parse("* app..find(..)").is_err());
    }
}
