// crates/crosscut-core/src/pointcut/bean.rs
// ============================================================================
// Module: Bean Name Designator
// Description: The `bean(...)` designator for expression pointcuts.
// Purpose: Select join points by the name of the component being proxied.
// Dependencies: crosscut_expr, regex
// ============================================================================

//! ## Overview
//! `bean(order*)` matches when the component name fits the pattern, with
//! `*` matching any run of characters and a leading `!` negating the
//! result. Without a known component name the designator abstains, which
//! leaves the decision to the per-call check.

use std::sync::Arc;

use crosscut_expr::ContextMatcher;
use crosscut_expr::DesignatorHandler;
use crosscut_expr::MatchContext;
use crosscut_expr::TriState;
use regex::Regex;

/// Registers the `bean` keyword with an evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeanNameDesignator;

impl DesignatorHandler for BeanNameDesignator {
    fn name(&self) -> &str {
        "bean"
    }

    fn compile(&self, body: &str) -> Result<Arc<dyn ContextMatcher>, String> {
        let body = body.trim();
        let (negated, pattern) = match body.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, body),
        };
        if pattern.is_empty() {
            return Err("bean name pattern is empty".to_string());
        }
        if let Some(bad) = pattern.chars().find(|ch| ch.is_whitespace() || matches!(ch, '(' | ')' | ',')) {
            return Err(format!("unexpected `{bad}` in bean name pattern `{pattern}`"));
        }
        let translated: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let regex = Regex::new(&format!("^{}$", translated.join(".*"))).map_err(|err| err.to_string())?;
        Ok(Arc::new(BeanNameMatcher {
            pattern: pattern.to_string(),
            regex,
            negated,
        }))
    }
}

/// Compiled `bean(...)` body.
#[derive(Debug)]
struct BeanNameMatcher {
    /// Pattern as written, without the negation.
    pattern: String,
    /// Anchored translation of the pattern.
    regex: Regex,
    /// Leading `!`.
    negated: bool,
}

impl ContextMatcher for BeanNameMatcher {
    fn matches(&self, context: &MatchContext<'_>) -> TriState {
        let Some(bean_name) = context.bean_name else {
            return TriState::Unknown;
        };
        let matched = self.regex.is_match(bean_name) != self.negated;
        tracing::trace!(
            target: "crosscut::pointcut",
            pattern = %self.pattern,
            bean = bean_name,
            matched,
            "bean designator evaluated"
        );
        matched.into()
    }
}
