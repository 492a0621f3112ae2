//! Range and switch validation tests for crosscut-config.
// crates/crosscut-config/tests/limits_validation.rs
// =============================================================================
// Module: Limits Validation Tests
// Description: Validate bounds on expression limits and auto-proxy switches.
// Purpose: Ensure out-of-range values fail closed at load time.
// =============================================================================

#![allow(clippy::use_debug, reason = "Failure messages show the unexpected result.")]

use crosscut_config::CrosscutConfig;
use crosscut_core::ConfigError as PointcutError;
use crosscut_core::Pointcut;
use crosscut_expr::CompileError;
use crosscut_expr::ParseError;

mod common;

use common::TestResult;
use common::assert_invalid;

#[test]
fn expression_limits_reject_zero_and_excess() -> TestResult {
    assert_invalid(
        CrosscutConfig::from_toml_str("[expression]\nmax_input_bytes = 0\n"),
        "expression.max_input_bytes must be between 1 and 1048576",
    )?;
    assert_invalid(
        CrosscutConfig::from_toml_str("[expression]\nmax_input_bytes = 1048577\n"),
        "expression.max_input_bytes",
    )?;
    assert_invalid(CrosscutConfig::from_toml_str("[expression]\nmax_nesting = 0\n"), "expression.max_nesting")?;
    assert_invalid(
        CrosscutConfig::from_toml_str("[expression]\nmax_nesting = 65\n"),
        "expression.max_nesting must be between 1 and 64",
    )?;
    Ok(())
}

#[test]
fn expression_limits_accept_bounds() -> TestResult {
    CrosscutConfig::from_toml_str("[expression]\nmax_input_bytes = 1048576\nmax_nesting = 64\n")
        .map_err(|err| err.to_string())?;
    CrosscutConfig::from_toml_str("[expression]\nmax_input_bytes = 1\nmax_nesting = 1\n")
        .map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn negative_limits_fail_to_parse() -> TestResult {
    assert_invalid(CrosscutConfig::from_toml_str("[expression]\nmax_nesting = -1\n"), "config parse error")
}

#[test]
fn infrastructure_proxying_is_rejected() -> TestResult {
    assert_invalid(
        CrosscutConfig::from_toml_str("[auto_proxy]\napply_to_infrastructure = true\n"),
        "auto_proxy.apply_to_infrastructure=true is not supported",
    )?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auto_proxy.apply_to_infrastructure = true;
    assert_invalid(config.validate(), "apply_to_infrastructure")?;
    Ok(())
}

#[test]
fn ignored_interfaces_must_be_type_names() -> TestResult {
    assert_invalid(
        CrosscutConfig::from_toml_str("[auto_proxy]\nignored_interfaces = [\"app..Marker\"]\n"),
        "entry `app..Marker` is not a type name",
    )?;
    assert_invalid(
        CrosscutConfig::from_toml_str("[auto_proxy]\nignored_interfaces = [\"\"]\n"),
        "auto_proxy.ignored_interfaces entries must be",
    )?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auto_proxy.ignored_interfaces = (0..=256).map(|index| format!("app.Marker{index}")).collect();
    assert_invalid(config.validate(), "exceeds 256 entries")?;
    Ok(())
}

#[test]
fn configured_limits_bound_expression_pointcuts() -> TestResult {
    let config = CrosscutConfig::from_toml_str("[expression]\nmax_input_bytes = 16\nmax_nesting = 2\n")
        .map_err(|err| err.to_string())?;

    let long = config.expression_pointcut("execution(* app.OrderService.place(..))");
    match long.validate() {
        Err(PointcutError::Expression(CompileError::Parse(ParseError::InputTooLarge { .. }))) => {}
        other => return Err(format!("expected an input size failure, got {other:?}")),
    }

    let nested = CrosscutConfig::from_toml_str("[expression]\nmax_nesting = 2\n")
        .map_err(|err| err.to_string())?
        .expression_pointcut("!(!(!((((execution(* place(..))))))))");
    match nested.validate() {
        Err(PointcutError::Expression(CompileError::Parse(ParseError::NestingTooDeep { .. }))) => {}
        other => return Err(format!("expected a nesting failure, got {other:?}")),
    }

    let relaxed = common::minimal_config().map_err(|err| err.to_string())?;
    relaxed
        .expression_pointcut("!(!(!((((execution(* place(..))))))))")
        .validate()
        .map_err(|err| err.to_string())?;
    Ok(())
}
