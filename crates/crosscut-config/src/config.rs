// crates/crosscut-config/src/config.rs
// ============================================================================
// Module: Crosscut Configuration
// Description: Configuration loading and validation for proxy creation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: crosscut-core, crosscut-expr, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys, out-of-range limits, and unsupported switches are rejected
//! at load time; a config that loads is safe to hand to the engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crosscut_core::AdvisorSource;
use crosscut_core::AutoProxyEngine;
use crosscut_core::AutoProxyOptions;
use crosscut_core::ExpressionPointcut;
use crosscut_core::ProxySettings;
use crosscut_expr::ParseLimits;
use crosscut_expr::parser::DEFAULT_MAX_INPUT_BYTES;
use crosscut_expr::parser::DEFAULT_MAX_NESTING;
use crosscut_expr::parser::MAX_INPUT_BYTES_CEILING;
use crosscut_expr::parser::MAX_NESTING_CEILING;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "crosscut.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "CROSSCUT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured ignored interfaces.
pub(crate) const MAX_IGNORED_INTERFACES: usize = 256;
/// Maximum length of a type name.
pub(crate) const MAX_TYPE_NAME_LENGTH: usize = 512;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Crosscut configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrosscutConfig {
    /// Flags applied to every proxy the engine builds.
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Auto-proxy engine options.
    #[serde(default)]
    pub auto_proxy: AutoProxyConfig,
    /// Pointcut expression limits.
    #[serde(default)]
    pub expression: ExpressionConfig,
}

impl CrosscutConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is `path` when given, else `CROSSCUT_CONFIG`, else
    /// `crosscut.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auto_proxy.validate()?;
        self.expression.validate()?;
        Ok(())
    }

    /// Returns the proxy flags as core settings.
    #[must_use]
    pub const fn proxy_settings(&self) -> ProxySettings {
        self.proxy.to_settings()
    }

    /// Returns the auto-proxy options as core options.
    #[must_use]
    pub fn auto_proxy_options(&self) -> AutoProxyOptions {
        self.auto_proxy.to_options()
    }

    /// Returns the expression parser limits.
    #[must_use]
    pub const fn parse_limits(&self) -> ParseLimits {
        self.expression.to_limits()
    }

    /// Builds an auto-proxy engine carrying this configuration.
    #[must_use]
    pub fn auto_proxy_engine(&self, advisor_source: Arc<dyn AdvisorSource>) -> AutoProxyEngine {
        AutoProxyEngine::new(advisor_source)
            .with_settings(self.proxy_settings())
            .with_options(self.auto_proxy_options())
    }

    /// Builds an expression pointcut bounded by the configured limits.
    #[must_use]
    pub fn expression_pointcut(&self, expression: impl Into<String>) -> ExpressionPointcut {
        ExpressionPointcut::new(expression).with_limits(self.parse_limits())
    }
}

// ============================================================================
// SECTION: Proxy
// ============================================================================

/// `[proxy]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Proxy the target class instead of its interfaces.
    #[serde(default)]
    pub proxy_target_class: bool,
    /// Allow aggressive optimizations (implies a class-based proxy).
    #[serde(default)]
    pub optimize: bool,
    /// Expose the proxy through the current-proxy channel during calls.
    #[serde(default)]
    pub expose_proxy: bool,
    /// Hide the proxy configuration from callers.
    #[serde(default)]
    pub opaque: bool,
    /// Reject advisor changes once a proxy is built.
    #[serde(default)]
    pub frozen: bool,
}

impl ProxyConfig {
    /// Converts into core settings.
    #[must_use]
    pub const fn to_settings(self) -> ProxySettings {
        ProxySettings {
            proxy_target_class: self.proxy_target_class,
            optimize: self.optimize,
            expose_proxy: self.expose_proxy,
            opaque: self.opaque,
            frozen: self.frozen,
        }
    }
}

// ============================================================================
// SECTION: Auto Proxy
// ============================================================================

/// `[auto_proxy]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoProxyConfig {
    /// Extra interface names treated like lifecycle callbacks.
    #[serde(default)]
    pub ignored_interfaces: Vec<String>,
    /// Leave `<name>.ORIGINAL` instances unproxied.
    #[serde(default = "default_skip_original_instances")]
    pub skip_original_instances: bool,
    /// Proxy infrastructure components too. Unsupported; must stay false.
    #[serde(default)]
    pub apply_to_infrastructure: bool,
}

impl Default for AutoProxyConfig {
    fn default() -> Self {
        Self {
            ignored_interfaces: Vec::new(),
            skip_original_instances: default_skip_original_instances(),
            apply_to_infrastructure: false,
        }
    }
}

impl AutoProxyConfig {
    /// Validates the section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed interface names or
    /// when infrastructure proxying is requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.apply_to_infrastructure {
            return Err(ConfigError::Invalid(
                "auto_proxy.apply_to_infrastructure=true is not supported".to_string(),
            ));
        }
        if self.ignored_interfaces.len() > MAX_IGNORED_INTERFACES {
            return Err(ConfigError::Invalid(format!(
                "auto_proxy.ignored_interfaces exceeds {MAX_IGNORED_INTERFACES} entries"
            )));
        }
        for name in &self.ignored_interfaces {
            validate_type_name("auto_proxy.ignored_interfaces", name)?;
        }
        Ok(())
    }

    /// Converts into core options.
    #[must_use]
    pub fn to_options(&self) -> AutoProxyOptions {
        AutoProxyOptions {
            ignored_interfaces: self.ignored_interfaces.clone(),
            skip_original_instances: self.skip_original_instances,
        }
    }
}

/// Default for `auto_proxy.skip_original_instances`.
const fn default_skip_original_instances() -> bool {
    true
}

// ============================================================================
// SECTION: Expression
// ============================================================================

/// `[expression]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExpressionConfig {
    /// Maximum expression size in bytes.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    /// Maximum nesting depth.
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
            max_nesting: default_max_nesting(),
        }
    }
}

impl ExpressionConfig {
    /// Validates the section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a limit is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range("expression.max_input_bytes", self.max_input_bytes, 1, MAX_INPUT_BYTES_CEILING)?;
        validate_range("expression.max_nesting", self.max_nesting, 1, MAX_NESTING_CEILING)
    }

    /// Converts into parser limits.
    #[must_use]
    pub const fn to_limits(self) -> ParseLimits {
        ParseLimits {
            max_input_bytes: self.max_input_bytes,
            max_nesting: self.max_nesting,
        }
    }
}

/// Default for `expression.max_input_bytes`.
const fn default_max_input_bytes() -> usize {
    DEFAULT_MAX_INPUT_BYTES
}

/// Default for `expression.max_nesting`.
const fn default_max_nesting() -> usize {
    DEFAULT_MAX_NESTING
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates an inclusive numeric range.
fn validate_range(field: &str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Validates a fully qualified type name such as `app.lifecycle.Marker`.
fn validate_type_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_TYPE_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} entries must be 1..={MAX_TYPE_NAME_LENGTH} bytes")));
    }
    let well_formed = value.split('.').all(|segment| {
        let mut chars = segment.chars();
        chars.next().is_some_and(|first| first.is_alphabetic() || first == '_' || first == '$')
            && chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$')
    });
    if !well_formed {
        return Err(ConfigError::Invalid(format!("{field} entry `{value}` is not a type name")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
