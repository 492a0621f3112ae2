// crates/crosscut-core/src/core/settings.rs
// ============================================================================
// Module: Proxy Settings
// Description: Flags shared by proxy configurations and auto-proxying.
// Purpose: Provide serializable settings the config crate can populate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ProxySettings`] controls how one proxy is built and behaves.
//! [`AutoProxyOptions`] controls which components the auto-proxy engine
//! considers and how it chooses between interface and class proxies.

use serde::Deserialize;
use serde::Serialize;

/// Interfaces that never justify an interface-based proxy on their own.
pub const DEFAULT_CALLBACK_INTERFACES: &[&str] = &[
    "crosscut.lifecycle.Aware",
    "crosscut.lifecycle.InitializingBean",
    "crosscut.lifecycle.DisposableBean",
    "crosscut.lifecycle.Closeable",
];

/// Types whose instances belong to the interception infrastructure.
pub const INFRASTRUCTURE_TYPES: &[&str] =
    &["crosscut.aop.Advice", "crosscut.aop.Advisor", "crosscut.aop.Pointcut", "crosscut.aop.Infrastructure"];

/// Annotation marking a class as infrastructure.
pub const INFRASTRUCTURE_ANNOTATION: &str = "crosscut.aop.InfrastructureBean";

/// Bean-name suffix marking a raw instance that must stay unproxied.
pub const ORIGINAL_INSTANCE_SUFFIX: &str = ".ORIGINAL";

/// Flags for a single proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Proxy the target class instead of its interfaces.
    pub proxy_target_class: bool,
    /// Allow aggressive proxy optimizations (implies a class-based proxy).
    pub optimize: bool,
    /// Expose the proxy through the current-proxy channel during calls.
    pub expose_proxy: bool,
    /// Hide the configuration from callers holding the proxy.
    pub opaque: bool,
    /// Reject advisor changes once the proxy is built.
    pub frozen: bool,
}

/// Options for the auto-proxy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoProxyOptions {
    /// Extra interface names treated like lifecycle callbacks.
    pub ignored_interfaces: Vec<String>,
    /// Leave `<name>.ORIGINAL` instances unproxied.
    pub skip_original_instances: bool,
}

impl Default for AutoProxyOptions {
    fn default() -> Self {
        Self {
            ignored_interfaces: Vec::new(),
            skip_original_instances: true,
        }
    }
}

impl AutoProxyOptions {
    /// Returns true when `name` is a callback interface, built in or configured.
    #[must_use]
    pub fn is_callback_interface(&self, name: &str) -> bool {
        DEFAULT_CALLBACK_INTERFACES.contains(&name) || self.ignored_interfaces.iter().any(|ignored| ignored == name)
    }
}
