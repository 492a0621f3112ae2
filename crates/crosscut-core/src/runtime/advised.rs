// crates/crosscut-core/src/runtime/advised.rs
// ============================================================================
// Module: Advised Configuration
// Description: Per-proxy advisor list, interfaces, settings, and chain cache.
// Purpose: Hold everything a proxy needs and resolve chains once per method.
// Dependencies: crate::{core, interfaces, runtime}, crosscut_meta, dashmap, parking_lot
// ============================================================================

//! ## Overview
//! An [`AdvisedConfig`] is built once and then shared by a proxy across
//! threads. Advisors may still be changed until the configuration is
//! frozen; every change is validated immediately (unknown advice kinds,
//! broken pointcuts, non-interface introductions) and clears the chain
//! cache.
//!
//! Chains are cached per (method, target class). Concurrent readers never
//! block each other; two threads resolving the same missing key may both
//! compute, and the first insert wins. A chain resolved while a change was
//! in flight is returned to its caller but never kept in the cache.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodKey;
use crosscut_meta::MethodRef;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::core::AdapterRegistry;
use crate::core::Advice;
use crate::core::Advisor;
use crate::core::AdvisorRef;
use crate::core::ConfigError;
use crate::core::ProxySettings;
use crate::interfaces::TargetSource;
use crate::runtime::chain::AdvisorChainFactory;
use crate::runtime::chain::ChainElement;
use crate::runtime::chain::DefaultChainFactory;
use crate::runtime::creation::ProxyCreationContext;

/// Chain cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChainKey {
    /// Method identity.
    method: MethodKey,
    /// Target class name.
    target_class: String,
}

/// Configuration behind one proxy.
///
/// # Invariants
/// - Once frozen, the advisor list never changes.
/// - Every advisor in the list was accepted by the adapter registry.
pub struct AdvisedConfig {
    /// Supplies targets.
    target_source: Arc<dyn TargetSource>,
    /// Proxied interfaces, in insertion order without duplicates.
    interfaces: RwLock<Vec<ClassRef>>,
    /// Advisors in declared order.
    advisors: RwLock<Vec<AdvisorRef>>,
    /// Proxy flags; `frozen` is tracked separately.
    settings: ProxySettings,
    /// Advisor changes rejected when set.
    frozen: AtomicBool,
    /// Advisors already narrowed to the target class.
    pre_filtered: AtomicBool,
    /// Component name, exposed to matchers.
    bean_name: Option<String>,
    /// Converts advice into interceptors.
    registry: Arc<AdapterRegistry>,
    /// Resolves chains.
    chain_factory: Arc<dyn AdvisorChainFactory>,
    /// Resolved chains.
    chains: DashMap<ChainKey, Arc<[ChainElement]>>,
    /// Bumped by every change that can alter a chain.
    generation: AtomicU64,
}

impl AdvisedConfig {
    /// Empty configuration over `target_source`.
    #[must_use]
    pub fn new(target_source: Arc<dyn TargetSource>) -> Self {
        Self {
            target_source,
            interfaces: RwLock::new(Vec::new()),
            advisors: RwLock::new(Vec::new()),
            settings: ProxySettings::default(),
            frozen: AtomicBool::new(false),
            pre_filtered: AtomicBool::new(false),
            bean_name: None,
            registry: Arc::new(AdapterRegistry::default()),
            chain_factory: Arc::new(DefaultChainFactory),
            chains: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Applies proxy settings, including the frozen flag.
    #[must_use]
    pub fn with_settings(mut self, settings: ProxySettings) -> Self {
        self.frozen = AtomicBool::new(settings.frozen);
        self.settings = settings;
        self
    }

    /// Sets the component name.
    #[must_use]
    pub fn with_bean_name(mut self, bean_name: impl Into<String>) -> Self {
        self.bean_name = Some(bean_name.into());
        self
    }

    /// Uses another adapter registry.
    #[must_use]
    pub fn with_adapter_registry(mut self, registry: Arc<AdapterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Uses another chain factory.
    #[must_use]
    pub fn with_chain_factory(mut self, chain_factory: Arc<dyn AdvisorChainFactory>) -> Self {
        self.chain_factory = chain_factory;
        self
    }

    /// Marks the advisor list as already narrowed to the target class.
    #[must_use]
    pub fn with_pre_filtered(self, pre_filtered: bool) -> Self {
        self.pre_filtered.store(pre_filtered, Ordering::Release);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the target source.
    #[must_use]
    pub fn target_source(&self) -> &Arc<dyn TargetSource> {
        &self.target_source
    }

    /// Returns the target class, when the source knows it.
    #[must_use]
    pub fn target_class(&self) -> Option<ClassRef> {
        self.target_source.target_class()
    }

    /// Returns a snapshot of the advisors.
    #[must_use]
    pub fn advisors(&self) -> Vec<AdvisorRef> {
        self.advisors.read().clone()
    }

    /// Returns a snapshot of the proxied interfaces.
    #[must_use]
    pub fn interfaces(&self) -> Vec<ClassRef> {
        self.interfaces.read().clone()
    }

    /// Returns the proxy settings with the current frozen flag.
    #[must_use]
    pub fn settings(&self) -> ProxySettings {
        ProxySettings {
            frozen: self.is_frozen(),
            ..self.settings
        }
    }

    /// Returns the component name.
    #[must_use]
    pub fn bean_name(&self) -> Option<&str> {
        self.bean_name.as_deref()
    }

    /// Returns the adapter registry.
    #[must_use]
    pub fn adapter_registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Returns true when the advisor list is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Freezes or unfreezes the advisor list.
    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::Release);
    }

    /// Returns true when the advisors were narrowed to the target class.
    #[must_use]
    pub fn is_pre_filtered(&self) -> bool {
        self.pre_filtered.load(Ordering::Acquire)
    }

    /// Returns true when `interface` is proxied.
    #[must_use]
    pub fn is_interface_proxied(&self, interface: &str) -> bool {
        self.interfaces.read().iter().any(|proxied| proxied.is_subtype_of_name(interface))
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Adds an interface to proxy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAnInterface`] for classes and
    /// [`ConfigError::Frozen`] when frozen.
    pub fn add_interface(&self, interface: &ClassRef) -> Result<(), ConfigError> {
        self.ensure_mutable()?;
        if !interface.is_interface() {
            return Err(ConfigError::NotAnInterface(interface.name().to_string()));
        }
        let mut interfaces = self.interfaces.write();
        if !interfaces.iter().any(|existing| Arc::ptr_eq(existing, interface)) {
            interfaces.push(Arc::clone(interface));
        }
        drop(interfaces);
        self.invalidate_chains();
        Ok(())
    }

    /// Appends an advisor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when frozen or when the advisor fails validation.
    pub fn add_advisor(&self, advisor: impl Into<AdvisorRef>) -> Result<(), ConfigError> {
        let advisor = advisor.into();
        let len = self.advisors.read().len();
        self.insert_advisor(len, advisor)
    }

    /// Appends an unconditional advisor for `advice`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when frozen or when the advice cannot be adapted.
    pub fn add_advice(&self, advice: Advice) -> Result<(), ConfigError> {
        self.add_advisor(Advisor::unconditional(advice))
    }

    /// Inserts an advisor at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexOutOfRange`] for a bad position, and
    /// [`ConfigError`] when frozen or when the advisor fails validation.
    pub fn insert_advisor(&self, position: usize, advisor: impl Into<AdvisorRef>) -> Result<(), ConfigError> {
        let advisor = advisor.into();
        self.ensure_mutable()?;
        advisor.validate()?;
        self.registry.wrap(advisor.advice())?;
        let mut advisors = self.advisors.write();
        if position > advisors.len() {
            return Err(ConfigError::IndexOutOfRange {
                index: position,
                len: advisors.len(),
            });
        }
        let mut interfaces = self.interfaces.write();
        for interface in advisor.introduced_interfaces() {
            if !interfaces.iter().any(|existing| Arc::ptr_eq(existing, interface)) {
                interfaces.push(Arc::clone(interface));
            }
        }
        advisors.insert(position, advisor);
        drop(interfaces);
        drop(advisors);
        self.invalidate_chains();
        Ok(())
    }

    /// Removes an advisor by identity; returns false when it was not present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Frozen`] when frozen.
    pub fn remove_advisor(&self, advisor: &AdvisorRef) -> Result<bool, ConfigError> {
        self.ensure_mutable()?;
        let mut advisors = self.advisors.write();
        let Some(index) = advisors.iter().position(|existing| Arc::ptr_eq(existing, advisor)) else {
            return Ok(false);
        };
        advisors.remove(index);
        drop(advisors);
        self.invalidate_chains();
        Ok(true)
    }

    fn ensure_mutable(&self) -> Result<(), ConfigError> {
        if self.is_frozen() { Err(ConfigError::Frozen) } else { Ok(()) }
    }

    /// Drops cached chains; the generation moves first so in-flight resolutions see the change.
    fn invalidate_chains(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.chains.clear();
    }

    // ------------------------------------------------------------------------
    // Chains
    // ------------------------------------------------------------------------

    /// Returns the chain for `method` on `target_class`, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the chain factory fails.
    pub fn chain_for(&self, method: &MethodRef, target_class: &ClassInfo) -> Result<Arc<[ChainElement]>, ConfigError> {
        let key = ChainKey {
            method: method.key(),
            target_class: target_class.name().to_string(),
        };
        if let Some(chain) = self.chains.get(&key) {
            return Ok(Arc::clone(chain.value()));
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let _creation = self.bean_name.as_deref().map(ProxyCreationContext::enter);
        let resolved: Arc<[ChainElement]> = self.chain_factory.resolve(self, method, target_class)?.into();
        let cached = Arc::clone(self.chains.entry(key.clone()).or_insert(resolved).value());
        if self.generation.load(Ordering::SeqCst) != generation {
            self.chains.remove_if(&key, |_, chain| Arc::ptr_eq(chain, &cached));
        }
        Ok(cached)
    }
}

impl fmt::Debug for AdvisedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interfaces: Vec<String> = self.interfaces.read().iter().map(|iface| iface.name().to_string()).collect();
        f.debug_struct("AdvisedConfig")
            .field("target_source", &self.target_source)
            .field("interfaces", &interfaces)
            .field("advisors", &self.advisors.read().len())
            .field("settings", &self.settings())
            .field("pre_filtered", &self.is_pre_filtered())
            .field("bean_name", &self.bean_name)
            .finish_non_exhaustive()
    }
}
