// crates/crosscut-core/src/runtime/autoproxy.rs
// ============================================================================
// Module: Auto-Proxy Engine
// Description: Decides per component whether and how to wrap it in a proxy.
// Purpose: Apply container-supplied advisors to components automatically.
// Dependencies: crate::{core, interfaces, runtime}, crosscut_meta, dashmap, tracing
// ============================================================================

//! ## Overview
//! [`AutoProxyEngine::wrap_if_necessary`] classifies a component once per
//! identity (its bean name, or its class name when anonymous) and caches the
//! verdict. Concurrent first queries for one identity run the
//! classification once; other identities are never blocked.
//!
//! Classification:
//! 1. Infrastructure types, aspect components, and `<class>.ORIGINAL`
//!    instances are ineligible.
//! 2. Candidate advisors are narrowed with [`find_applicable_advisors`] and
//!    stably sorted by order.
//! 3. With no applicable advisor and no custom target source the component
//!    is ineligible.
//! 4. Otherwise an interface proxy is chosen unless class proxying is
//!    configured or the class has no interface with methods beyond
//!    lifecycle callbacks.
//!
//! Classification may call back into the engine (for example when a
//! collaborator is itself a component). A query for an identity already
//! being classified on the current thread answers "ineligible" without
//! caching. A nested query for an identity another thread is classifying
//! is computed on the spot and not cached, so two threads classifying
//! each other's collaborators never wait on one another.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::ThreadId;

use crosscut_meta::ClassInfo;
use crosscut_meta::ClassRef;
use crosscut_meta::ObjectRef;
use dashmap::DashMap;

use crate::core::AdapterRegistry;
use crate::core::AdvisorRef;
use crate::core::AutoProxyOptions;
use crate::core::ConfigError;
use crate::core::INFRASTRUCTURE_ANNOTATION;
use crate::core::INFRASTRUCTURE_TYPES;
use crate::core::ORIGINAL_INSTANCE_SUFFIX;
use crate::core::ProxySettings;
use crate::core::SingletonTargetSource;
use crate::interfaces::AdvisorSource;
use crate::interfaces::ProxyConstructor;
use crate::interfaces::TargetSource;
use crate::interfaces::TargetSourceCreator;
use crate::runtime::advised::AdvisedConfig;
use crate::runtime::chain::find_applicable_advisors;
use crate::runtime::creation::ProxyCreationContext;
use crate::runtime::proxy::DefaultProxyConstructor;

// ============================================================================
// SECTION: Identity and Verdicts
// ============================================================================

/// Identity under which a verdict is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    /// Named component.
    Bean(String),
    /// Anonymous component, keyed by class.
    Class(String),
}

impl CacheKey {
    fn of(bean_name: Option<&str>, class: &ClassInfo) -> Self {
        match bean_name {
            Some(name) if !name.is_empty() => Self::Bean(name.to_string()),
            _ => Self::Class(class.name().to_string()),
        }
    }
}

/// Cached classification.
#[derive(Clone)]
enum Eligibility {
    /// Leave the component alone.
    Ineligible,
    /// Wrap the component.
    Eligible {
        /// Applicable advisors, sorted by order.
        advisors: Vec<AdvisorRef>,
        /// Build a class-based proxy.
        proxy_target_class: bool,
        /// Target source supplied by a creator.
        target_source: Option<Arc<dyn TargetSource>>,
    },
}

type Slot = Arc<OnceLock<Eligibility>>;

thread_local! {
    /// Identities being classified on this thread.
    static IN_PROGRESS: RefCell<HashSet<CacheKey>> = RefCell::new(HashSet::new());
}

/// Removes an identity from the in-progress set when dropped.
struct ClassificationGuard {
    /// Identity being classified.
    key: CacheKey,
    /// Thread-bound.
    _not_send: PhantomData<*const ()>,
}

impl ClassificationGuard {
    /// Marks `key` as in progress; `None` when it already is.
    fn enter(key: &CacheKey) -> Option<Self> {
        let inserted = IN_PROGRESS.with(|keys| keys.borrow_mut().insert(key.clone()));
        inserted.then(|| Self {
            key: key.clone(),
            _not_send: PhantomData,
        })
    }

    fn is_active(key: &CacheKey) -> bool {
        IN_PROGRESS.with(|keys| keys.borrow().contains(key))
    }

    /// Returns true when this thread is inside a classification.
    fn is_nested() -> bool {
        IN_PROGRESS.with(|keys| !keys.borrow().is_empty())
    }
}

impl Drop for ClassificationGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|keys| {
            keys.borrow_mut().remove(&self.key);
        });
    }
}

/// Publishes which thread fills an identity's slot until dropped.
struct InFlight<'a> {
    /// Owner table.
    owners: &'a DashMap<CacheKey, ThreadId>,
    /// Identity being filled.
    key: &'a CacheKey,
}

impl<'a> InFlight<'a> {
    fn enter(owners: &'a DashMap<CacheKey, ThreadId>, key: &'a CacheKey) -> Self {
        owners.insert(key.clone(), thread::current().id());
        Self {
            owners,
            key,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.owners.remove(self.key);
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Wraps components in proxies when container-supplied advisors apply.
pub struct AutoProxyEngine {
    /// Supplies candidate advisors.
    advisor_source: Arc<dyn AdvisorSource>,
    /// Settings applied to every proxy built.
    settings: ProxySettings,
    /// Classification options.
    options: AutoProxyOptions,
    /// Registry handed to every configuration.
    registry: Arc<AdapterRegistry>,
    /// Builds proxies.
    constructor: Arc<dyn ProxyConstructor>,
    /// Custom target sources, first match wins.
    target_source_creators: Vec<Arc<dyn TargetSourceCreator>>,
    /// Verdict per identity.
    eligibility: DashMap<CacheKey, Slot>,
    /// Runtime class of the proxy built per identity.
    proxy_types: DashMap<CacheKey, ClassRef>,
    /// Thread filling each slot still being classified.
    in_flight: DashMap<CacheKey, ThreadId>,
    /// Classifications performed.
    classifications: AtomicUsize,
}

impl AutoProxyEngine {
    /// Engine with default settings and the default proxy constructor.
    #[must_use]
    pub fn new(advisor_source: Arc<dyn AdvisorSource>) -> Self {
        Self {
            advisor_source,
            settings: ProxySettings::default(),
            options: AutoProxyOptions::default(),
            registry: Arc::new(AdapterRegistry::default()),
            constructor: Arc::new(DefaultProxyConstructor),
            target_source_creators: Vec::new(),
            eligibility: DashMap::new(),
            proxy_types: DashMap::new(),
            in_flight: DashMap::new(),
            classifications: AtomicUsize::new(0),
        }
    }

    /// Applies proxy settings to every proxy built.
    #[must_use]
    pub fn with_settings(mut self, settings: ProxySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Applies classification options.
    #[must_use]
    pub fn with_options(mut self, options: AutoProxyOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses another adapter registry.
    #[must_use]
    pub fn with_adapter_registry(mut self, registry: Arc<AdapterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Uses another proxy constructor.
    #[must_use]
    pub fn with_constructor(mut self, constructor: Arc<dyn ProxyConstructor>) -> Self {
        self.constructor = constructor;
        self
    }

    /// Adds a custom target source creator.
    #[must_use]
    pub fn with_target_source_creator(mut self, creator: Arc<dyn TargetSourceCreator>) -> Self {
        self.target_source_creators.push(creator);
        self
    }

    /// Returns how many classifications have run.
    #[must_use]
    pub fn classifications(&self) -> usize {
        self.classifications.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Entry Points
    // ------------------------------------------------------------------------

    /// Returns a proxy for `instance` when advisors apply, else `instance` itself.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration or the proxy cannot be built.
    pub fn wrap_if_necessary(&self, bean_name: Option<&str>, instance: ObjectRef) -> Result<ObjectRef, ConfigError> {
        let class = Arc::clone(instance.class());
        let key = CacheKey::of(bean_name, &class);
        let Eligibility::Eligible {
            advisors,
            proxy_target_class,
            target_source,
        } = self.classify(&key, bean_name, &class)
        else {
            return Ok(instance);
        };

        let target_source: Arc<dyn TargetSource> = match target_source {
            Some(custom) => custom,
            None => Arc::new(SingletonTargetSource::new(instance)),
        };
        let mut config = AdvisedConfig::new(target_source)
            .with_settings(ProxySettings {
                proxy_target_class,
                frozen: false,
                ..self.settings
            })
            .with_adapter_registry(Arc::clone(&self.registry))
            .with_pre_filtered(true);
        if let Some(bean_name) = bean_name {
            config = config.with_bean_name(bean_name);
        }
        if !proxy_target_class {
            for interface in class.all_interfaces() {
                config.add_interface(&interface)?;
            }
        }
        for advisor in advisors {
            config.add_advisor(advisor)?;
        }
        config.set_frozen(self.settings.frozen);

        let proxy = self.constructor.create(Arc::new(config))?;
        self.proxy_types.insert(key, Arc::clone(proxy.class()));
        Ok(proxy)
    }

    /// Returns true when a component of `class` named `bean_name` would be proxied.
    #[must_use]
    pub fn is_eligible(&self, bean_name: Option<&str>, class: &ClassRef) -> bool {
        let key = CacheKey::of(bean_name, class);
        matches!(self.classify(&key, bean_name, class), Eligibility::Eligible { .. })
    }

    /// Returns the runtime class of the proxy built for this identity, if any.
    #[must_use]
    pub fn predict_proxy_type(&self, bean_name: Option<&str>, class: &ClassRef) -> Option<ClassRef> {
        let key = CacheKey::of(bean_name, class);
        self.proxy_types.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    fn classify(&self, key: &CacheKey, bean_name: Option<&str>, class: &ClassRef) -> Eligibility {
        if let Some(verdict) = self.eligibility.get(key).and_then(|slot| slot.value().get().cloned()) {
            return verdict;
        }
        if ClassificationGuard::is_active(key) {
            tracing::debug!(
                target: "crosscut::autoproxy",
                class = class.name(),
                bean = bean_name.unwrap_or_default(),
                "re-entrant classification, leaving component unproxied"
            );
            return Eligibility::Ineligible;
        }
        if ClassificationGuard::is_nested() && self.is_in_flight_elsewhere(key) {
            tracing::debug!(
                target: "crosscut::autoproxy",
                class = class.name(),
                bean = bean_name.unwrap_or_default(),
                "identity is being classified on another thread, answering without caching"
            );
            let _guard = ClassificationGuard::enter(key);
            let _creation = bean_name.map(ProxyCreationContext::enter);
            self.classifications.fetch_add(1, Ordering::AcqRel);
            return self.compute(bean_name, class);
        }
        let slot = Arc::clone(self.eligibility.entry(key.clone()).or_default().value());
        slot.get_or_init(|| {
            let _guard = ClassificationGuard::enter(key);
            let _in_flight = InFlight::enter(&self.in_flight, key);
            let _creation = bean_name.map(ProxyCreationContext::enter);
            self.classifications.fetch_add(1, Ordering::AcqRel);
            self.compute(bean_name, class)
        })
        .clone()
    }

    fn is_in_flight_elsewhere(&self, key: &CacheKey) -> bool {
        let current = thread::current().id();
        self.in_flight.get(key).is_some_and(|owner| *owner.value() != current)
    }

    fn compute(&self, bean_name: Option<&str>, class: &ClassRef) -> Eligibility {
        if let Some(reason) = self.skip_reason(bean_name, class) {
            tracing::trace!(
                target: "crosscut::autoproxy",
                class = class.name(),
                bean = bean_name.unwrap_or_default(),
                reason,
                "component skipped"
            );
            return Eligibility::Ineligible;
        }

        let candidates = self.advisor_source.candidate_advisors();
        let mut advisors = find_applicable_advisors(&candidates, class);
        advisors.sort_by_key(|advisor| advisor.order());
        let target_source = self.custom_target_source(bean_name, class);

        if advisors.is_empty() && target_source.is_none() {
            tracing::trace!(
                target: "crosscut::autoproxy",
                class = class.name(),
                candidates = candidates.len(),
                "no applicable advisors"
            );
            return Eligibility::Ineligible;
        }

        let proxy_target_class = self.settings.proxy_target_class || !self.has_reasonable_interface(class);
        tracing::trace!(
            target: "crosscut::autoproxy",
            class = class.name(),
            advisors = advisors.len(),
            proxy_target_class,
            "component eligible"
        );
        Eligibility::Eligible {
            advisors,
            proxy_target_class,
            target_source,
        }
    }

    fn skip_reason(&self, bean_name: Option<&str>, class: &ClassInfo) -> Option<&'static str> {
        if INFRASTRUCTURE_TYPES.iter().any(|name| class.is_subtype_of_name(name))
            || class.has_annotation(INFRASTRUCTURE_ANNOTATION)
        {
            return Some("infrastructure");
        }
        let bean_name = bean_name?;
        if self.advisor_source.is_aspect(bean_name) {
            return Some("aspect");
        }
        let original = bean_name
            .strip_suffix(ORIGINAL_INSTANCE_SUFFIX)
            .is_some_and(|stripped| stripped == class.name());
        (self.options.skip_original_instances && original).then_some("original instance")
    }

    fn custom_target_source(&self, bean_name: Option<&str>, class: &ClassRef) -> Option<Arc<dyn TargetSource>> {
        self.target_source_creators.iter().find_map(|creator| creator.target_source(class, bean_name))
    }

    fn has_reasonable_interface(&self, class: &ClassInfo) -> bool {
        class
            .all_interfaces()
            .iter()
            .any(|iface| !self.options.is_callback_interface(iface.name()) && !iface.all_methods().is_empty())
    }
}

impl fmt::Debug for AutoProxyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoProxyEngine")
            .field("settings", &self.settings)
            .field("options", &self.options)
            .field("target_source_creators", &self.target_source_creators.len())
            .field("classified", &self.eligibility.len())
            .finish_non_exhaustive()
    }
}
