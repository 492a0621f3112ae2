// crates/crosscut-core/src/runtime/proxy.rs
// ============================================================================
// Module: Dispatch Proxy
// Description: Default proxy constructor over the runtime type model.
// Purpose: Turn an advised configuration into a callable managed object.
// Dependencies: crate::{core, interfaces, runtime}, crosscut_meta, tracing
// ============================================================================

//! ## Overview
//! A [`DispatchProxy`] is a [`Managed`] object with a synthesized runtime
//! class. Interface-based proxies implement the configured interfaces only;
//! class-based proxies extend the target class and also implement the
//! configured interfaces. Every call goes through [`DispatchProxy::invoke`]:
//!
//! - interface proxies reject methods outside their interfaces;
//! - class proxies call `final` methods straight on the target;
//! - an empty chain calls the target directly, otherwise a
//!   [`MethodInvocation`] runs the chain;
//! - a target returning itself returns the proxy instead, when the proxy
//!   fits the declared return type;
//! - targets from non-static sources are released after the call.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crosscut_meta::ClassBuilder;
use crosscut_meta::ClassRef;
use crosscut_meta::DispatchError;
use crosscut_meta::Managed;
use crosscut_meta::MethodInfo;
use crosscut_meta::MethodRef;
use crosscut_meta::ObjectRef;
use crosscut_meta::TypeLoader;
use crosscut_meta::Value;
use crosscut_meta::invoke_reflectively;

use crate::core::ConfigError;
use crate::core::InvocationError;
use crate::core::TargetSourceError;
use crate::interfaces::ProxyConstructor;
use crate::runtime::advised::AdvisedConfig;
use crate::runtime::invocation::MethodInvocation;

/// Distinguishes synthesized proxy class names.
static PROXY_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// SECTION: Current Proxy
// ============================================================================

thread_local! {
    /// Proxies exposed on this thread, innermost last.
    static CURRENT_PROXY: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
}

/// Returns the proxy handling the innermost exposing call on this thread.
#[must_use]
pub fn current_proxy() -> Option<Value> {
    CURRENT_PROXY.with(|stack| stack.borrow().last().cloned())
}

/// Restores the previous current proxy when dropped.
struct ProxyExposure {
    /// Thread-bound.
    _not_send: PhantomData<*const ()>,
}

impl ProxyExposure {
    fn enter(proxy: Value) -> Self {
        CURRENT_PROXY.with(|stack| stack.borrow_mut().push(proxy));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for ProxyExposure {
    fn drop(&mut self) {
        CURRENT_PROXY.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// ============================================================================
// SECTION: Proxy Object
// ============================================================================

/// How the proxy class was synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    /// Implements the configured interfaces only.
    Interface,
    /// Extends the target class.
    Class,
}

impl ProxyKind {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Class => "class",
        }
    }
}

/// Proxy object produced by [`DefaultProxyConstructor`].
pub struct DispatchProxy {
    /// Synthesized runtime class.
    class: ClassRef,
    /// Configuration driving every call.
    config: Arc<AdvisedConfig>,
    /// Construction strategy.
    kind: ProxyKind,
    /// Handle to this proxy, for `this` and "return this".
    this: Weak<Self>,
    /// Loader holding the synthesized class.
    _loader: Arc<TypeLoader>,
}

impl DispatchProxy {
    /// Builds a proxy for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FinalClass`] for class-based proxies of final
    /// classes, [`ConfigError::MissingTarget`] when there is neither a target
    /// class nor an interface, and [`ConfigError::TypeModel`] when the proxy
    /// class cannot be defined.
    pub fn create(config: Arc<AdvisedConfig>) -> Result<ObjectRef, ConfigError> {
        let settings = config.settings();
        let interfaces = config.interfaces();
        let target_class = config.target_class();
        let class_based = settings.proxy_target_class || settings.optimize || interfaces.is_empty();

        let (kind, base) = match (&target_class, class_based) {
            (Some(target), true) if !target.is_interface() => {
                if target.is_final() {
                    return Err(ConfigError::FinalClass(target.name().to_string()));
                }
                (ProxyKind::Class, Some(Arc::clone(target)))
            }
            (None, _) if interfaces.is_empty() => return Err(ConfigError::MissingTarget),
            _ => (ProxyKind::Interface, None),
        };

        let mut interfaces = interfaces;
        if let Some(target) = target_class.as_ref().filter(|target| target.is_interface())
            && !interfaces.iter().any(|iface| Arc::ptr_eq(iface, target))
        {
            interfaces.push(Arc::clone(target));
        }
        let loader = base
            .as_ref()
            .or_else(|| interfaces.first())
            .and_then(|class| class.loader())
            .unwrap_or_else(TypeLoader::system);
        let sequence = PROXY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let base_name = base.as_ref().or_else(|| interfaces.first()).map_or("crosscut.Proxy", |class| class.name());
        let mut builder = ClassBuilder::class(format!("{base_name}$$Proxy{sequence}")).final_class();
        if let Some(base) = &base {
            builder = builder.extends(base);
        }
        for interface in &interfaces {
            builder = builder.implements(interface);
        }
        let class = builder.define(&loader)?;

        tracing::debug!(
            target: "crosscut::proxy",
            proxy_class = class.name(),
            kind = kind.as_str(),
            interfaces = interfaces.len(),
            advisors = config.advisors().len(),
            "created proxy"
        );

        let proxy: Arc<Self> = Arc::new_cyclic(|this| Self {
            class,
            config,
            kind,
            this: this.clone(),
            _loader: loader,
        });
        Ok(proxy)
    }

    /// Returns the configuration, unless the proxy is opaque.
    #[must_use]
    pub fn advised(&self) -> Option<Arc<AdvisedConfig>> {
        if self.config.settings().opaque { None } else { Some(Arc::clone(&self.config)) }
    }

    /// Returns the configuration of `object` when it is a non-opaque proxy.
    #[must_use]
    pub fn advised_of(object: &ObjectRef) -> Option<Arc<AdvisedConfig>> {
        object.as_any().downcast_ref::<Self>().and_then(Self::advised)
    }

    /// Returns true when `object` is a proxy built by this constructor.
    #[must_use]
    pub fn is_proxy(object: &ObjectRef) -> bool {
        object.as_any().is::<Self>()
    }

    /// Returns the construction strategy.
    #[must_use]
    pub const fn kind(&self) -> ProxyKind {
        self.kind
    }

    fn proxy_value(&self) -> Value {
        self.this.upgrade().map_or(Value::Null, |this| {
            let object: ObjectRef = this;
            Value::Object(object)
        })
    }

    /// Handles one call.
    ///
    /// # Errors
    ///
    /// Returns the target's error unchanged, or an infrastructure error when
    /// the call cannot be routed.
    pub fn invoke(&self, method: &MethodInfo, args: &[Value]) -> Result<Value, InvocationError> {
        if self.kind == ProxyKind::Interface && !self.class.is_subtype_of_name(method.declaring()) {
            return Err(InvocationError::Reflection(DispatchError::NoSuchMethod {
                class: self.class.name().to_string(),
                method: method.signature(),
            }));
        }
        let method: MethodRef =
            self.class.find_method(method.name(), method.params()).unwrap_or_else(|| Arc::new(method.clone()));
        let proxy = self.proxy_value();
        let _exposure = self.config.settings().expose_proxy.then(|| ProxyExposure::enter(proxy.clone()));

        let source = self.config.target_source();
        let target = source.target()?;
        let outcome = self.invoke_target(&method, args, target.as_ref(), proxy);
        if let Some(target) = &target
            && !source.is_static()
        {
            source.release_target(target)?;
        }
        outcome
    }

    fn invoke_target(
        &self,
        method: &MethodRef,
        args: &[Value],
        target: Option<&ObjectRef>,
        proxy: Value,
    ) -> Result<Value, InvocationError> {
        if self.kind == ProxyKind::Class && method.modifiers().is_final() {
            let target = target.ok_or_else(|| missing_target(method))?;
            return Ok(invoke_reflectively(target, method, args)?);
        }

        let target_class = target
            .map(|object| Arc::clone(object.class()))
            .or_else(|| self.config.target_class())
            .unwrap_or_else(|| Arc::clone(&self.class));
        let chain = self.config.chain_for(method, &target_class)?;

        let result = if chain.is_empty() {
            let target = target.ok_or_else(|| missing_target(method))?;
            invoke_reflectively(target, method, args)?
        } else {
            MethodInvocation::new(proxy.clone(), target.cloned(), Arc::clone(method), target_class, args.to_vec(), chain)
                .with_bean_name(self.config.bean_name().map(str::to_string))
                .proceed()?
        };

        match (&result, target) {
            (Value::Object(returned), Some(target))
                if std::ptr::addr_eq(Arc::as_ptr(returned), Arc::as_ptr(target))
                    && self.class.is_subtype_of_name(method.return_type()) =>
            {
                Ok(proxy)
            }
            _ => Ok(result),
        }
    }
}

fn missing_target(method: &MethodInfo) -> InvocationError {
    InvocationError::TargetSource(TargetSourceError::Unavailable(format!(
        "no target available for `{}`",
        method.signature()
    )))
}

impl Managed for DispatchProxy {
    fn class(&self) -> &ClassRef {
        &self.class
    }

    fn dispatch(&self, method: &MethodInfo, args: &[Value]) -> Result<Value, DispatchError> {
        self.invoke(method, args).map_err(DispatchError::from)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for DispatchProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchProxy")
            .field("class", &self.class.name())
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Constructor
// ============================================================================

/// Default [`ProxyConstructor`], producing [`DispatchProxy`] objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProxyConstructor;

impl ProxyConstructor for DefaultProxyConstructor {
    fn create(&self, config: Arc<AdvisedConfig>) -> Result<ObjectRef, ConfigError> {
        DispatchProxy::create(config)
    }
}
