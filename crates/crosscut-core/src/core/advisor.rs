// crates/crosscut-core/src/core/advisor.rs
// ============================================================================
// Module: Advisors
// Description: Bindings of advice to pointcuts, introductions, or everything.
// Purpose: Provide the unit the chain factory and auto-proxy engine reason about.
// Dependencies: crate::{core, interfaces, pointcut}, crosscut_meta
// ============================================================================

//! ## Overview
//! An [`Advisor`] pairs one [`Advice`] with how it applies: everywhere, where
//! a [`Pointcut`] matches, or (for introductions) to every class accepted by
//! a class filter while adding interfaces to the proxy.

use std::fmt;
use std::sync::Arc;

use crosscut_meta::ClassRef;

use crate::core::advice::Advice;
use crate::core::error::ConfigError;
use crate::core::introduction::DelegatingIntroduction;
use crate::interfaces::ClassFilter;
use crate::interfaces::Pointcut;
use crate::pointcut::TrueClassFilter;

/// Shared advisor handle; identity is pointer identity.
pub type AdvisorRef = Arc<Advisor>;

/// Default priority; lower values run first.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// How an advisor selects joinpoints.
#[derive(Clone)]
pub enum AdvisorBinding {
    /// Applies to every method of every class.
    Always,
    /// Applies where the pointcut matches.
    Pointcut(Arc<dyn Pointcut>),
    /// Adds interfaces to classes accepted by the filter.
    Introduction {
        /// Introduced interfaces.
        interfaces: Vec<ClassRef>,
        /// Classes the introduction applies to.
        class_filter: Arc<dyn ClassFilter>,
    },
}

/// Advice plus its applicability.
#[derive(Clone)]
pub struct Advisor {
    /// Behavior to run.
    advice: Advice,
    /// Applicability.
    binding: AdvisorBinding,
    /// Priority used by auto-proxying.
    order: i32,
}

impl Advisor {
    /// Advisor that applies everywhere.
    #[must_use]
    pub const fn unconditional(advice: Advice) -> Self {
        Self {
            advice,
            binding: AdvisorBinding::Always,
            order: LOWEST_PRECEDENCE,
        }
    }

    /// Advisor that applies where `pointcut` matches.
    #[must_use]
    pub fn with_pointcut(pointcut: Arc<dyn Pointcut>, advice: Advice) -> Self {
        Self {
            advice,
            binding: AdvisorBinding::Pointcut(pointcut),
            order: LOWEST_PRECEDENCE,
        }
    }

    /// Introduction advisor applying to every class.
    #[must_use]
    pub fn introduction(introduction: DelegatingIntroduction) -> Self {
        let interfaces = introduction.interfaces().to_vec();
        Self {
            advice: Advice::Around(Arc::new(introduction)),
            binding: AdvisorBinding::Introduction {
                interfaces,
                class_filter: Arc::new(TrueClassFilter),
            },
            order: LOWEST_PRECEDENCE,
        }
    }

    /// Restricts an introduction advisor to classes accepted by `filter`.
    ///
    /// Has no effect on other bindings.
    #[must_use]
    pub fn restricted_to(mut self, filter: Arc<dyn ClassFilter>) -> Self {
        if let AdvisorBinding::Introduction {
            class_filter, ..
        } = &mut self.binding
        {
            *class_filter = filter;
        }
        self
    }

    /// Sets the priority; lower runs first.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Returns the advice.
    #[must_use]
    pub const fn advice(&self) -> &Advice {
        &self.advice
    }

    /// Returns the binding.
    #[must_use]
    pub const fn binding(&self) -> &AdvisorBinding {
        &self.binding
    }

    /// Returns the priority.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// Returns the pointcut for pointcut-bound advisors.
    #[must_use]
    pub fn pointcut(&self) -> Option<&Arc<dyn Pointcut>> {
        match &self.binding {
            AdvisorBinding::Pointcut(pointcut) => Some(pointcut),
            _ => None,
        }
    }

    /// Returns the introduced interfaces, empty for other bindings.
    #[must_use]
    pub fn introduced_interfaces(&self) -> &[ClassRef] {
        match &self.binding {
            AdvisorBinding::Introduction {
                interfaces, ..
            } => interfaces,
            _ => &[],
        }
    }

    /// Returns true for introduction advisors.
    #[must_use]
    pub const fn is_introduction(&self) -> bool {
        matches!(self.binding, AdvisorBinding::Introduction { .. })
    }

    /// Checks the advisor before it joins a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAnInterface`] for introductions of classes and
    /// whatever the pointcut's own validation reports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.binding {
            AdvisorBinding::Always => Ok(()),
            AdvisorBinding::Pointcut(pointcut) => pointcut.validate(),
            AdvisorBinding::Introduction {
                interfaces, ..
            } => match interfaces.iter().find(|iface| !iface.is_interface()) {
                Some(class) => Err(ConfigError::NotAnInterface(class.name().to_string())),
                None => Ok(()),
            },
        }
    }
}

impl fmt::Debug for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = match &self.binding {
            AdvisorBinding::Always => "always".to_string(),
            AdvisorBinding::Pointcut(_) => "pointcut".to_string(),
            AdvisorBinding::Introduction {
                interfaces, ..
            } => {
                let names: Vec<&str> = interfaces.iter().map(|iface| iface.name()).collect();
                format!("introduction[{}]", names.join(", "))
            }
        };
        f.debug_struct("Advisor")
            .field("advice", &self.advice.kind())
            .field("binding", &binding)
            .field("order", &self.order)
            .finish()
    }
}
