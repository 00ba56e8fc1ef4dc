//! Registry-to-host discovery and wiring.
//!
//! # Responsibility
//! - Optionally expose the run configuration and environment handle as
//!   ambient registry singletons, then activate the registry.
//! - Discover components per capability or marker and hand each match to
//!   exactly one host slot, in a fixed pass order.
//!
//! # Invariants
//! - Ambient insertions happen before activation, never after.
//! - Each pass queries the registry once and registers each match once.
//! - The environment singleton never reaches the lifecycle manager through
//!   the generic lifecycle or listener passes.
//! - Errors abort the remaining passes; nothing already registered is undone.

use crate::bridge::error::{BridgeError, ConfigurationError};
use crate::component::capability::{Capability, Marker};
use crate::component::definition::Component;
use crate::config::BridgeOptions;
use crate::host::{Handler, Host, ManagedObject, Registration};
use crate::registry::{Registry, RegistryError, RegistryResult};
use log::{debug, info, warn};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Reserved registry name of the run configuration singleton.
pub const CONFIGURATION_COMPONENT_NAME: &str = "dw";
/// Reserved registry name of the environment handle singleton.
pub const ENVIRONMENT_COMPONENT_NAME: &str = "dwEnv";

/// One discovery-and-registration pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WiringPass {
    Managed,
    LifeCycle,
    ServerLifecycleListeners,
    Tasks,
    HealthChecks,
    InjectionResolvers,
    Providers,
    Resources,
}

enum Selector {
    Capability(Capability),
    Marker(Marker),
}

impl WiringPass {
    pub const ALL: [WiringPass; 8] = [
        WiringPass::Managed,
        WiringPass::LifeCycle,
        WiringPass::ServerLifecycleListeners,
        WiringPass::Tasks,
        WiringPass::HealthChecks,
        WiringPass::InjectionResolvers,
        WiringPass::Providers,
        WiringPass::Resources,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::LifeCycle => "life_cycle",
            Self::ServerLifecycleListeners => "server_lifecycle_listener",
            Self::Tasks => "task",
            Self::HealthChecks => "health_check",
            Self::InjectionResolvers => "injection_resolver",
            Self::Providers => "provider",
            Self::Resources => "resource",
        }
    }

    fn selector(self) -> Selector {
        match self {
            Self::Managed => Selector::Capability(Capability::Managed),
            Self::LifeCycle => Selector::Capability(Capability::LifeCycle),
            Self::ServerLifecycleListeners => {
                Selector::Capability(Capability::ServerLifecycleListener)
            }
            Self::Tasks => Selector::Capability(Capability::Task),
            Self::HealthChecks => Selector::Capability(Capability::HealthCheck),
            Self::InjectionResolvers => Selector::Capability(Capability::InjectionResolver),
            Self::Providers => Selector::Marker(Marker::Provider),
            Self::Resources => Selector::Marker(Marker::Path),
        }
    }

    // The environment is already host-managed.
    fn skips_ambient(self) -> bool {
        matches!(self, Self::LifeCycle | Self::ServerLifecycleListeners)
    }
}

impl Display for WiringPass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host calls made per pass during one `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiringSummary {
    counts: BTreeMap<WiringPass, usize>,
}

impl WiringSummary {
    pub fn count(&self, pass: WiringPass) -> usize {
        self.counts.get(&pass).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Per-pass counts in execution order, zero counts included.
    pub fn passes(&self) -> impl Iterator<Item = (WiringPass, usize)> + '_ {
        WiringPass::ALL
            .into_iter()
            .map(move |pass| (pass, self.count(pass)))
    }

    fn record(&mut self, pass: WiringPass, count: usize) {
        self.counts.insert(pass, count);
    }
}

/// Wires a component registry into a host's extension slots.
///
/// `run` is meant to be called exactly once per process; a second call
/// re-registers every match again.
#[derive(Debug)]
pub struct Bridge<R> {
    registry: R,
    register_configuration: bool,
    register_environment: bool,
}

impl<R: Registry> Bridge<R> {
    /// Creates a bridge that inserts no ambient values.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            register_configuration: false,
            register_environment: false,
        }
    }

    /// Creates a bridge with explicit ambient-value switches.
    ///
    /// # Errors
    /// - `ConfigurationError::RegistryActive` when either switch is on and the
    ///   registry is already active.
    pub fn with_flags(
        registry: R,
        register_configuration: bool,
        register_environment: bool,
    ) -> Result<Self, ConfigurationError> {
        if registry.is_active() {
            if register_configuration {
                return Err(ConfigurationError::RegistryActive {
                    component: CONFIGURATION_COMPONENT_NAME,
                });
            }
            if register_environment {
                return Err(ConfigurationError::RegistryActive {
                    component: ENVIRONMENT_COMPONENT_NAME,
                });
            }
        }

        Ok(Self {
            registry,
            register_configuration,
            register_environment,
        })
    }

    pub fn with_options(registry: R, options: &BridgeOptions) -> Result<Self, ConfigurationError> {
        Self::with_flags(
            registry,
            options.register_configuration,
            options.register_environment,
        )
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn into_registry(self) -> R {
        self.registry
    }

    pub fn registers_configuration(&self) -> bool {
        self.register_configuration
    }

    pub fn registers_environment(&self) -> bool {
        self.register_environment
    }

    /// Takes effect at the next `run`; the registry state is checked there.
    pub fn set_register_configuration(&mut self, register_configuration: bool) {
        self.register_configuration = register_configuration;
    }

    /// Takes effect at the next `run`; the registry state is checked there.
    pub fn set_register_environment(&mut self, register_environment: bool) {
        self.register_environment = register_environment;
    }

    /// Inserts ambient values, activates the registry and runs every pass.
    ///
    /// # Errors
    /// - `BridgeError::Configuration` when an ambient insertion is requested
    ///   on an active registry.
    /// - `BridgeError::Registry` / `BridgeError::Host` carrying the first
    ///   collaborator failure; later passes do not run.
    pub fn run<C, H>(
        &mut self,
        configuration: Arc<C>,
        host: &mut H,
    ) -> Result<WiringSummary, BridgeError>
    where
        C: Any + Send + Sync,
        H: Host + ?Sized,
    {
        if self.register_configuration {
            self.ensure_inactive(CONFIGURATION_COMPONENT_NAME)?;
            self.registry.insert_singleton(
                Component::singleton(CONFIGURATION_COMPONENT_NAME, configuration)
                    .into_ambient(),
            )?;
            info!(
                "event=ambient_registered module=bridge name={} type={}",
                CONFIGURATION_COMPONENT_NAME,
                type_name::<C>()
            );
        }

        if self.register_environment {
            self.ensure_inactive(ENVIRONMENT_COMPONENT_NAME)?;
            let environment = host
                .environment_component(ENVIRONMENT_COMPONENT_NAME)
                .into_ambient();
            let environment_type = environment.type_name();
            self.registry.insert_singleton(environment)?;
            info!(
                "event=ambient_registered module=bridge name={} type={}",
                ENVIRONMENT_COMPONENT_NAME, environment_type
            );
        }

        if !self.registry.is_active() {
            self.registry.activate()?;
        }

        let mut summary = WiringSummary::default();
        for pass in WiringPass::ALL {
            let count = self.run_pass(pass, host)?;
            summary.record(pass, count);
        }
        info!(
            "event=bridge_run module=bridge status=ok registrations={}",
            summary.total()
        );
        Ok(summary)
    }

    fn ensure_inactive(&self, component: &'static str) -> Result<(), ConfigurationError> {
        if self.registry.is_active() {
            return Err(ConfigurationError::RegistryActive { component });
        }
        Ok(())
    }

    fn run_pass<H>(&self, pass: WiringPass, host: &mut H) -> Result<usize, BridgeError>
    where
        H: Host + ?Sized,
    {
        let matches = match pass.selector() {
            Selector::Capability(capability) => self.registry.components_with(capability)?,
            Selector::Marker(marker) => self.registry.components_marked(marker)?,
        };

        let mut registered = 0;
        for component in matches {
            if pass.skips_ambient() && is_ambient(&component) {
                debug!(
                    "event=component_skipped module=bridge pass={} component={}",
                    pass,
                    component.name()
                );
                continue;
            }
            wire(pass, &component, host)?;
            info!(
                "event=component_registered module=bridge pass={} component={} type={}",
                pass,
                component.name(),
                component.type_name()
            );
            registered += 1;
        }
        Ok(registered)
    }
}

// Only the bridge can tag a component ambient; the name check covers a
// handle inserted into the registry by other means.
fn is_ambient(component: &Component) -> bool {
    component.is_ambient() || component.name() == ENVIRONMENT_COMPONENT_NAME
}

/// Makes the host call for one pass.
///
/// A capability match without the matching view is a registry contract
/// breach and fails the run.
fn wire<H>(pass: WiringPass, component: &Component, host: &mut H) -> Result<(), BridgeError>
where
    H: Host + ?Sized,
{
    match pass {
        WiringPass::Managed => {
            let value = require_view(component, Capability::Managed, component.managed())?;
            host.lifecycle()
                .manage(ManagedObject::Managed(Registration::new(component, value)))?;
        }
        WiringPass::LifeCycle => {
            let value = require_view(component, Capability::LifeCycle, component.life_cycle())?;
            host.lifecycle()
                .manage(ManagedObject::LifeCycle(Registration::new(component, value)))?;
        }
        WiringPass::ServerLifecycleListeners => {
            let value = require_view(
                component,
                Capability::ServerLifecycleListener,
                component.server_lifecycle_listener(),
            )?;
            host.lifecycle()
                .add_server_lifecycle_listener(Registration::new(component, value))?;
        }
        WiringPass::Tasks => {
            let value = require_view(component, Capability::Task, component.task())?;
            host.admin().add_task(Registration::new(component, value))?;
        }
        WiringPass::HealthChecks => {
            let value =
                require_view(component, Capability::HealthCheck, component.health_check())?;
            host.health_checks()
                .register(component.name(), Registration::new(component, value))?;
        }
        WiringPass::InjectionResolvers => {
            let value = require_view(
                component,
                Capability::InjectionResolver,
                component.injection_resolver(),
            )?;
            host.handlers()
                .register(Handler::InjectionResolver(Registration::new(component, value)))?;
        }
        WiringPass::Providers => {
            host.handlers().register(Handler::Provider(Registration::new(
                component,
                component.instance(),
            )))?;
        }
        WiringPass::Resources => {
            host.handlers().register(Handler::Resource {
                route: component.route().unwrap_or_default().to_string(),
                registration: Registration::new(component, component.instance()),
            })?;
        }
    }
    Ok(())
}

fn require_view<T: ?Sized>(
    component: &Component,
    capability: Capability,
    view: Option<Arc<T>>,
) -> RegistryResult<Arc<T>> {
    view.ok_or_else(|| {
        warn!(
            "event=capability_mismatch module=bridge capability={} component={} type={}",
            capability,
            component.name(),
            component.type_name()
        );
        RegistryError::CapabilityMismatch {
            name: component.name().to_string(),
            capability,
        }
    })
}
