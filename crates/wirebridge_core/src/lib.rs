//! Startup wiring between a component registry and a host runtime.
//! Components opt into host extension points through their capabilities; the
//! bridge discovers them and registers each with the right host slot.

pub mod bridge;
pub mod component;
pub mod config;
pub mod host;
pub mod logging;
pub mod registry;

pub use bridge::{
    Bridge, BridgeError, ConfigurationError, WiringPass, WiringSummary,
    CONFIGURATION_COMPONENT_NAME, ENVIRONMENT_COMPONENT_NAME,
};
pub use component::capability::{
    Capability, HealthCheck, HealthStatus, InjectionResolver, LifeCycle, LifecycleError, Managed,
    Marker, ServerInfo, ServerLifecycleListener, Task, TaskError, TaskParameters,
};
pub use component::definition::{Component, ComponentBuilder};
pub use config::{BridgeOptions, LoggingOptions};
pub use host::{
    Environment, EnvironmentHandle, Handler, HandlerSlot, HealthCheckSlot, Host, HostError,
    HostResult, LifecycleSlot, ManagedObject, Registration, TaskSlot,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use registry::{ComponentContext, Registry, RegistryError, RegistryResult, RegistryState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
