//! Host runtime registration slots.
//!
//! # Responsibility
//! - Define the slots the bridge feeds: lifecycle, admin tasks, health checks
//!   and the handler registry.
//! - Carry each registration with the component name and concrete type it
//!   came from.
//!
//! # Invariants
//! - Slot calls are synchronous and fail fast through `HostResult`.
//! - The handler slot is the single entry point for resolvers, providers and
//!   resources.

use crate::component::capability::{
    HealthCheck, InjectionResolver, LifeCycle, LifecycleError, Managed,
    ServerLifecycleListener, Task, TaskError,
};
use crate::component::definition::Component;
use std::any::Any;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

pub mod environment;

pub use environment::{
    AdminEnvironment, Environment, EnvironmentHandle, HandlerEnvironment, HealthCheckRegistry,
    LifecycleEnvironment,
};

pub type HostResult<T> = Result<T, HostError>;

/// Runtime environment exposing registration slots.
pub trait Host {
    /// Packages the environment handle as a component under `name`.
    fn environment_component(&self, name: &str) -> Component;

    fn lifecycle(&mut self) -> &mut dyn LifecycleSlot;

    fn admin(&mut self) -> &mut dyn TaskSlot;

    fn health_checks(&mut self) -> &mut dyn HealthCheckSlot;

    fn handlers(&mut self) -> &mut dyn HandlerSlot;
}

pub trait LifecycleSlot {
    fn manage(&mut self, object: ManagedObject) -> HostResult<()>;

    fn add_server_lifecycle_listener(
        &mut self,
        listener: Registration<dyn ServerLifecycleListener>,
    ) -> HostResult<()>;
}

pub trait TaskSlot {
    fn add_task(&mut self, task: Registration<dyn Task>) -> HostResult<()>;
}

pub trait HealthCheckSlot {
    fn register(&mut self, name: &str, check: Registration<dyn HealthCheck>) -> HostResult<()>;
}

pub trait HandlerSlot {
    fn register(&mut self, handler: Handler) -> HostResult<()>;
}

/// One value handed to a host slot, tagged with its origin.
pub struct Registration<T: ?Sized> {
    /// Registry name of the source component.
    pub component: String,
    /// Concrete type name of the source component.
    pub type_name: &'static str,
    pub value: Arc<T>,
}

impl<T: ?Sized> Registration<T> {
    pub fn new(component: &Component, value: Arc<T>) -> Self {
        Self {
            component: component.name().to_string(),
            type_name: component.type_name(),
            value,
        }
    }
}

impl<T: ?Sized> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            component: self.component.clone(),
            type_name: self.type_name,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: ?Sized> Debug for Registration<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("component", &self.component)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Object handed to the lifecycle manager.
#[derive(Debug, Clone)]
pub enum ManagedObject {
    Managed(Registration<dyn Managed>),
    LifeCycle(Registration<dyn LifeCycle>),
}

impl ManagedObject {
    pub fn component(&self) -> &str {
        match self {
            Self::Managed(registration) => &registration.component,
            Self::LifeCycle(registration) => &registration.component,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Managed(registration) => registration.type_name,
            Self::LifeCycle(registration) => registration.type_name,
        }
    }

    pub fn start(&self) -> Result<(), LifecycleError> {
        match self {
            Self::Managed(registration) => registration.value.start(),
            Self::LifeCycle(registration) => registration.value.start(),
        }
    }

    pub fn stop(&self) -> Result<(), LifecycleError> {
        match self {
            Self::Managed(registration) => registration.value.stop(),
            Self::LifeCycle(registration) => registration.value.stop(),
        }
    }
}

/// Object handed to the handler registry.
#[derive(Debug, Clone)]
pub enum Handler {
    InjectionResolver(Registration<dyn InjectionResolver>),
    Provider(Registration<dyn Any + Send + Sync>),
    Resource {
        route: String,
        registration: Registration<dyn Any + Send + Sync>,
    },
}

impl Handler {
    pub fn component(&self) -> &str {
        match self {
            Self::InjectionResolver(registration) => &registration.component,
            Self::Provider(registration) => &registration.component,
            Self::Resource { registration, .. } => &registration.component,
        }
    }

    /// True for entries that belong on the provider list.
    pub fn is_provider(&self) -> bool {
        !matches!(self, Self::Resource { .. })
    }
}

/// Host slot registration and runtime errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// `manage` called after the lifecycle already started.
    LifecycleStarted(String),
    InvalidTaskName(String),
    UnknownTask(String),
    Lifecycle(LifecycleError),
    Task(TaskError),
    /// Generic rejection from a third-party host slot.
    Rejected { slot: &'static str, message: String },
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LifecycleStarted(component) => write!(
                f,
                "lifecycle already started; cannot manage component `{component}`"
            ),
            Self::InvalidTaskName(component) => {
                write!(f, "task from component `{component}` has an empty name")
            }
            Self::UnknownTask(name) => write!(f, "task not found: {name}"),
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "{err}"),
            Self::Rejected { slot, message } => {
                write!(f, "host slot `{slot}` rejected registration: {message}")
            }
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lifecycle(err) => Some(err),
            Self::Task(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LifecycleError> for HostError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

impl From<TaskError> for HostError {
    fn from(value: TaskError) -> Self {
        Self::Task(value)
    }
}
