//! Capability contracts a component type may satisfy.
//!
//! # Responsibility
//! - Name every host extension point a component can opt into.
//! - Define the behavioral traits behind each capability.
//!
//! # Invariants
//! - Capability and marker ids are stable lowercase strings.
//! - Every capability trait is `Send + Sync` so views can be shared with the host.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Behavioral capability a component can be discovered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Narrow start/stop contract.
    Managed,
    /// Broader lifecycle contract with running-state inspection.
    LifeCycle,
    ServerLifecycleListener,
    Task,
    HealthCheck,
    InjectionResolver,
}

impl Capability {
    /// Stable string id used in logs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::LifeCycle => "life_cycle",
            Self::ServerLifecycleListener => "server_lifecycle_listener",
            Self::Task => "task",
            Self::HealthCheck => "health_check",
            Self::InjectionResolver => "injection_resolver",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag attached to a component instead of a behavioral trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Marker {
    /// Handler-registry provider (filters, mappers, readers/writers).
    Provider,
    /// Routed resource; the component carries a route template.
    Path,
}

impl Marker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Path => "path",
        }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object with a start/stop lifecycle bound to the host's lifecycle.
pub trait Managed: Send + Sync {
    fn start(&self) -> Result<(), LifecycleError>;
    fn stop(&self) -> Result<(), LifecycleError>;
}

/// Generic lifecycle component; broader than [`Managed`].
pub trait LifeCycle: Send + Sync {
    fn start(&self) -> Result<(), LifecycleError>;
    fn stop(&self) -> Result<(), LifecycleError>;
    fn is_running(&self) -> bool;
}

/// Notified once the host server has started.
pub trait ServerLifecycleListener: Send + Sync {
    fn server_started(&self, server: &ServerInfo);
}

/// Query parameters handed to an admin task.
pub type TaskParameters = BTreeMap<String, Vec<String>>;

/// Operator-triggered admin task.
pub trait Task: Send + Sync {
    /// Name the task is exposed under. Must not be empty.
    fn name(&self) -> &str;

    /// Runs the task and returns its textual output.
    fn execute(&self, parameters: &TaskParameters) -> Result<String, TaskError>;
}

pub trait HealthCheck: Send + Sync {
    fn check(&self) -> HealthStatus;
}

/// Handler-registry extension that resolves values for an injection marker.
pub trait InjectionResolver: Send + Sync {
    /// Injection marker this resolver answers for.
    fn annotation(&self) -> &str;

    fn resolve(&self, target: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Result of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
        }
    }
}

/// Server snapshot passed to lifecycle listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

/// Start/stop failure reported by a lifecycle component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleError {
    pub component: String,
    pub message: String,
}

impl LifecycleError {
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "lifecycle failure in `{}`: {}", self.component, self.message)
    }
}

impl Error for LifecycleError {}

/// Admin task failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub task: String,
    pub message: String,
}

impl TaskError {
    pub fn new(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            message: message.into(),
        }
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "task `{}` failed: {}", self.task, self.message)
    }
}

impl Error for TaskError {}
