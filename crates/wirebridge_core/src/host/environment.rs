//! In-memory host environment.
//!
//! # Responsibility
//! - Record every registration the bridge makes, per slot, in call order.
//! - Drive the registered lifecycle objects, tasks and health checks.
//!
//! # Invariants
//! - Managed objects start in registration order and stop in reverse order.
//! - Nothing can be managed once the lifecycle has started.
//! - Health checks keep the first registration for a name.

use crate::component::capability::{
    HealthCheck, HealthStatus, LifeCycle, LifecycleError, ServerInfo, ServerLifecycleListener,
    Task, TaskParameters,
};
use crate::component::definition::Component;
use crate::host::{
    Handler, HandlerSlot, HealthCheckSlot, Host, HostError, HostResult, LifecycleSlot,
    ManagedObject, Registration, TaskSlot,
};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Live environment handle shared with the registry as an ambient value.
#[derive(Debug)]
pub struct EnvironmentHandle {
    id: Uuid,
    name: String,
    running: AtomicBool,
}

impl EnvironmentHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            running: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LifeCycle for EnvironmentHandle {
    fn start(&self) -> Result<(), LifecycleError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl ServerLifecycleListener for EnvironmentHandle {
    fn server_started(&self, server: &ServerInfo) {
        info!(
            "event=environment_serving module=host environment={} host={} port={}",
            self.name, server.host, server.port
        );
    }
}

/// Lifecycle manager slot.
#[derive(Debug, Default)]
pub struct LifecycleEnvironment {
    managed: Vec<ManagedObject>,
    listeners: Vec<Registration<dyn ServerLifecycleListener>>,
    started: Vec<usize>,
    running: bool,
}

impl LifecycleEnvironment {
    pub fn managed_objects(&self) -> &[ManagedObject] {
        &self.managed
    }

    pub fn server_lifecycle_listeners(&self) -> &[Registration<dyn ServerLifecycleListener>] {
        &self.listeners
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts every managed object, then notifies listeners.
    ///
    /// On failure, objects already started are stopped in reverse order and
    /// the start error is returned.
    pub fn start(&mut self, server: &ServerInfo) -> HostResult<()> {
        if self.running {
            return Ok(());
        }

        for position in 0..self.managed.len() {
            let object = &self.managed[position];
            if let Err(err) = object.start() {
                warn!(
                    "event=lifecycle_start module=host status=error component={} type={}",
                    object.component(),
                    object.type_name()
                );
                self.stop_started();
                return Err(HostError::Lifecycle(err));
            }
            self.started.push(position);
        }
        self.running = true;

        for listener in &self.listeners {
            listener.value.server_started(server);
        }
        info!(
            "event=lifecycle_start module=host status=ok managed={} listeners={}",
            self.managed.len(),
            self.listeners.len()
        );
        Ok(())
    }

    /// Stops every started object in reverse order.
    ///
    /// All objects are attempted; the first failure is returned.
    pub fn stop(&mut self) -> HostResult<()> {
        let first_error = self.stop_started();
        self.running = false;
        match first_error {
            Some(err) => Err(HostError::Lifecycle(err)),
            None => Ok(()),
        }
    }

    fn stop_started(&mut self) -> Option<LifecycleError> {
        let mut first_error = None;
        while let Some(position) = self.started.pop() {
            let object = &self.managed[position];
            if let Err(err) = object.stop() {
                warn!(
                    "event=lifecycle_stop module=host status=error component={} type={}",
                    object.component(),
                    object.type_name()
                );
                first_error.get_or_insert(err);
            }
        }
        first_error
    }
}

impl LifecycleSlot for LifecycleEnvironment {
    fn manage(&mut self, object: ManagedObject) -> HostResult<()> {
        if self.running {
            return Err(HostError::LifecycleStarted(object.component().to_string()));
        }
        self.managed.push(object);
        Ok(())
    }

    fn add_server_lifecycle_listener(
        &mut self,
        listener: Registration<dyn ServerLifecycleListener>,
    ) -> HostResult<()> {
        self.listeners.push(listener);
        Ok(())
    }
}

/// Admin task slot.
#[derive(Debug, Default)]
pub struct AdminEnvironment {
    tasks: BTreeMap<String, Registration<dyn Task>>,
}

impl AdminEnvironment {
    /// Returns sorted task names.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Registration<dyn Task>> {
        self.tasks.get(name)
    }

    pub fn execute(&self, name: &str, parameters: &TaskParameters) -> HostResult<String> {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| HostError::UnknownTask(name.to_string()))?;
        task.value.execute(parameters).map_err(HostError::from)
    }
}

impl TaskSlot for AdminEnvironment {
    fn add_task(&mut self, task: Registration<dyn Task>) -> HostResult<()> {
        let name = task.value.name().trim().to_string();
        if name.is_empty() {
            return Err(HostError::InvalidTaskName(task.component.clone()));
        }
        if let Some(previous) = self.tasks.insert(name.clone(), task) {
            warn!(
                "event=task_replaced module=host task={} previous_component={}",
                name, previous.component
            );
        }
        Ok(())
    }
}

/// Health check slot.
#[derive(Debug, Default)]
pub struct HealthCheckRegistry {
    checks: BTreeMap<String, Registration<dyn HealthCheck>>,
    register_calls: usize,
}

impl HealthCheckRegistry {
    /// Returns sorted health check names.
    pub fn names(&self) -> Vec<String> {
        self.checks.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Registration<dyn HealthCheck>> {
        self.checks.get(name)
    }

    /// Number of `register` calls received, duplicates included.
    pub fn register_calls(&self) -> usize {
        self.register_calls
    }

    pub fn run_health_checks(&self) -> BTreeMap<String, HealthStatus> {
        self.checks
            .iter()
            .map(|(name, check)| (name.clone(), check.value.check()))
            .collect()
    }
}

impl HealthCheckSlot for HealthCheckRegistry {
    fn register(&mut self, name: &str, check: Registration<dyn HealthCheck>) -> HostResult<()> {
        self.register_calls += 1;
        if self.checks.contains_key(name) {
            warn!(
                "event=health_check_duplicate module=host name={} component={}",
                name, check.component
            );
            return Ok(());
        }
        self.checks.insert(name.to_string(), check);
        Ok(())
    }
}

/// Handler registry slot with separate provider and resource lists.
#[derive(Debug, Default)]
pub struct HandlerEnvironment {
    providers: Vec<Handler>,
    resources: Vec<Handler>,
}

impl HandlerEnvironment {
    pub fn providers(&self) -> &[Handler] {
        &self.providers
    }

    pub fn resources(&self) -> &[Handler] {
        &self.resources
    }

    /// Route templates of registered resources, in registration order.
    pub fn routes(&self) -> Vec<&str> {
        self.resources
            .iter()
            .filter_map(|handler| match handler {
                Handler::Resource { route, .. } => Some(route.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl HandlerSlot for HandlerEnvironment {
    fn register(&mut self, handler: Handler) -> HostResult<()> {
        debug!(
            "event=handler_registered module=host component={} provider={}",
            handler.component(),
            handler.is_provider()
        );
        if handler.is_provider() {
            self.providers.push(handler);
        } else {
            self.resources.push(handler);
        }
        Ok(())
    }
}

/// In-memory host exposing all registration slots.
#[derive(Debug)]
pub struct Environment {
    handle: Arc<EnvironmentHandle>,
    lifecycle: LifecycleEnvironment,
    admin: AdminEnvironment,
    health_checks: HealthCheckRegistry,
    handlers: HandlerEnvironment,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            handle: Arc::new(EnvironmentHandle::new(name)),
            lifecycle: LifecycleEnvironment::default(),
            admin: AdminEnvironment::default(),
            health_checks: HealthCheckRegistry::default(),
            handlers: HandlerEnvironment::default(),
        }
    }

    pub fn handle(&self) -> Arc<EnvironmentHandle> {
        Arc::clone(&self.handle)
    }

    pub fn lifecycle_environment(&self) -> &LifecycleEnvironment {
        &self.lifecycle
    }

    pub fn admin_environment(&self) -> &AdminEnvironment {
        &self.admin
    }

    pub fn health_check_registry(&self) -> &HealthCheckRegistry {
        &self.health_checks
    }

    pub fn handler_environment(&self) -> &HandlerEnvironment {
        &self.handlers
    }

    /// Starts the handle and every managed object.
    ///
    /// A failed lifecycle start also stops the handle again.
    pub fn start(&mut self, server: &ServerInfo) -> HostResult<()> {
        self.handle.start()?;
        if let Err(err) = self.lifecycle.start(server) {
            if let Err(stop_err) = self.handle.stop() {
                warn!(
                    "event=environment_stop module=host status=error environment={} error={}",
                    self.handle.name(),
                    stop_err
                );
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn stop(&mut self) -> HostResult<()> {
        let result = self.lifecycle.stop();
        self.handle.stop()?;
        result
    }
}

impl Host for Environment {
    fn environment_component(&self, name: &str) -> Component {
        Component::builder(name, self.handle())
            .life_cycle()
            .server_lifecycle_listener()
            .build()
    }

    fn lifecycle(&mut self) -> &mut dyn LifecycleSlot {
        &mut self.lifecycle
    }

    fn admin(&mut self) -> &mut dyn TaskSlot {
        &mut self.admin
    }

    fn health_checks(&mut self) -> &mut dyn HealthCheckSlot {
        &mut self.health_checks
    }

    fn handlers(&mut self) -> &mut dyn HandlerSlot {
        &mut self.handlers
    }
}
