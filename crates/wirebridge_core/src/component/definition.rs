//! Named component entries and their capability views.
//!
//! # Responsibility
//! - Hold one shared component instance with its registry name and type name.
//! - Record, at registration time, which capabilities the instance satisfies.
//!
//! # Invariants
//! - A capability view exists only when the concrete type implements the trait.
//! - `satisfies(c)` is true exactly when the typed view for `c` is present.

use crate::component::capability::{
    Capability, HealthCheck, InjectionResolver, LifeCycle, Managed, Marker,
    ServerLifecycleListener, Task,
};
use std::any::{type_name, Any};
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// One named, typed object held by a registry.
#[derive(Clone)]
pub struct Component {
    name: String,
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    views: CapabilityViews,
    markers: BTreeSet<Marker>,
    route: Option<String>,
    ambient: bool,
}

#[derive(Clone, Default)]
struct CapabilityViews {
    managed: Option<Arc<dyn Managed>>,
    life_cycle: Option<Arc<dyn LifeCycle>>,
    server_listener: Option<Arc<dyn ServerLifecycleListener>>,
    task: Option<Arc<dyn Task>>,
    health_check: Option<Arc<dyn HealthCheck>>,
    injection_resolver: Option<Arc<dyn InjectionResolver>>,
}

impl Component {
    /// Starts a component definition for a shared instance.
    pub fn builder<T>(name: impl Into<String>, instance: Arc<T>) -> ComponentBuilder<T>
    where
        T: Any + Send + Sync,
    {
        ComponentBuilder {
            name: name.into(),
            instance,
            views: CapabilityViews::default(),
            markers: BTreeSet::new(),
            route: None,
        }
    }

    /// Plain data component with no capabilities.
    pub fn singleton<T>(name: impl Into<String>, instance: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::builder(name, instance).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concrete type name of the instance.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn instance(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.instance)
    }

    /// Returns the instance as `T` when the concrete type matches.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Arc::clone(&self.instance).downcast::<T>().ok()
    }

    pub fn satisfies(&self, capability: Capability) -> bool {
        match capability {
            Capability::Managed => self.views.managed.is_some(),
            Capability::LifeCycle => self.views.life_cycle.is_some(),
            Capability::ServerLifecycleListener => self.views.server_listener.is_some(),
            Capability::Task => self.views.task.is_some(),
            Capability::HealthCheck => self.views.health_check.is_some(),
            Capability::InjectionResolver => self.views.injection_resolver.is_some(),
        }
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    /// Sorted list of satisfied capabilities.
    pub fn capabilities(&self) -> Vec<Capability> {
        [
            Capability::Managed,
            Capability::LifeCycle,
            Capability::ServerLifecycleListener,
            Capability::Task,
            Capability::HealthCheck,
            Capability::InjectionResolver,
        ]
        .into_iter()
        .filter(|capability| self.satisfies(*capability))
        .collect()
    }

    pub fn markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.markers.iter().copied()
    }

    /// Route template for `Path` components.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn managed(&self) -> Option<Arc<dyn Managed>> {
        self.views.managed.clone()
    }

    pub fn life_cycle(&self) -> Option<Arc<dyn LifeCycle>> {
        self.views.life_cycle.clone()
    }

    pub fn server_lifecycle_listener(&self) -> Option<Arc<dyn ServerLifecycleListener>> {
        self.views.server_listener.clone()
    }

    pub fn task(&self) -> Option<Arc<dyn Task>> {
        self.views.task.clone()
    }

    pub fn health_check(&self) -> Option<Arc<dyn HealthCheck>> {
        self.views.health_check.clone()
    }

    pub fn injection_resolver(&self) -> Option<Arc<dyn InjectionResolver>> {
        self.views.injection_resolver.clone()
    }

    /// True for the run configuration and environment handle inserted by
    /// the bridge. Bootstrap code cannot set this.
    pub fn is_ambient(&self) -> bool {
        self.ambient
    }

    pub(crate) fn into_ambient(mut self) -> Self {
        self.ambient = true;
        self
    }
}

impl Debug for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capabilities())
            .field("markers", &self.markers)
            .field("route", &self.route)
            .field("ambient", &self.ambient)
            .finish()
    }
}

/// Registration-time capability tagging for one instance.
///
/// Each capability method is only callable when `T` implements the matching
/// trait, so a component cannot claim a capability its type lacks.
pub struct ComponentBuilder<T> {
    name: String,
    instance: Arc<T>,
    views: CapabilityViews,
    markers: BTreeSet<Marker>,
    route: Option<String>,
}

impl<T> ComponentBuilder<T>
where
    T: Any + Send + Sync,
{
    pub fn managed(mut self) -> Self
    where
        T: Managed,
    {
        self.views.managed = Some(self.instance.clone() as Arc<dyn Managed>);
        self
    }

    pub fn life_cycle(mut self) -> Self
    where
        T: LifeCycle,
    {
        self.views.life_cycle = Some(self.instance.clone() as Arc<dyn LifeCycle>);
        self
    }

    pub fn server_lifecycle_listener(mut self) -> Self
    where
        T: ServerLifecycleListener,
    {
        self.views.server_listener =
            Some(self.instance.clone() as Arc<dyn ServerLifecycleListener>);
        self
    }

    pub fn task(mut self) -> Self
    where
        T: Task,
    {
        self.views.task = Some(self.instance.clone() as Arc<dyn Task>);
        self
    }

    pub fn health_check(mut self) -> Self
    where
        T: HealthCheck,
    {
        self.views.health_check = Some(self.instance.clone() as Arc<dyn HealthCheck>);
        self
    }

    pub fn injection_resolver(mut self) -> Self
    where
        T: InjectionResolver,
    {
        self.views.injection_resolver =
            Some(self.instance.clone() as Arc<dyn InjectionResolver>);
        self
    }

    pub fn provider(self) -> Self {
        self.marker(Marker::Provider)
    }

    /// Marks the component as a routed resource served under `route`.
    pub fn path(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self.marker(Marker::Path)
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.insert(marker);
        self
    }

    pub fn build(self) -> Component {
        Component {
            name: self.name,
            type_name: type_name::<T>(),
            instance: self.instance,
            views: self.views,
            markers: self.markers,
            route: self.route,
            ambient: false,
        }
    }
}
