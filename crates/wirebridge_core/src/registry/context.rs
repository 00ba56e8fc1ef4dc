//! In-process component registry.
//!
//! # Responsibility
//! - Validate and store component definitions in registration order.
//! - Run deferred factories exactly once on activation.
//! - Answer capability and marker queries once active.
//!
//! # Invariants
//! - Enumeration order is registration order, factories included at the slot
//!   where they were registered.
//! - A failed activation leaves the registry inactive; components built before
//!   the failing factory stay built.

use crate::component::capability::{Capability, Marker};
use crate::component::definition::Component;
use crate::registry::{Registry, RegistryError, RegistryResult, RegistryState};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

static ROUTE_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(?:(?:[A-Za-z0-9._~-]+|\{[A-Za-z_][A-Za-z0-9_]*\})(?:/(?:[A-Za-z0-9._~-]+|\{[A-Za-z_][A-Za-z0-9_]*\}))*)?$")
        .expect("valid route template regex")
});

/// Deferred component constructor run during activation.
pub type ComponentFactory = Box<dyn FnOnce() -> Result<Component, String> + Send>;

enum Slot {
    Ready(Arc<Component>),
    Deferred(String, ComponentFactory),
}

impl Slot {
    fn name(&self) -> &str {
        match self {
            Self::Ready(component) => component.name(),
            Self::Deferred(name, _) => name,
        }
    }
}

/// Registry implementation backed by an ordered slot list.
pub struct ComponentContext {
    state: RegistryState,
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl Default for ComponentContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentContext {
    pub fn new() -> Self {
        Self {
            state: RegistryState::Inactive,
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Registers one component definition.
    pub fn register(&mut self, component: Component) -> RegistryResult<()> {
        self.ensure_inactive(component.name())?;
        validate_component(&component)?;
        self.reserve(component.name())?;
        debug!(
            "event=component_defined module=registry name={} type={}",
            component.name(),
            component.type_name()
        );
        self.slots.push(Slot::Ready(Arc::new(component)));
        Ok(())
    }

    /// Registers a component whose construction is deferred to activation.
    ///
    /// The factory must produce a component named `name`.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> RegistryResult<()>
    where
        F: FnOnce() -> Result<Component, String> + Send + 'static,
    {
        let name = name.into();
        self.ensure_inactive(&name)?;
        validate_name(&name)?;
        self.reserve(&name)?;
        self.slots.push(Slot::Deferred(name, Box::new(factory)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns names in enumeration order.
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name().to_string()).collect()
    }

    /// Returns one constructed component by name.
    ///
    /// Deferred components are visible only after activation.
    pub fn get(&self, name: &str) -> Option<Arc<Component>> {
        let position = *self.index.get(name)?;
        match &self.slots[position] {
            Slot::Ready(component) => Some(Arc::clone(component)),
            Slot::Deferred(..) => None,
        }
    }

    /// Returns one component instance downcast to `T`.
    pub fn get_as<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get(name)?.downcast::<T>()
    }

    fn ensure_inactive(&self, name: &str) -> RegistryResult<()> {
        match self.state {
            RegistryState::Inactive => Ok(()),
            RegistryState::Active => Err(RegistryError::RegistryActive(name.to_string())),
        }
    }

    fn ensure_active(&self) -> RegistryResult<()> {
        match self.state {
            RegistryState::Active => Ok(()),
            RegistryState::Inactive => Err(RegistryError::NotActive),
        }
    }

    fn reserve(&mut self, name: &str) -> RegistryResult<()> {
        if self.index.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.index.insert(name.to_string(), self.slots.len());
        Ok(())
    }

    fn select<P>(&self, predicate: P) -> RegistryResult<Vec<Arc<Component>>>
    where
        P: Fn(&Component) -> bool,
    {
        self.ensure_active()?;
        Ok(self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Ready(component) if predicate(component) => Some(Arc::clone(component)),
                _ => None,
            })
            .collect())
    }
}

impl Registry for ComponentContext {
    fn is_active(&self) -> bool {
        self.state == RegistryState::Active
    }

    fn activate(&mut self) -> RegistryResult<()> {
        if self.is_active() {
            return Ok(());
        }

        let mut built = 0_usize;
        for position in 0..self.slots.len() {
            if !matches!(self.slots[position], Slot::Deferred(..)) {
                continue;
            }
            let taken = std::mem::replace(
                &mut self.slots[position],
                Slot::Deferred(String::new(), failed_factory()),
            );
            let Slot::Deferred(name, factory) = taken else {
                continue;
            };
            match build_deferred(&name, factory) {
                Ok(component) => {
                    self.slots[position] = Slot::Ready(Arc::new(component));
                    built += 1;
                }
                Err(err) => {
                    self.slots[position] = Slot::Deferred(name, failed_factory());
                    return Err(err);
                }
            }
        }

        self.state = RegistryState::Active;
        info!(
            "event=registry_activated module=registry status=ok components={} deferred_built={}",
            self.slots.len(),
            built
        );
        Ok(())
    }

    fn components_with(&self, capability: Capability) -> RegistryResult<Vec<Arc<Component>>> {
        self.select(|component| component.satisfies(capability))
    }

    fn components_marked(&self, marker: Marker) -> RegistryResult<Vec<Arc<Component>>> {
        self.select(|component| component.has_marker(marker))
    }

    fn insert_singleton(&mut self, component: Component) -> RegistryResult<()> {
        self.register(component)
    }
}

impl Debug for ComponentContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContext")
            .field("state", &self.state)
            .field("names", &self.names())
            .finish()
    }
}

// Factories are consumed on their single run; a failed slot keeps one that
// reports the earlier failure if activation is retried.
fn failed_factory() -> ComponentFactory {
    Box::new(|| Err("factory already failed during an earlier activation".to_string()))
}

fn build_deferred(name: &str, factory: ComponentFactory) -> RegistryResult<Component> {
    let component = factory().map_err(|message| RegistryError::FactoryFailed {
        name: name.to_string(),
        message,
    })?;
    if component.name() != name {
        return Err(RegistryError::FactoryFailed {
            name: name.to_string(),
            message: format!("factory produced component named `{}`", component.name()),
        });
    }
    validate_component(&component)?;
    Ok(component)
}

fn validate_name(name: &str) -> RegistryResult<()> {
    if name.is_empty() || name.trim() != name {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn validate_component(component: &Component) -> RegistryResult<()> {
    validate_name(component.name())?;
    if component.has_marker(Marker::Path) {
        let route = component.route().unwrap_or_default();
        if !ROUTE_TEMPLATE_RE.is_match(route) {
            return Err(RegistryError::InvalidRoute {
                name: component.name().to_string(),
                route: route.to_string(),
            });
        }
    }
    Ok(())
}
