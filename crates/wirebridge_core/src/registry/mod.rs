//! Component registry contracts.
//!
//! # Responsibility
//! - Define the query/insert boundary the bridge consumes.
//! - Model the one-way inactive -> active registry lifecycle.
//!
//! # Invariants
//! - Component names are unique within one registry.
//! - Insertions are legal only while inactive; queries only while active.
//! - Activation never reverts.

use crate::component::capability::{Capability, Marker};
use crate::component::definition::Component;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod context;

pub use context::{ComponentContext, ComponentFactory};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Accepting definitions; not yet queryable.
    Inactive,
    /// Queryable; the component set is final.
    Active,
}

/// Queryable store of named components.
pub trait Registry {
    fn is_active(&self) -> bool;

    /// Finalizes the component set. No-op when already active.
    fn activate(&mut self) -> RegistryResult<()>;

    /// Components whose type satisfies `capability`, in enumeration order.
    fn components_with(&self, capability: Capability) -> RegistryResult<Vec<Arc<Component>>>;

    /// Components carrying `marker`, in enumeration order.
    fn components_marked(&self, marker: Marker) -> RegistryResult<Vec<Arc<Component>>>;

    /// Adds a ready-made singleton. Fails once the registry is active.
    fn insert_singleton(&mut self, component: Component) -> RegistryResult<()>;
}

/// Registry definition and query errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName(String),
    DuplicateName(String),
    InvalidRoute { name: String, route: String },
    /// Insertion attempted after activation.
    RegistryActive(String),
    /// Query attempted before activation.
    NotActive,
    FactoryFailed { name: String, message: String },
    /// A query returned a component that lacks the queried capability.
    CapabilityMismatch { name: String, capability: Capability },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "component name is invalid: `{value}`"),
            Self::DuplicateName(value) => {
                write!(f, "component name already registered: {value}")
            }
            Self::InvalidRoute { name, route } => {
                write!(f, "component `{name}` has invalid route template: {route}")
            }
            Self::RegistryActive(value) => write!(
                f,
                "registry is already active; cannot insert component `{value}`"
            ),
            Self::NotActive => write!(f, "registry must be active before it can be queried"),
            Self::FactoryFailed { name, message } => {
                write!(f, "component factory `{name}` failed: {message}")
            }
            Self::CapabilityMismatch { name, capability } => write!(
                f,
                "component `{name}` was returned for `{capability}` but does not provide it"
            ),
        }
    }
}

impl Error for RegistryError {}
