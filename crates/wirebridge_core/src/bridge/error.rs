//! Bridge error taxonomy.

use crate::host::HostError;
use crate::registry::RegistryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Misuse of the bridge's ambient-value contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Ambient insertion requested while the registry is already active.
    RegistryActive { component: &'static str },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegistryActive { component } => write!(
                f,
                "registry must not be active in order to register `{component}`"
            ),
        }
    }
}

impl Error for ConfigurationError {}

/// Startup wiring failure.
///
/// Registry and host variants carry the collaborator's error unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    Configuration(ConfigurationError),
    Registry(RegistryError),
    Host(HostError),
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Host(err) => Some(err),
        }
    }
}

impl From<ConfigurationError> for BridgeError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<RegistryError> for BridgeError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<HostError> for BridgeError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}
