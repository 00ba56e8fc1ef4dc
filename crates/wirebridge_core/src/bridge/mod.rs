//! Registry-to-host wiring bridge.
//!
//! Runs once at startup, after the bootstrap layer has populated the
//! registry and before the host accepts traffic.

mod error;
mod wiring;

pub use error::{BridgeError, ConfigurationError};
pub use wiring::{
    Bridge, WiringPass, WiringSummary, CONFIGURATION_COMPONENT_NAME, ENVIRONMENT_COMPONENT_NAME,
};
