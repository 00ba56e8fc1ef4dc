//! Component model.
//!
//! Components are opaque shared instances tagged with the capabilities and
//! markers their type satisfies. Tagging happens once, when the bootstrap
//! layer builds the definition; discovery later reads the tags.

pub mod capability;
pub mod definition;
