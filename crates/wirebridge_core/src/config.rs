//! Deserializable options for the bridge and logging bootstrap.
//!
//! Loading these from a file is the bootstrap layer's job; this module only
//! fixes their shape and defaults.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};

/// Ambient-value registration switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Insert the run configuration under `dw` before activation.
    pub register_configuration: bool,
    /// Insert the environment handle under `dwEnv` before activation.
    pub register_environment: bool,
}

/// Logging bootstrap options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingOptions {
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
    /// Size at which the active log file rotates.
    #[serde(default = "default_rotate_bytes")]
    pub rotate_bytes: u64,
    /// Rotated files kept on disk.
    #[serde(default = "default_keep_files")]
    pub keep_files: usize,
    /// Also echo warnings and errors to stderr.
    #[serde(default)]
    pub mirror_warnings: bool,
}

impl LoggingOptions {
    pub fn new(level: impl Into<String>, log_dir: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            rotate_bytes: default_rotate_bytes(),
            keep_files: default_keep_files(),
            mirror_warnings: false,
        }
    }
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_rotate_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_keep_files() -> usize {
    4
}
