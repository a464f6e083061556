//! # flowprobe Config
//!
//! Harness configuration loaded from YAML or JSON, with environment overrides

mod config;
mod loader;

pub use config::*;
pub use loader::*;

/// Prelude module for configuration
pub mod prelude {
    pub use crate::{ConfigLoader, HarnessConfig, OracleConfig};
}
