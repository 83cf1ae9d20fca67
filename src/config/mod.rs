//! Mission Configuration Module
//!
//! Per-mission configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `SWARM_CONFIG` environment variable (path to TOML file)
//! 2. `mission_config.toml` in the current working directory
//! 3. Built-in defaults (the standard five-vehicle mission)
//!
//! ## Usage
//!
//! ```ignore
//! let config = MissionConfig::load();
//! let runner = MissionRunner::new(config);
//! ```

mod mission_config;
pub mod defaults;
pub mod validation;

pub use mission_config::*;
