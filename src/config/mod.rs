//! Engine Configuration Module
//!
//! Provides engine-wide configuration loaded from TOML files: derivative
//! smoothing, regime classification bands, optimizer tuning, match rating
//! thresholds, session limits and default parameter templates.
//!
//! ## Loading Order
//!
//! 1. `WELLTEST_CONFIG` environment variable (path to TOML file)
//! 2. `welltest_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load());
//!
//! // Anywhere in the codebase:
//! let l = config::get().derivative.smoothing_l;
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global engine configuration.
///
/// Falls back to built-in defaults when `init()` has not been called, so
/// library users that never touch configuration get the documented values.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG.get_or_init(EngineConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
