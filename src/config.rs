//! Composite Configuration Module
//!
//! Controls memoization and tracing for generation runs.
//! Config is read from a `composite.toml` whose path the caller supplies.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`COMPOSITE_CACHE`, `COMPOSITE_TRACE`)
//! 2. Config file
//! 3. Defaults (cache on, tracing off)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompositeError, Result};

/// Environment variable toggling the step cache
pub const ENV_CACHE: &str = "COMPOSITE_CACHE";
/// Environment variable toggling per-step tracing
pub const ENV_TRACE: &str = "COMPOSITE_TRACE";

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompositeConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// Memoization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Honor `cached()` steps (off means every step always evaluates)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Diagnostics settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebugConfig {
    /// Verbose per-step tracing for every run
    #[serde(default)]
    pub trace: bool,

    /// Warn when an output resolves through the `#`-stripped fallback
    #[serde(default = "default_true")]
    pub output_fallback_warnings: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            trace: false,
            output_fallback_warnings: true,
        }
    }
}

/// Parse a boolean-ish environment value (`1/0`, `true/false`, `on/off`)
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl CompositeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CompositeError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| CompositeError::ConfigError {
            reason: format!("Failed to read config file: {}", e),
        })?;

        Self::from_toml(&content)
    }

    /// Load from file, then apply environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self> {
        Ok(Self::load(path)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(enabled) = lookup(ENV_CACHE).as_deref().and_then(parse_flag) {
            self.cache.enabled = enabled;
        }
        if let Some(trace) = lookup(ENV_TRACE).as_deref().and_then(parse_flag) {
            self.debug.trace = trace;
        }
        self
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CompositeError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })
    }
}
