//! Database configuration
//!
//! The store keeps no files, so configuration is parsed from a TOML string
//! the host application supplies (or built with `DatabaseBuilder`). Unknown
//! keys are rejected so a typo does not silently fall back to a default.

use serde::{Deserialize, Serialize};
use vessel_core::{Error, Result};

/// Database configuration
///
/// # Example
///
/// ```toml
/// # Advance connections to the latest version on find/query/resolve
/// auto_refresh = true
///
/// # Collect garbage whenever a connection advances
/// gc_on_refresh = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Advance unpinned connections to the latest version before reads and
    /// resolves.
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    /// Run garbage collection after a connection advances.
    #[serde(default)]
    pub gc_on_refresh: bool,
    /// Register the record and result-set bridges on creation.
    #[serde(default = "default_true")]
    pub register_default_bridges: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            gc_on_refresh: false,
            register_default_bridges: true,
        }
    }
}

impl DatabaseConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize this configuration to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Returns the default config content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Vessel database configuration
#
# Advance connections to the latest version on find/objects/query/resolve.
# A connection pinned by outstanding capsules never advances on its own.
auto_refresh = true

# Collect garbage whenever a connection advances (default: false)
gc_on_refresh = false

# Register the record and result-set handoff bridges (default: true)
register_default_bridges = true
"#
    }
}
