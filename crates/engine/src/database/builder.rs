//! Database builder for fluent configuration

use std::sync::Arc;

use super::{Database, DatabaseConfig};

/// Builder for Database configuration
///
/// ```ignore
/// use vessel_engine::Database;
///
/// // 1. Defaults
/// let db = Database::ephemeral();
///
/// // 2. Builder
/// let db = Database::builder()
///     .auto_refresh(false)
///     .gc_on_refresh(true)
///     .build();
///
/// // 3. From TOML
/// let db = Database::from_toml("auto_refresh = false")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatabaseBuilder {
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    /// Create new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn with_config(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Enable or disable automatic advancement of connections
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.config.auto_refresh = enabled;
        self
    }

    /// Enable or disable garbage collection after a connection advances
    pub fn gc_on_refresh(mut self, enabled: bool) -> Self {
        self.config.gc_on_refresh = enabled;
        self
    }

    /// Skip the built-in record and result-set bridges
    pub fn without_default_bridges(mut self) -> Self {
        self.config.register_default_bridges = false;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Create the database
    pub fn build(self) -> Arc<Database> {
        Database::new(self.config)
    }
}
