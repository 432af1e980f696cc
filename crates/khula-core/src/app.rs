use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Config;

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    db_path: PathBuf,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::with_config(config)
    }

    /// Create an application instance from an existing config
    pub fn with_config(config: Config) -> Result<Self> {
        let db_path = PathBuf::from(&config.database.path);
        Ok(Self {
            config: Arc::new(config),
            db_path,
        })
    }

    /// Prepare application state (data directories, etc.)
    pub fn initialize(&mut self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }

        tracing::info!("Application initialized (database: {})", self.db_path.display());
        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the application config
    pub fn config_handle(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Path to the SQLite database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
