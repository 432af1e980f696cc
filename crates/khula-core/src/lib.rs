pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{AdvisorConfig, Config, DatabaseConfig, MarketConfig, WeatherConfig};
pub use error::{AppError, ConfigError, DatabaseError, NetworkError};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Khula core initialized");
    Ok(())
}
