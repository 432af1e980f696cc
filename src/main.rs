use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use khula_advisor::AdvisorClient;
use khula_services::{
    ForumService, MarketService, PlantingService, ResourceService, SqliteForumStore,
    SqliteMarketStore, SqliteScheduleStore,
};
use khula_weather::{
    OpenWeatherProvider, SqliteWeatherStore, SystemClock, WeatherService, REGIONS,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    khula_core::init()?;

    // Create and initialize application
    let mut app = khula_core::App::new()?;
    app.initialize()?;

    let config = app.config();
    let clock = Arc::new(SystemClock);

    let advisor = Arc::new(AdvisorClient::new(
        &config.advisor.api_base_url,
        config.advisor.api_key.clone(),
        &config.advisor.model,
    )?);

    let provider = Arc::new(OpenWeatherProvider::new(
        &config.weather.api_base_url,
        config.weather.api_key.clone(),
        Duration::from_secs(config.weather.timeout_secs),
        config.weather.forecast_days as usize,
    )?);

    let weather = Arc::new(WeatherService::new(
        provider,
        Box::new(SqliteWeatherStore::new(app.db_path())?),
        advisor.clone(),
        clock.clone(),
    ));

    let market = Arc::new(MarketService::new(
        SqliteMarketStore::new(app.db_path())?,
        advisor.clone(),
        config.market.history_days,
    ));

    let _forum = ForumService::new(SqliteForumStore::new(app.db_path())?, advisor.clone());
    let _resources = ResourceService::new(advisor.clone());
    let _planting = PlantingService::new(
        weather,
        market,
        advisor,
        SqliteScheduleStore::new(app.db_path())?,
        clock,
    );

    tracing::info!("Khula application started");

    println!("Khula - Farming Assistant");
    println!("Services initialized successfully!");
    println!("\nConfiguration:");
    println!("  Config directory: {}", config.config_dir.display());
    println!("  Database: {}", app.db_path().display());
    println!("  Supported regions: {}", REGIONS.len());
    println!(
        "  Market crops: {}",
        khula_services::supported_crops().join(", ")
    );

    // Graceful shutdown
    app.shutdown()?;

    Ok(())
}
