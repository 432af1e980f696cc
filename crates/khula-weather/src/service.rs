//! Daily-cached weather lookups.
//!
//! The external provider is rate-limited, so each `(location, day)` pair is
//! fetched at most once per request path: a lookup first consults the store
//! and only queries the provider when no record for today exists. Concurrent
//! same-day misses may both fetch; the store's composite-key upsert makes
//! that benign (last write wins).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::instrument;

use khula_advisor::AdvisorClient;

use crate::alerts::{derive_alerts, WeatherAlert};
use crate::clock::Clock;
use crate::provider::WeatherSource;
use crate::regions;
use crate::store::WeatherStore;
use crate::types::{StorageError, WeatherError, WeatherRecord};

/// Weather lookups with a fetch-once-per-day-per-location cache.
#[derive(Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherSource>,
    store: Arc<Mutex<Box<dyn WeatherStore>>>,
    advisor: Arc<AdvisorClient>,
    clock: Arc<dyn Clock>,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherSource>,
        store: Box<dyn WeatherStore>,
        advisor: Arc<AdvisorClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            store: Arc::new(Mutex::new(store)),
            advisor,
            clock,
        }
    }

    /// Return today's weather for a supported region.
    ///
    /// On a cache hit the stored record is returned and the provider is not
    /// contacted. On a miss the provider is queried exactly once, the new
    /// record is persisted under `(location, today)`, and returned. Provider
    /// failures leave the store unchanged; store read failures propagate
    /// rather than masquerading as misses.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather(&self, location: &str) -> Result<WeatherRecord, WeatherError> {
        if location.trim().is_empty() {
            return Err(WeatherError::EmptyLocation);
        }
        let region = regions::find(location)
            .ok_or_else(|| WeatherError::UnknownLocation(location.trim().to_string()))?;

        let today = self.clock.today();

        let store = self.store.clone();
        let name = region.name.to_string();
        let cached = tokio::task::spawn_blocking(move || store.lock().get(&name, today))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        if let Some(record) = cached {
            tracing::debug!("Weather cache hit for {} on {}", region.name, today);
            return Ok(record);
        }

        tracing::info!("Weather cache miss for {} on {}, querying provider", region.name, today);
        let observation = self.provider.observe(region).await?;

        let record = WeatherRecord {
            location: region.name.to_string(),
            date: today,
            current: observation.current,
            forecast: observation.forecast,
            fetched_at: self.clock.now(),
        };

        let store = self.store.clone();
        let to_store = record.clone();
        tokio::task::spawn_blocking(move || store.lock().put(&to_store))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        Ok(record)
    }

    /// AI analysis of today's conditions for a crop.
    ///
    /// Uses the cached weather path, formats an agronomic prompt, and
    /// returns the advisor's response verbatim. Analysis results are not
    /// cached.
    #[instrument(skip(self), level = "info")]
    pub async fn farming_analysis(
        &self,
        location: &str,
        crop_type: &str,
    ) -> Result<String, WeatherError> {
        let record = self.get_weather(location).await?;
        let prompt = analysis_prompt(&record, crop_type);
        Ok(self.advisor.generate(&prompt).await?)
    }

    /// Threshold-derived alerts for today's conditions.
    pub async fn alerts(&self, location: &str) -> Result<Vec<WeatherAlert>, WeatherError> {
        let record = self.get_weather(location).await?;
        Ok(derive_alerts(&record))
    }
}

fn analysis_prompt(record: &WeatherRecord, crop_type: &str) -> String {
    let mut prompt = format!(
        "As an agricultural weather expert, analyze the following weather data \
         for {} farming in {}:\n\n\
         Current Weather:\n\
         - Temperature: {}°C\n\
         - Humidity: {}%\n\
         - Precipitation: {}mm\n\
         - Wind Speed: {} km/h\n\n\
         Forecast:\n",
        crop_type,
        record.location,
        record.current.temperature,
        record.current.humidity,
        record.current.precipitation,
        record.current.wind_speed,
    );

    for day in &record.forecast {
        prompt.push_str(&format!(
            "- {}: {}-{}°C, Precipitation: {}mm\n",
            day.date, day.temp_min, day.temp_max, day.precipitation
        ));
    }

    prompt.push_str(&format!(
        "\nPlease provide:\n\
         1. Current weather impact on {} growth\n\
         2. Recommendations for the coming days\n\
         3. Irrigation needs based on the precipitation forecast\n\
         4. Any weather-related risks or opportunities\n\
         5. Optimal farming activities for this weather pattern\n\n\
         Keep the response practical and actionable for farmers.",
        crop_type
    ));

    prompt
}
