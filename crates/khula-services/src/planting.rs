//! Planting calendar service.
//!
//! A static South African crop calendar drives schedule generation: crop
//! profile + today's cached weather + market context are folded into an
//! advisor prompt, and the resulting schedule is persisted per user.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use khula_advisor::{AdvisorClient, AdvisorError};
use khula_weather::{Clock, CurrentConditions, WeatherError, WeatherService};

use crate::market::{MarketError, MarketService};
use crate::schedule_store::SqliteScheduleStore;

/// How much market narrative is carried into the planting prompt.
const MARKET_CONTEXT_CHARS: usize = 500;

/// Static planting profile for one crop.
#[derive(Debug, Clone, Copy)]
pub struct CropProfile {
    pub name: &'static str,
    pub planting_season: &'static str,
    pub harvest_season: &'static str,
    pub growing_days: u32,
    /// Optimal temperature range in °C
    pub optimal_temp_c: (f64, f64),
    /// Seasonal rainfall needs in mm
    pub rainfall_needs_mm: (u32, u32),
    pub regions: &'static [&'static str],
}

/// South African crop calendar.
pub const CROP_CALENDAR: &[CropProfile] = &[
    CropProfile {
        name: "maize",
        planting_season: "October - December",
        harvest_season: "April - July",
        growing_days: 120,
        optimal_temp_c: (18.0, 30.0),
        rainfall_needs_mm: (500, 800),
        regions: &["Free State", "North West", "Mpumalanga", "KwaZulu-Natal"],
    },
    CropProfile {
        name: "wheat",
        planting_season: "May - July",
        harvest_season: "November - January",
        growing_days: 120,
        optimal_temp_c: (15.0, 25.0),
        rainfall_needs_mm: (400, 600),
        regions: &["Western Cape", "Free State", "Northern Cape"],
    },
    CropProfile {
        name: "soybeans",
        planting_season: "October - December",
        harvest_season: "March - May",
        growing_days: 100,
        optimal_temp_c: (20.0, 30.0),
        rainfall_needs_mm: (450, 700),
        regions: &["Mpumalanga", "KwaZulu-Natal", "Limpopo"],
    },
    CropProfile {
        name: "sunflower",
        planting_season: "October - January",
        harvest_season: "March - June",
        growing_days: 90,
        optimal_temp_c: (18.0, 25.0),
        rainfall_needs_mm: (400, 600),
        regions: &["Free State", "North West", "Northern Cape"],
    },
    CropProfile {
        name: "potatoes",
        planting_season: "August - October, February - April",
        harvest_season: "December - February, June - August",
        growing_days: 90,
        optimal_temp_c: (15.0, 20.0),
        rainfall_needs_mm: (500, 700),
        regions: &["Western Cape", "Free State", "Limpopo"],
    },
    CropProfile {
        name: "tomatoes",
        planting_season: "August - October, February - April",
        harvest_season: "November - January, May - July",
        growing_days: 80,
        optimal_temp_c: (18.0, 25.0),
        rainfall_needs_mm: (400, 600),
        regions: &["All provinces"],
    },
];

/// Look up a crop profile by name (case-insensitive).
pub fn crop_profile(name: &str) -> Option<&'static CropProfile> {
    let needle = name.trim().to_lowercase();
    CROP_CALENDAR.iter().find(|p| p.name == needle)
}

/// Southern-hemisphere season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summer => "Summer",
            Self::Autumn => "Autumn",
            Self::Winter => "Winter",
            Self::Spring => "Spring",
        }
    }
}

/// Season for a calendar month, southern hemisphere.
pub fn season_for_month(month: u32) -> Season {
    match month {
        12 | 1 | 2 => Season::Summer,
        3..=5 => Season::Autumn,
        6..=8 => Season::Winter,
        _ => Season::Spring,
    }
}

/// Errors that can occur during planting calendar operations.
#[derive(Debug, Error)]
pub enum PlantingError {
    #[error("Crop data not available for {0}")]
    UnknownCrop(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PlantingError {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// Result type for planting calendar operations.
pub type PlantingResult<T> = Result<T, PlantingError>;

/// A generated planting schedule for one crop at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantingSchedule {
    pub crop: String,
    pub location: String,
    pub plot_size_ha: Option<f64>,
    pub planting_season: String,
    pub harvest_season: String,
    pub growing_days: u32,
    pub weather_summary: Option<CurrentConditions>,
    pub market_outlook: Option<String>,
    pub recommendations: String,
    pub generated_at: DateTime<Utc>,
}

/// A full farming calendar covering several crops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmCalendar {
    pub id: Uuid,
    pub user_id: String,
    pub crops: Vec<PlantingSchedule>,
    pub created_at: DateTime<Utc>,
}

/// One crop/location request inside a calendar.
#[derive(Debug, Clone)]
pub struct CalendarEntry {
    pub crop: String,
    pub location: String,
    pub plot_size_ha: Option<f64>,
}

/// Planting calendar operations.
#[derive(Clone)]
pub struct PlantingService {
    weather: Arc<WeatherService>,
    market: Arc<MarketService>,
    advisor: Arc<AdvisorClient>,
    store: Arc<Mutex<SqliteScheduleStore>>,
    clock: Arc<dyn Clock>,
}

impl PlantingService {
    pub fn new(
        weather: Arc<WeatherService>,
        market: Arc<MarketService>,
        advisor: Arc<AdvisorClient>,
        store: SqliteScheduleStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            weather,
            market,
            advisor,
            store: Arc::new(Mutex::new(store)),
            clock,
        }
    }

    /// Generate a planting schedule for one crop at one location.
    ///
    /// Weather comes through the daily cache; market context is best-effort
    /// and omitted when the market analysis fails.
    #[instrument(skip(self), level = "info")]
    pub async fn schedule(
        &self,
        crop: &str,
        location: &str,
        plot_size_ha: Option<f64>,
    ) -> PlantingResult<PlantingSchedule> {
        let profile =
            crop_profile(crop).ok_or_else(|| PlantingError::UnknownCrop(crop.to_string()))?;

        let weather = self.weather.get_weather(location).await?;

        let market_outlook = match self.market.analysis(profile.name).await {
            Ok(text) => Some(text),
            Err(MarketError::UnknownCrop(_)) => None,
            Err(e) => {
                tracing::warn!("Market context unavailable for {}: {}", profile.name, e);
                None
            }
        };

        let prompt = schedule_prompt(
            profile,
            &weather.location,
            plot_size_ha,
            Some(&weather.current),
            weather
                .forecast
                .iter()
                .map(|d| d.precipitation)
                .sum::<f64>(),
            market_outlook.as_deref(),
        );
        let recommendations = self.advisor.generate(&prompt).await?;

        Ok(PlantingSchedule {
            crop: profile.name.to_string(),
            location: weather.location,
            plot_size_ha,
            planting_season: profile.planting_season.to_string(),
            harvest_season: profile.harvest_season.to_string(),
            growing_days: profile.growing_days,
            weather_summary: Some(weather.current),
            market_outlook,
            recommendations,
            generated_at: self.clock.now(),
        })
    }

    /// Generate and persist a calendar covering several crops.
    #[instrument(skip(self, entries), level = "info")]
    pub async fn create_calendar(
        &self,
        user_id: &str,
        entries: &[CalendarEntry],
    ) -> PlantingResult<FarmCalendar> {
        let mut crops = Vec::with_capacity(entries.len());
        for entry in entries {
            let schedule = self
                .schedule(&entry.crop, &entry.location, entry.plot_size_ha)
                .await?;
            crops.push(schedule);
        }

        let calendar = FarmCalendar {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            crops,
            created_at: self.clock.now(),
        };

        let store = self.store.clone();
        let to_store = calendar.clone();
        tokio::task::spawn_blocking(move || store.lock().save_calendar(&to_store))
            .await
            .map_err(|e| PlantingError::storage(e.to_string()))??;

        Ok(calendar)
    }

    /// Previously saved calendars for a user, newest first.
    pub async fn calendars_for_user(&self, user_id: &str) -> PlantingResult<Vec<FarmCalendar>> {
        let store = self.store.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || store.lock().calendars_for_user(&user_id))
            .await
            .map_err(|e| PlantingError::storage(e.to_string()))?
    }

    /// AI task list for one month at one location.
    pub async fn monthly_tasks(
        &self,
        month: u32,
        location: &str,
        crops: &[String],
    ) -> PlantingResult<String> {
        if !(1..=12).contains(&month) {
            return Err(PlantingError::InvalidMonth(month));
        }

        let prompt = format!(
            "As a farming advisor, provide monthly farming tasks for month {} \
             in {}:\n\n\
             Crops being grown: {}\n\n\
             Please provide:\n\
             1. Planting activities for this month\n\
             2. Maintenance and care tasks\n\
             3. Harvesting activities\n\
             4. Soil preparation tasks\n\
             5. Pest and disease monitoring\n\
             6. Equipment maintenance\n\
             7. Market preparation activities\n\n\
             Organize by week within the month and prioritize by importance.",
            month,
            location,
            crops.join(", "),
        );

        Ok(self.advisor.generate(&prompt).await?)
    }

    /// AI seasonal recommendations for the current date.
    pub async fn seasonal_recommendations(
        &self,
        location: &str,
        farming_type: &str,
    ) -> PlantingResult<String> {
        let today = self.clock.today();
        let season = season_for_month(today.month());

        let prompt = format!(
            "As an agricultural consultant, provide seasonal farming \
             recommendations for {}:\n\n\
             Current month: {}\n\
             Current season: {}\n\
             Farming type: {}\n\n\
             Please provide:\n\
             1. Best crops to plant this season\n\
             2. Crops to avoid this season\n\
             3. Soil preparation recommendations\n\
             4. Irrigation planning\n\
             5. Pest and disease prevention\n\
             6. Market opportunities for this season\n\
             7. Equipment and resource planning\n\n\
             Focus on South African farming conditions and practices.",
            location,
            today.format("%B"),
            season.as_str(),
            farming_type,
        );

        Ok(self.advisor.generate(&prompt).await?)
    }
}

fn schedule_prompt(
    profile: &CropProfile,
    location: &str,
    plot_size_ha: Option<f64>,
    current: Option<&CurrentConditions>,
    forecast_precipitation_mm: f64,
    market_outlook: Option<&str>,
) -> String {
    let mut prompt = format!(
        "As an agricultural expert, provide optimal planting recommendations \
         for {} in {}:\n\n\
         Crop Information:\n\
         - Typical planting season: {}\n\
         - Growing period: {} days\n\
         - Optimal temperature: {}-{}°C\n\
         - Rainfall needs: {}-{}mm\n\n\
         Current Weather Conditions:\n",
        profile.name,
        location,
        profile.planting_season,
        profile.growing_days,
        profile.optimal_temp_c.0,
        profile.optimal_temp_c.1,
        profile.rainfall_needs_mm.0,
        profile.rainfall_needs_mm.1,
    );

    if let Some(current) = current {
        prompt.push_str(&format!(
            "- Current temperature: {}°C\n\
             - Current humidity: {}%\n\
             - Forecast precipitation: {:.1}mm\n",
            current.temperature, current.humidity, forecast_precipitation_mm,
        ));
    }

    if let Some(plot_size) = plot_size_ha {
        prompt.push_str(&format!("\nPlot size: {} hectares\n", plot_size));
    }

    if let Some(outlook) = market_outlook {
        let excerpt: String = outlook.chars().take(MARKET_CONTEXT_CHARS).collect();
        prompt.push_str(&format!("\nMarket Context:\n{}...\n", excerpt));
    }

    prompt.push_str(
        "\nPlease provide:\n\
         1. Best planting dates for the next 6 months\n\
         2. Expected harvest dates\n\
         3. Weather-based recommendations\n\
         4. Market timing considerations\n\
         5. Risk factors and mitigation strategies\n\
         6. Specific variety recommendations for this location\n\n\
         Format as a practical farming calendar with specific dates and actions.",
    );

    prompt
}
