use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use khula_advisor::AdvisorError;

/// Weather condition categories mapped from OpenWeatherMap condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_id(id: i32) -> Self {
        match id {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            600..=602 | 620..=622 => Self::Snow,
            611..=616 => Self::Sleet,
            701..=762 => Self::Fog, // Mist, haze, dust, ash
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown ids default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Current weather conditions for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Air temperature in degrees Celsius
    pub temperature: f64,
    pub feels_like: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Precipitation over the last hour in millimetres
    pub precipitation: f64,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Wind direction in degrees
    pub wind_direction: f64,
    /// Pressure in hPa
    pub pressure: f64,
    pub condition: WeatherCondition,
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Expected precipitation in millimetres
    pub precipitation: f64,
    /// Maximum wind speed in km/h
    pub wind_speed_max: f64,
    pub condition: WeatherCondition,
}

/// Weather for one location on one calendar day.
///
/// At most one record per `(location, date)` pair is authoritative; the
/// store is keyed by that pair. Records are created once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: String,
    /// The calendar day this record is valid for
    pub date: NaiveDate,
    pub current: CurrentConditions,
    /// Up to 7 daily forecast entries, ordered by date
    pub forecast: Vec<ForecastDay>,
    /// When the provider was queried
    pub fetched_at: DateTime<Utc>,
}

/// Errors from the external weather provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No provider API key configured")]
    MissingApiKey,
}

/// Errors from the local weather record store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Blocking task failed: {0}")]
    Task(String),
}

/// Weather service errors.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location must not be empty")]
    EmptyLocation,

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyLocation => "Please enter a location.".to_string(),
            Self::UnknownLocation(name) => {
                format!("\"{}\" is not a supported region.", name)
            }
            Self::Provider(_) => "Weather service unavailable. Please try again later.".to_string(),
            Self::Storage(_) => "Unable to access local weather data.".to_string(),
            Self::Advisor(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_owm_id_thunderstorm() {
        assert_eq!(WeatherCondition::from_owm_id(200), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_id(212), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_id(232), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_owm_id_drizzle() {
        assert_eq!(WeatherCondition::from_owm_id(300), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_id(321), WeatherCondition::Drizzle);
    }

    #[test]
    fn test_owm_id_rain() {
        assert_eq!(WeatherCondition::from_owm_id(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(501), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(520), WeatherCondition::Rain);
    }

    #[test]
    fn test_owm_id_heavy_rain() {
        assert_eq!(WeatherCondition::from_owm_id(502), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_owm_id(504), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_owm_id(531), WeatherCondition::HeavyRain);
    }

    #[test]
    fn test_owm_id_sleet() {
        assert_eq!(WeatherCondition::from_owm_id(511), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(611), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(616), WeatherCondition::Sleet);
    }

    #[test]
    fn test_owm_id_snow() {
        assert_eq!(WeatherCondition::from_owm_id(600), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_id(602), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_id(622), WeatherCondition::Snow);
    }

    #[test]
    fn test_owm_id_fog() {
        assert_eq!(WeatherCondition::from_owm_id(701), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_owm_id(741), WeatherCondition::Fog);
    }

    #[test]
    fn test_owm_id_clear_and_clouds() {
        assert_eq!(WeatherCondition::from_owm_id(800), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(801), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_owm_id(802), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_owm_id(803), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_owm_id(804), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_owm_id_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_owm_id(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_condition_description() {
        assert_eq!(WeatherCondition::Clear.description(), "Clear");
        assert_eq!(WeatherCondition::Thunderstorm.description(), "Thunderstorm");
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let record = WeatherRecord {
            location: "Cape Town".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            current: CurrentConditions {
                temperature: 22.0,
                feels_like: 21.5,
                humidity: 60.0,
                precipitation: 0.0,
                wind_speed: 12.0,
                wind_direction: 180.0,
                pressure: 1015.0,
                condition: WeatherCondition::Clear,
            },
            forecast: vec![],
            fetched_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("Cape Town"));
        let back: WeatherRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
