//! OpenWeatherMap provider client.
//!
//! Queries current conditions plus the 5-day/3-hour forecast and folds the
//! forecast entries into daily aggregates (at most 7 days).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::instrument;

use crate::regions::Region;
use crate::types::{CurrentConditions, ForecastDay, ProviderError, WeatherCondition};

const MAX_FORECAST_DAYS: usize = 7;

/// One observation from the provider: current conditions plus the daily
/// forecast for the coming days.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
}

/// An external source of weather observations.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch current conditions and the multi-day forecast for a region.
    async fn observe(&self, region: &Region) -> Result<Observation, ProviderError>;
}

/// OpenWeatherMap-backed weather source.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    forecast_days: usize,
}

impl OpenWeatherProvider {
    /// Create a provider against the given API base URL.
    ///
    /// `api_key` may be absent; every observation then fails with
    /// `ProviderError::MissingApiKey` instead of hitting the network.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        forecast_days: usize,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            forecast_days: forecast_days.min(MAX_FORECAST_DAYS),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    #[instrument(skip(self, region), fields(region = region.name), level = "info")]
    async fn observe(&self, region: &Region) -> Result<Observation, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let current_url = format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            self.base_url, region.latitude, region.longitude, key
        );
        let current: ApiCurrent = self.get_json(&current_url).await?;

        let forecast_url = format!(
            "{}/forecast?lat={}&lon={}&appid={}&units=metric",
            self.base_url, region.latitude, region.longitude, key
        );
        let forecast: ApiForecast = self.get_json(&forecast_url).await?;

        Ok(Observation {
            current: current.into_conditions()?,
            forecast: fold_daily(&forecast.list, self.forecast_days),
        })
    }
}

/// Group 3-hourly forecast entries by calendar day and aggregate each day.
fn fold_daily(entries: &[ApiForecastEntry], max_days: usize) -> Vec<ForecastDay> {
    let mut days: BTreeMap<NaiveDate, Vec<&ApiForecastEntry>> = BTreeMap::new();
    for entry in entries {
        let Some(ts) = DateTime::from_timestamp(entry.dt, 0) else {
            continue;
        };
        days.entry(ts.date_naive()).or_default().push(entry);
    }

    days.into_iter()
        .take(max_days.min(MAX_FORECAST_DAYS))
        .map(|(date, items)| {
            let temp_min = items
                .iter()
                .map(|i| i.main.temp)
                .fold(f64::INFINITY, f64::min);
            let temp_max = items
                .iter()
                .map(|i| i.main.temp)
                .fold(f64::NEG_INFINITY, f64::max);
            let precipitation: f64 = items
                .iter()
                .map(|i| i.rain_mm() + i.snow_mm())
                .sum();
            let wind_speed_max = items
                .iter()
                .map(|i| i.wind.speed * 3.6)
                .fold(0.0, f64::max);
            let condition = items
                .first()
                .and_then(|i| i.weather.first())
                .map(|w| WeatherCondition::from_owm_id(w.id))
                .unwrap_or_default();

            ForecastDay {
                date,
                temp_min: round1(temp_min),
                temp_max: round1(temp_max),
                precipitation: round2(precipitation),
                wind_speed_max: round1(wind_speed_max),
                condition,
            }
        })
        .collect()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// OpenWeatherMap wire format

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    main: ApiMain,
    weather: Vec<ApiWeather>,
    wind: ApiWind,
    rain: Option<ApiVolume>,
}

impl ApiCurrent {
    fn into_conditions(self) -> Result<CurrentConditions, ProviderError> {
        let weather = self
            .weather
            .first()
            .ok_or_else(|| ProviderError::Parse("empty weather array".to_string()))?;

        Ok(CurrentConditions {
            temperature: round1(self.main.temp),
            feels_like: round1(self.main.feels_like),
            humidity: self.main.humidity,
            precipitation: self.rain.as_ref().and_then(|r| r.one_hour).unwrap_or(0.0),
            // OpenWeatherMap reports wind in m/s; store km/h
            wind_speed: round1(self.wind.speed * 3.6),
            wind_direction: self.wind.deg.unwrap_or(0.0),
            pressure: self.main.pressure,
            condition: WeatherCondition::from_owm_id(weather.id),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct ApiWeather {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct ApiWind {
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiVolume {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    list: Vec<ApiForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastEntry {
    dt: i64,
    main: ApiForecastMain,
    weather: Vec<ApiWeather>,
    wind: ApiWind,
    rain: Option<ApiVolume>,
    snow: Option<ApiVolume>,
}

impl ApiForecastEntry {
    fn rain_mm(&self) -> f64 {
        self.rain
            .as_ref()
            .and_then(|v| v.three_hours)
            .unwrap_or(0.0)
    }

    fn snow_mm(&self) -> f64 {
        self.snow
            .as_ref()
            .and_then(|v| v.three_hours)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct ApiForecastMain {
    temp: f64,
}
