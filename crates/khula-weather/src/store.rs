//! SQLite-backed store for daily weather records.
//!
//! Records are keyed by the `(location, date)` composite primary key, so a
//! same-day re-fetch replaces the existing row (last write wins).

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::types::{
    CurrentConditions, ForecastDay, StorageError, WeatherCondition, WeatherRecord,
};

/// Storage backend for weather records.
///
/// Implementations don't need to be Sync - the service wraps the store in a
/// Mutex and accesses it from blocking tasks.
pub trait WeatherStore: Send {
    /// Point lookup by the `(location, date)` composite key.
    fn get(&self, location: &str, date: NaiveDate) -> Result<Option<WeatherRecord>, StorageError>;

    /// Insert or replace the record keyed by `(record.location, record.date)`.
    fn put(&self, record: &WeatherRecord) -> Result<(), StorageError>;
}

/// SQLite-backed weather record store.
pub struct SqliteWeatherStore {
    conn: Connection,
}

impl SqliteWeatherStore {
    /// Create a store at the given path, creating file and schema if needed.
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_records (
                location TEXT NOT NULL,
                date TEXT NOT NULL,
                temperature REAL NOT NULL,
                feels_like REAL NOT NULL,
                humidity REAL NOT NULL,
                precipitation REAL NOT NULL,
                wind_speed REAL NOT NULL,
                wind_direction REAL NOT NULL,
                pressure REAL NOT NULL,
                condition TEXT NOT NULL,
                forecast_json TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (location, date)
            );

            CREATE INDEX IF NOT EXISTS idx_weather_records_date ON weather_records(date);
            "#,
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<(WeatherRecord, String)> {
        let location: String = row.get(0)?;
        let date_str: String = row.get(1)?;
        let condition_str: String = row.get(9)?;
        let forecast_json: String = row.get(10)?;
        let fetched_at_str: String = row.get(11)?;

        let date = date_str.parse::<NaiveDate>().unwrap_or_default();
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let record = WeatherRecord {
            location,
            date,
            current: CurrentConditions {
                temperature: row.get(2)?,
                feels_like: row.get(3)?,
                humidity: row.get(4)?,
                precipitation: row.get(5)?,
                wind_speed: row.get(6)?,
                wind_direction: row.get(7)?,
                pressure: row.get(8)?,
                condition: condition_from_str(&condition_str),
            },
            forecast: Vec::new(),
            fetched_at,
        };

        Ok((record, forecast_json))
    }
}

impl WeatherStore for SqliteWeatherStore {
    fn get(&self, location: &str, date: NaiveDate) -> Result<Option<WeatherRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT location, date, temperature, feels_like, humidity, precipitation,
                        wind_speed, wind_direction, pressure, condition, forecast_json, fetched_at
                 FROM weather_records WHERE location = ?1 AND date = ?2",
                params![location, date.to_string()],
                Self::row_to_record,
            )
            .optional()?;

        match row {
            Some((mut record, forecast_json)) => {
                record.forecast = serde_json::from_str::<Vec<ForecastDay>>(&forecast_json)
                    .map_err(|e| StorageError::Serialize(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put(&self, record: &WeatherRecord) -> Result<(), StorageError> {
        let forecast_json = serde_json::to_string(&record.forecast)
            .map_err(|e| StorageError::Serialize(e.to_string()))?;

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO weather_records
            (location, date, temperature, feels_like, humidity, precipitation,
             wind_speed, wind_direction, pressure, condition, forecast_json, fetched_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.location,
                record.date.to_string(),
                record.current.temperature,
                record.current.feels_like,
                record.current.humidity,
                record.current.precipitation,
                record.current.wind_speed,
                record.current.wind_direction,
                record.current.pressure,
                condition_to_str(record.current.condition),
                forecast_json,
                record.fetched_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!("Stored weather record for {} on {}", record.location, record.date);
        Ok(())
    }
}

fn condition_to_str(condition: WeatherCondition) -> &'static str {
    match condition {
        WeatherCondition::Clear => "clear",
        WeatherCondition::PartlyCloudy => "partly_cloudy",
        WeatherCondition::Cloudy => "cloudy",
        WeatherCondition::Fog => "fog",
        WeatherCondition::Drizzle => "drizzle",
        WeatherCondition::Rain => "rain",
        WeatherCondition::HeavyRain => "heavy_rain",
        WeatherCondition::Snow => "snow",
        WeatherCondition::Sleet => "sleet",
        WeatherCondition::Thunderstorm => "thunderstorm",
    }
}

fn condition_from_str(s: &str) -> WeatherCondition {
    match s {
        "partly_cloudy" => WeatherCondition::PartlyCloudy,
        "cloudy" => WeatherCondition::Cloudy,
        "fog" => WeatherCondition::Fog,
        "drizzle" => WeatherCondition::Drizzle,
        "rain" => WeatherCondition::Rain,
        "heavy_rain" => WeatherCondition::HeavyRain,
        "snow" => WeatherCondition::Snow,
        "sleet" => WeatherCondition::Sleet,
        "thunderstorm" => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Clear,
    }
}
