//! Weather service for Khula
//!
//! Provides weather data for supported farming regions via the
//! OpenWeatherMap API, with one provider fetch per location per day backed
//! by a persistent record store.

pub mod alerts;
pub mod clock;
pub mod provider;
pub mod regions;
pub mod service;
pub mod store;
pub mod types;

pub use alerts::{derive_alerts, AlertKind, AlertSeverity, WeatherAlert};
pub use clock::{Clock, SystemClock};
pub use provider::{Observation, OpenWeatherProvider, WeatherSource};
pub use regions::{Region, REGIONS};
pub use service::WeatherService;
pub use store::{SqliteWeatherStore, WeatherStore};
pub use types::*;
