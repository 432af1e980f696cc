//! Threshold-derived weather alerts for farming operations.

use serde::{Deserialize, Serialize};

use crate::types::WeatherRecord;

/// How many forecast days feed the precipitation alerts.
const PRECIPITATION_WINDOW_DAYS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HeatWarning,
    FrostWarning,
    HeavyRain,
    DroughtRisk,
    HighWind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    High,
    Medium,
}

/// A single actionable warning derived from a weather record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Derive farming alerts from a weather record.
pub fn derive_alerts(record: &WeatherRecord) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();
    let current = &record.current;

    if current.temperature > 35.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::HeatWarning,
            severity: AlertSeverity::High,
            message: format!(
                "High temperature alert: {}°C. Consider additional irrigation.",
                current.temperature
            ),
        });
    } else if current.temperature < 5.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::FrostWarning,
            severity: AlertSeverity::High,
            message: format!(
                "Frost risk: {}°C. Protect sensitive crops.",
                current.temperature
            ),
        });
    }

    let upcoming_precipitation: f64 = record
        .forecast
        .iter()
        .take(PRECIPITATION_WINDOW_DAYS)
        .map(|day| day.precipitation)
        .sum();
    if upcoming_precipitation > 50.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::HeavyRain,
            severity: AlertSeverity::Medium,
            message: format!(
                "Heavy rain expected: {}mm over next {} days. Check drainage.",
                upcoming_precipitation, PRECIPITATION_WINDOW_DAYS
            ),
        });
    } else if upcoming_precipitation < 5.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::DroughtRisk,
            severity: AlertSeverity::Medium,
            message: "Low precipitation forecast. Plan irrigation schedule.".to_string(),
        });
    }

    if current.wind_speed > 30.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::HighWind,
            severity: AlertSeverity::Medium,
            message: format!(
                "High wind speed: {} km/h. Secure equipment and check for crop damage.",
                current.wind_speed
            ),
        });
    }

    alerts
}
