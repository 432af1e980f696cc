//! Simulated crop market board.
//!
//! There is no live commodity feed; prices are a fixed ZAR/ton base per crop
//! with random daily movement, and history is synthesized the same way.
//! Snapshots are persisted so past boards stay inspectable.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use khula_advisor::{AdvisorClient, AdvisorError};

use crate::market_store::{MarketSnapshot, SqliteMarketStore};

/// Base prices in ZAR per ton for the supported crops.
const BASE_PRICES: &[(&str, f64)] = &[
    ("maize", 4500.0),
    ("wheat", 6200.0),
    ("soybeans", 8500.0),
    ("sunflower", 7800.0),
    ("potatoes", 3200.0),
    ("tomatoes", 8500.0),
    ("onions", 4800.0),
    ("carrots", 5200.0),
    ("cabbage", 2800.0),
    ("beans", 12000.0),
];

const PRICE_UNIT: &str = "R/ton";

/// Daily price movement bound in percent.
const DAILY_MOVE_PERCENT: f64 = 5.0;

/// Historical variation bound in percent.
const HISTORY_MOVE_PERCENT: f64 = 10.0;

/// Errors that can occur during market operations.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Unknown crop: {0}")]
    UnknownCrop(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),
}

impl MarketError {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// Result type for market operations.
pub type MarketResult<T> = Result<T, MarketError>;

/// Today's simulated quote for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPrice {
    pub crop: String,
    pub price: f64,
    pub unit: String,
    pub change_percent: f64,
    pub last_updated: DateTime<Utc>,
}

/// One day of simulated price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: u32,
}

/// Current price plus simulated history for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrend {
    pub crop: String,
    pub current_price: f64,
    pub unit: String,
    pub change_percent: f64,
    pub history: Vec<PricePoint>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketAlertKind {
    PriceMovement,
    TargetReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketAlertSeverity {
    High,
    Medium,
}

/// A price alert for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAlert {
    pub kind: MarketAlertKind,
    pub severity: MarketAlertSeverity,
    pub message: String,
    pub current_price: f64,
}

/// Crops the market board covers.
pub fn supported_crops() -> Vec<&'static str> {
    BASE_PRICES.iter().map(|(crop, _)| *crop).collect()
}

fn base_price(crop: &str) -> Option<f64> {
    let needle = crop.trim().to_lowercase();
    BASE_PRICES
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, price)| *price)
}

fn round0(v: f64) -> f64 {
    v.round()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Derive alerts from a trend and an optional target price.
pub fn derive_alerts(trend: &PriceTrend, target_price: Option<f64>) -> Vec<MarketAlert> {
    let mut alerts = Vec::new();

    if trend.change_percent.abs() > 3.0 {
        let direction = if trend.change_percent > 0.0 {
            "increased"
        } else {
            "decreased"
        };
        let severity = if trend.change_percent.abs() > 5.0 {
            MarketAlertSeverity::High
        } else {
            MarketAlertSeverity::Medium
        };
        alerts.push(MarketAlert {
            kind: MarketAlertKind::PriceMovement,
            severity,
            message: format!(
                "{} price has {} by {:.1}% to R{}/ton",
                capitalize(&trend.crop),
                direction,
                trend.change_percent.abs(),
                trend.current_price
            ),
            current_price: trend.current_price,
        });
    }

    if let Some(target) = target_price {
        if trend.current_price >= target {
            alerts.push(MarketAlert {
                kind: MarketAlertKind::TargetReached,
                severity: MarketAlertSeverity::High,
                message: format!(
                    "{} has reached your target price of R{}/ton (Current: R{}/ton)",
                    capitalize(&trend.crop),
                    target,
                    trend.current_price
                ),
                current_price: trend.current_price,
            });
        }
    }

    alerts
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Market board operations: simulated quotes, trends, alerts, AI analysis.
#[derive(Clone)]
pub struct MarketService {
    store: Arc<Mutex<SqliteMarketStore>>,
    advisor: Arc<AdvisorClient>,
    history_days: u32,
}

impl MarketService {
    pub fn new(store: SqliteMarketStore, advisor: Arc<AdvisorClient>, history_days: u32) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            advisor,
            history_days,
        }
    }

    /// Today's simulated prices for every supported crop.
    pub fn current_prices(&self) -> Vec<CropPrice> {
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        BASE_PRICES
            .iter()
            .map(|(crop, base)| {
                let change = rng.gen_range(-DAILY_MOVE_PERCENT..=DAILY_MOVE_PERCENT);
                CropPrice {
                    crop: (*crop).to_string(),
                    price: round0(base * (1.0 + change / 100.0)),
                    unit: PRICE_UNIT.to_string(),
                    change_percent: round2(change),
                    last_updated: now,
                }
            })
            .collect()
    }

    /// Simulated price trend for one crop, persisted as a snapshot.
    #[instrument(skip(self), level = "info")]
    pub async fn trend(&self, crop: &str) -> MarketResult<PriceTrend> {
        let base = base_price(crop).ok_or_else(|| MarketError::UnknownCrop(crop.to_string()))?;
        let crop = crop.trim().to_lowercase();
        let now = Utc::now();
        let today = now.date_naive();

        let (change, history) = {
            let mut rng = rand::thread_rng();
            let change = round2(rng.gen_range(-DAILY_MOVE_PERCENT..=DAILY_MOVE_PERCENT));

            let history = (1..=self.history_days)
                .rev()
                .filter_map(|days_ago| {
                    let date = today.checked_sub_days(Days::new(u64::from(days_ago)))?;
                    let variation: f64 =
                        rng.gen_range(-HISTORY_MOVE_PERCENT..=HISTORY_MOVE_PERCENT);
                    Some(PricePoint {
                        date,
                        price: round0(base * (1.0 + variation / 100.0)),
                        volume: rng.gen_range(100..=1000),
                    })
                })
                .collect::<Vec<_>>();
            (change, history)
        };

        let trend = PriceTrend {
            crop,
            current_price: round0(base * (1.0 + change / 100.0)),
            unit: PRICE_UNIT.to_string(),
            change_percent: change,
            history,
            last_updated: now,
        };

        let store = self.store.clone();
        let to_store = trend.clone();
        tokio::task::spawn_blocking(move || store.lock().save_snapshot(&to_store))
            .await
            .map_err(|e| MarketError::storage(e.to_string()))??;

        Ok(trend)
    }

    /// Price alerts for one crop against an optional target price.
    pub async fn price_alerts(
        &self,
        crop: &str,
        target_price: Option<f64>,
    ) -> MarketResult<Vec<MarketAlert>> {
        let trend = self.trend(crop).await?;
        Ok(derive_alerts(&trend, target_price))
    }

    /// AI market analysis for one crop.
    #[instrument(skip(self), level = "info")]
    pub async fn analysis(&self, crop: &str) -> MarketResult<String> {
        let trend = self.trend(crop).await?;
        let prompt = analysis_prompt(&trend, "South Africa");
        Ok(self.advisor.generate(&prompt).await?)
    }

    /// AI narrative of seasonal price patterns for one crop.
    pub async fn seasonal_trends(&self, crop: &str) -> MarketResult<String> {
        if base_price(crop).is_none() {
            return Err(MarketError::UnknownCrop(crop.to_string()));
        }
        let prompt = seasonal_prompt(crop);
        Ok(self.advisor.generate(&prompt).await?)
    }

    /// Recently persisted snapshots, newest first.
    pub async fn recent_snapshots(
        &self,
        crop: Option<&str>,
        limit: usize,
    ) -> MarketResult<Vec<MarketSnapshot>> {
        let store = self.store.clone();
        let crop = crop.map(str::to_string);
        tokio::task::spawn_blocking(move || store.lock().latest_snapshots(crop.as_deref(), limit))
            .await
            .map_err(|e| MarketError::storage(e.to_string()))?
    }
}

fn analysis_prompt(trend: &PriceTrend, location: &str) -> String {
    let avg_price = if trend.history.is_empty() {
        trend.current_price
    } else {
        trend.history.iter().map(|p| p.price).sum::<f64>() / trend.history.len() as f64
    };
    let vs_average = if avg_price == 0.0 {
        0.0
    } else {
        (trend.current_price - avg_price) / avg_price * 100.0
    };

    format!(
        "As an agricultural market analyst, provide analysis for {} in {}:\n\n\
         Current Market Data:\n\
         - Current Price: R{}/ton\n\
         - Price Change: {}%\n\
         - {}-day Average: R{:.0}/ton\n\
         - Price vs Average: {:.1}%\n\n\
         Please provide:\n\
         1. Market outlook for {} (bullish/bearish/neutral)\n\
         2. Key factors affecting current prices\n\
         3. Price predictions for the next 30 days\n\
         4. Best selling strategies for farmers\n\
         5. Optimal timing for market entry\n\
         6. Risk factors to consider\n\n\
         Keep the analysis practical and actionable for South African farmers.",
        trend.crop,
        location,
        trend.current_price,
        trend.change_percent,
        trend.history.len(),
        avg_price,
        vs_average,
        trend.crop,
    )
}

fn seasonal_prompt(crop: &str) -> String {
    format!(
        "As an agricultural economist, provide seasonal price trends for {} \
         in South Africa:\n\n\
         Please analyze:\n\
         1. Typical price patterns throughout the year\n\
         2. Peak and low price seasons\n\
         3. Factors driving seasonal variations\n\
         4. Best planting times for optimal market prices\n\
         5. Storage vs immediate sale recommendations\n\
         6. Regional price differences within South Africa\n\n\
         Provide specific months and expected price ranges where possible.",
        crop
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn test_advisor() -> Arc<AdvisorClient> {
        Arc::new(
            AdvisorClient::new("http://localhost:9", Some("test-key".to_string()), "test-model")
                .unwrap(),
        )
    }

    fn test_service() -> MarketService {
        MarketService::new(
            SqliteMarketStore::in_memory().unwrap(),
            test_advisor(),
            30,
        )
    }

    #[test]
    fn test_current_prices_cover_all_crops() {
        let service = test_service();
        let prices = service.current_prices();

        assert_eq!(prices.len(), BASE_PRICES.len());
        for price in &prices {
            assert!(price.price > 0.0);
            assert!(price.change_percent.abs() <= DAILY_MOVE_PERCENT);
            assert_eq!(price.unit, "R/ton");
        }
    }

    #[test]
    fn test_prices_stay_within_daily_band() {
        let service = test_service();
        for price in service.current_prices() {
            let base = base_price(&price.crop).unwrap();
            let deviation = (price.price - base).abs() / base * 100.0;
            // Rounding to whole rand can nudge slightly past the band.
            assert!(deviation <= DAILY_MOVE_PERCENT + 0.1);
        }
    }

    #[tokio::test]
    async fn test_trend_builds_history_and_persists() {
        let service = test_service();
        let trend = service.trend("maize").await.unwrap();

        assert_eq!(trend.crop, "maize");
        assert_eq!(trend.history.len(), 30);
        // History is ordered oldest to newest, all before today.
        let today = Utc::now().date_naive();
        for pair in trend.history.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        assert!(trend.history.iter().all(|p| p.date < today));
        assert!(trend
            .history
            .iter()
            .all(|p| (100..=1000).contains(&p.volume)));

        let snapshots = service.recent_snapshots(Some("maize"), 10).await.unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test]
    async fn test_trend_unknown_crop() {
        let service = test_service();
        let err = service.trend("dragonfruit").await.unwrap_err();
        assert!(matches!(err, MarketError::UnknownCrop(_)));
    }

    #[tokio::test]
    async fn test_trend_accepts_mixed_case() {
        let service = test_service();
        let trend = service.trend("  Maize ").await.unwrap();
        assert_eq!(trend.crop, "maize");
    }

    #[test]
    fn test_alerts_on_large_movement() {
        let trend = PriceTrend {
            crop: "maize".to_string(),
            current_price: 4800.0,
            unit: "R/ton".to_string(),
            change_percent: 6.2,
            history: vec![],
            last_updated: Utc::now(),
        };

        let alerts = derive_alerts(&trend, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, MarketAlertKind::PriceMovement);
        assert_eq!(alerts[0].severity, MarketAlertSeverity::High);
        assert!(alerts[0].message.contains("increased"));
    }

    #[test]
    fn test_alerts_on_moderate_drop() {
        let trend = PriceTrend {
            crop: "wheat".to_string(),
            current_price: 5950.0,
            unit: "R/ton".to_string(),
            change_percent: -4.0,
            history: vec![],
            last_updated: Utc::now(),
        };

        let alerts = derive_alerts(&trend, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, MarketAlertSeverity::Medium);
        assert!(alerts[0].message.contains("decreased"));
    }

    #[test]
    fn test_alert_on_target_reached() {
        let trend = PriceTrend {
            crop: "beans".to_string(),
            current_price: 12500.0,
            unit: "R/ton".to_string(),
            change_percent: 1.0,
            history: vec![],
            last_updated: Utc::now(),
        };

        let alerts = derive_alerts(&trend, Some(12000.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, MarketAlertKind::TargetReached);
    }

    #[test]
    fn test_no_alerts_on_quiet_market() {
        let trend = PriceTrend {
            crop: "onions".to_string(),
            current_price: 4810.0,
            unit: "R/ton".to_string(),
            change_percent: 0.5,
            history: vec![],
            last_updated: Utc::now(),
        };

        assert!(derive_alerts(&trend, Some(5000.0)).is_empty());
    }

    #[test]
    fn test_supported_crops_listed() {
        let crops = supported_crops();
        assert!(crops.contains(&"maize"));
        assert!(crops.contains(&"beans"));
        assert_eq!(crops.len(), 10);
    }

    #[test]
    fn test_analysis_prompt_contains_market_data() {
        let trend = PriceTrend {
            crop: "maize".to_string(),
            current_price: 4600.0,
            unit: "R/ton".to_string(),
            change_percent: 2.2,
            history: vec![PricePoint {
                date: Utc::now().date_naive(),
                price: 4400.0,
                volume: 300,
            }],
            last_updated: Utc::now(),
        };

        let prompt = analysis_prompt(&trend, "South Africa");
        assert!(prompt.contains("R4600/ton"));
        assert!(prompt.contains("maize"));
        assert!(prompt.contains("1-day Average"));
    }
}
