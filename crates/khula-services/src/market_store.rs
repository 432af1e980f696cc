//! SQLite-based storage for market price snapshots.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::market::{MarketError, MarketResult, PriceTrend};

/// A persisted market trend snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub id: i64,
    pub crop: String,
    pub trend: PriceTrend,
    pub captured_at: DateTime<Utc>,
}

/// SQLite-backed market snapshot store.
pub struct SqliteMarketStore {
    conn: Connection,
}

impl SqliteMarketStore {
    /// Create a market store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory market store (for testing).
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
            CREATE TABLE IF NOT EXISTS market_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crop TEXT NOT NULL,
                trend_json TEXT NOT NULL,
                captured_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_crop ON market_snapshots(crop, captured_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// Persist a trend snapshot for a crop.
    pub fn save_snapshot(&self, trend: &PriceTrend) -> MarketResult<i64> {
        let trend_json = serde_json::to_string(trend)
            .map_err(|e| MarketError::storage(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO market_snapshots (crop, trend_json, captured_at) VALUES (?1, ?2, ?3)",
                params![trend.crop, trend_json, Utc::now().to_rfc3339()],
            )
            .map_err(|e| MarketError::storage(e.to_string()))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Latest snapshots, newest first, optionally filtered by crop.
    pub fn latest_snapshots(
        &self,
        crop: Option<&str>,
        limit: usize,
    ) -> MarketResult<Vec<MarketSnapshot>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, crop, trend_json, captured_at
                 FROM market_snapshots
                 WHERE (?1 IS NULL OR crop = ?1)
                 ORDER BY captured_at DESC, id DESC
                 LIMIT ?2",
            )
            .map_err(|e| MarketError::storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![crop, limit as i64], |row| {
                let id: i64 = row.get(0)?;
                let crop: String = row.get(1)?;
                let trend_json: String = row.get(2)?;
                let captured_at_str: String = row.get(3)?;
                Ok((id, crop, trend_json, captured_at_str))
            })
            .map_err(|e| MarketError::storage(e.to_string()))?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (id, crop, trend_json, captured_at_str) =
                row.map_err(|e| MarketError::storage(e.to_string()))?;
            let trend: PriceTrend = serde_json::from_str(&trend_json)
                .map_err(|e| MarketError::storage(e.to_string()))?;
            let captured_at = DateTime::parse_from_rfc3339(&captured_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            snapshots.push(MarketSnapshot {
                id,
                crop,
                trend,
                captured_at,
            });
        }

        Ok(snapshots)
    }
}
