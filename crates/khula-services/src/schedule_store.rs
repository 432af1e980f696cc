//! SQLite-based storage for saved farming calendars.

use rusqlite::{params, Connection};
use std::path::Path;

use crate::planting::{FarmCalendar, PlantingError, PlantingResult};

/// SQLite-backed store for generated farming calendars.
pub struct SqliteScheduleStore {
    conn: Connection,
}

impl SqliteScheduleStore {
    /// Create a schedule store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory schedule store (for testing).
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
            CREATE TABLE IF NOT EXISTS farm_calendars (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                calendar_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_calendars_user ON farm_calendars(user_id, created_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// Persist a generated calendar.
    pub fn save_calendar(&self, calendar: &FarmCalendar) -> PlantingResult<()> {
        let calendar_json = serde_json::to_string(calendar)
            .map_err(|e| PlantingError::storage(e.to_string()))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO farm_calendars (id, user_id, calendar_json, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    calendar.id.to_string(),
                    calendar.user_id,
                    calendar_json,
                    calendar.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| PlantingError::storage(e.to_string()))?;

        tracing::debug!("Saved calendar {} for user {}", calendar.id, calendar.user_id);
        Ok(())
    }

    /// Saved calendars for one user, newest first.
    pub fn calendars_for_user(&self, user_id: &str) -> PlantingResult<Vec<FarmCalendar>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT calendar_json FROM farm_calendars
                 WHERE user_id = ?1
                 ORDER BY created_at DESC",
            )
            .map_err(|e| PlantingError::storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .map_err(|e| PlantingError::storage(e.to_string()))?;

        let mut calendars = Vec::new();
        for row in rows {
            let json = row.map_err(|e| PlantingError::storage(e.to_string()))?;
            let calendar: FarmCalendar = serde_json::from_str(&json)
                .map_err(|e| PlantingError::storage(e.to_string()))?;
            calendars.push(calendar);
        }

        Ok(calendars)
    }

    /// Number of saved calendars.
    pub fn count(&self) -> PlantingResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM farm_calendars", [], |row| row.get(0))
            .map_err(|e| PlantingError::storage(e.to_string()))?;
        Ok(count as usize)
    }
}
