//! SQLite-backed session cache for weather rows and predictions.
//!
//! The store holds rows for at most one city in normal operation: the
//! coordinator purges a city's rows wholesale before caching another, so
//! despite the append-only insert API the tables act as a single-active-city
//! cache, not a history. Nothing survives a restart on purpose; the binary
//! wipes both tables at startup.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open weather store: {0}")]
    Open(String),
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("Storage task failed: {0}")]
    Task(String),
}

/// One durable weather row.
///
/// `temperature` is the current-day observed value while `humidity` and
/// `wind_speed` belong to the forecast day, the pairing the external
/// predictor trains on. The store persists whatever row it is handed; the
/// coordinator owns that policy.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// SQLite store for weather and prediction rows.
pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Open(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store. Used by tests and ephemeral sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                temperature REAL NOT NULL,
                humidity REAL NOT NULL,
                wind_speed REAL NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                preds REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_city_date ON weather_data(city, date);
            CREATE INDEX IF NOT EXISTS idx_city_created ON predictions(city, created_at);
            "#,
        )?;
        Ok(())
    }

    /// Delete every row in both tables. Called once at process start to
    /// discard leftovers from a prior session.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("DELETE FROM weather_data; DELETE FROM predictions;")?;
        tracing::info!("Cleared all cached weather and prediction rows");
        Ok(())
    }

    /// Delete one city's rows from both tables in a single transaction.
    /// On failure the store is unchanged.
    pub fn purge_city(&mut self, city: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM weather_data WHERE city = ?1", params![city])?;
        tx.execute("DELETE FROM predictions WHERE city = ?1", params![city])?;
        tx.commit()?;
        tracing::debug!("Purged cached rows for {}", city);
        Ok(())
    }

    /// Atomically replace a city's cached rows: delete its weather and
    /// prediction rows, then insert the new weather row. All-or-nothing; on
    /// failure the caller may assume the store is unchanged.
    pub fn replace_city_records(
        &mut self,
        city: &str,
        temperature: f64,
        humidity: f64,
        wind_speed: f64,
        date: NaiveDate,
    ) -> Result<WeatherRecord, StoreError> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM weather_data WHERE city = ?1", params![city])?;
        tx.execute("DELETE FROM predictions WHERE city = ?1", params![city])?;
        tx.execute(
            "INSERT INTO weather_data (city, temperature, humidity, wind_speed, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                city,
                temperature,
                humidity,
                wind_speed,
                date.format("%Y-%m-%d").to_string(),
                now.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!("Replaced cached rows for {}", city);
        Ok(WeatherRecord {
            city: city.to_string(),
            temperature,
            humidity,
            wind_speed,
            date,
            created_at: now,
        })
    }

    /// Append a prediction row for a city. This is the write path the
    /// external predictor process exercises.
    pub fn insert_prediction(&self, city: &str, value: f64) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO predictions (city, preds, created_at) VALUES (?1, ?2, ?3)",
            params![city, value, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!("Stored prediction {} for {}", value, city);
        Ok(())
    }

    /// Latest prediction for a city, or `None` if no row exists yet.
    /// A stored value of exactly 0.0 is a value, not absence.
    pub fn latest_prediction(&self, city: &str) -> Result<Option<f64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT preds FROM predictions WHERE city = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![city])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Latest weather row for a city, if any.
    pub fn weather_for(&self, city: &str) -> Result<Option<WeatherRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT city, temperature, humidity, wind_speed, date, created_at
             FROM weather_data WHERE city = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![city])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// Every weather row in insertion order. This is the view the external
    /// predictor reads as its feature input.
    pub fn weather_rows(&self) -> Result<Vec<WeatherRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT city, temperature, humidity, wind_speed, date, created_at
             FROM weather_data ORDER BY id",
        )?;
        let rows = stmt.query_map([], Self::row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Distinct cities with cached weather rows.
    pub fn stored_cities(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT city FROM weather_data ORDER BY city")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Convert a database row to a WeatherRecord.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
        let date_str: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive());
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(WeatherRecord {
            city: row.get(0)?,
            temperature: row.get(1)?,
            humidity: row.get(2)?,
            wind_speed: row.get(3)?,
            date,
            created_at,
        })
    }
}
