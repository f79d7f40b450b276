use std::path::Path;
use std::sync::Mutex;

use chrono::TimeZone;
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::ForecastError;
use crate::instrument::Instrument;
use crate::model::feature_row::FeatureRow;

/// SQLite-backed processed-feature table. The refresh pipeline writes it;
/// the forecast core only ever reads the newest rows.
pub struct StoredHistory {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS processed_features (
    instrument     TEXT    NOT NULL,
    open_time_ms   INTEGER NOT NULL,
    open           REAL    NOT NULL,
    high           REAL    NOT NULL,
    low            REAL    NOT NULL,
    close          REAL    NOT NULL,
    volume         REAL    NOT NULL,
    missing_flag   INTEGER NOT NULL,
    return_1h      REAL    NOT NULL,
    volatility_24h REAL    NOT NULL,
    ma_24          REAL    NOT NULL,
    ma_168         REAL    NOT NULL,
    ma_ratio       REAL    NOT NULL,
    vol_change     REAL    NOT NULL,
    PRIMARY KEY (instrument, open_time_ms)
);
";

impl StoredHistory {
    pub fn open(path: &Path) -> Result<Self, ForecastError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, ForecastError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Upsert rows; the refresh pipeline re-processes overlapping spans.
    pub fn store_rows(
        &self,
        instrument: Instrument,
        rows: &[FeatureRow],
    ) -> Result<usize, ForecastError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO processed_features
                 (instrument, open_time_ms, open, high, low, close, volume, missing_flag,
                  return_1h, volatility_24h, ma_24, ma_168, ma_ratio, vol_change)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for row in rows {
                stmt.execute(params![
                    instrument.id(),
                    row.open_time.timestamp_millis(),
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.volume,
                    row.missing_flag,
                    row.return_1h,
                    row.volatility_24h,
                    row.ma_24,
                    row.ma_168,
                    row.ma_ratio,
                    row.vol_change,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Newest `want` rows for the instrument, returned oldest-first.
    /// Fails with `InsufficientHistory` when fewer than `min` exist.
    pub fn recent(
        &self,
        instrument: Instrument,
        min: usize,
        want: usize,
    ) -> Result<Vec<FeatureRow>, ForecastError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT open_time_ms, open, high, low, close, volume, missing_flag,
                    return_1h, volatility_24h, ma_24, ma_168, ma_ratio, vol_change
             FROM processed_features
             WHERE instrument = ?1
             ORDER BY open_time_ms DESC
             LIMIT ?2",
        )?;
        let mut rows = stmt
            .query_map(params![instrument.id(), want as i64], |r| {
                let ms: i64 = r.get(0)?;
                Ok(FeatureRow {
                    // an out-of-range timestamp degrades to epoch and is then
                    // rejected by the window's ordering validation
                    open_time: Utc.timestamp_millis_opt(ms).single().unwrap_or_default(),
                    open: r.get(1)?,
                    high: r.get(2)?,
                    low: r.get(3)?,
                    close: r.get(4)?,
                    volume: r.get(5)?,
                    missing_flag: r.get(6)?,
                    return_1h: r.get(7)?,
                    volatility_24h: r.get(8)?,
                    ma_24: r.get(9)?,
                    ma_168: r.get(10)?,
                    ma_ratio: r.get(11)?,
                    vol_change: r.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.len() < min {
            return Err(ForecastError::InsufficientHistory {
                instrument: instrument.id().to_string(),
                have: rows.len(),
                need: min,
            });
        }

        rows.reverse();
        Ok(rows)
    }
}
