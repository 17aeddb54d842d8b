//! SQLite persistence for strategy state.
//!
//! Persists what a strategy needs to resume after a restart:
//! - Days held and the reference to the open risk reversal
//! - Last recorded portfolio value
//! - Daily performance history

use crate::performance::PerformanceTracker;
use crate::strategy::{Evaluation, RiskReversal, StrategyState};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted strategy state (singleton row).
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    /// Date of the last evaluation included in this state
    pub as_of: NaiveDate,
    pub days_held: u32,
    pub position: Option<RiskReversal>,
    pub last_value: Option<Decimal>,
    pub underlying_price: Option<Decimal>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedState {
    /// Capture the persistent part of a strategy state.
    pub fn from_strategy(as_of: NaiveDate, state: &StrategyState) -> Self {
        Self {
            as_of,
            days_held: state.days_held,
            position: state.position.clone(),
            last_value: state.performance.last_value(),
            underlying_price: state.underlying_price,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a strategy state, replaying the stored performance history.
    pub fn into_strategy_state(self, history: &[PerformanceRecord]) -> StrategyState {
        let values = history.iter().map(|r| r.portfolio_value).collect();
        let returns = history.iter().map(|r| r.daily_return).collect();

        StrategyState {
            position: self.position,
            days_held: self.days_held,
            performance: PerformanceTracker::restore(values, returns, self.last_value),
            underlying_price: self.underlying_price,
        }
    }
}

/// One row of daily performance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub date: NaiveDate,
    pub portfolio_value: Decimal,
    pub daily_return: Decimal,
    pub cumulative_return: Decimal,
    pub sharpe_ratio: f64,
    pub days_held: u32,
    pub action: String,
}

impl From<&Evaluation> for PerformanceRecord {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            date: evaluation.date,
            portfolio_value: evaluation.performance.portfolio_value,
            daily_return: evaluation.performance.daily_return,
            cumulative_return: evaluation.performance.cumulative_return,
            sharpe_ratio: evaluation.performance.sharpe_ratio,
            days_held: evaluation.days_held,
            action: evaluation.action.label().to_string(),
        }
    }
}

/// SQLite-based store for strategy state and performance history.
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    /// Open the store, initializing the database if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        let store = Self { conn };
        store.init_schema()?;

        info!(path = ?db_path.as_ref(), "State store initialized");
        Ok(store)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Strategy state (singleton row)
            CREATE TABLE IF NOT EXISTS strategy_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                as_of TEXT NOT NULL,
                days_held INTEGER NOT NULL,
                put_symbol TEXT,
                call_symbol TEXT,
                expiry TEXT,
                opened_on TEXT,
                last_value TEXT,
                underlying_price TEXT,
                saved_at TEXT NOT NULL
            );

            -- Daily performance history
            CREATE TABLE IF NOT EXISTS daily_performance (
                date TEXT PRIMARY KEY,
                portfolio_value TEXT NOT NULL,
                daily_return TEXT NOT NULL,
                cumulative_return TEXT NOT NULL,
                sharpe_ratio REAL NOT NULL,
                days_held INTEGER NOT NULL,
                action TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Save the strategy state, replacing any previous one.
    pub fn save_state(&self, state: &PersistedState) -> Result<()> {
        let position = state.position.as_ref();

        self.conn.execute(
            r#"
            INSERT INTO strategy_state (id, as_of, days_held, put_symbol, call_symbol, expiry,
                                        opened_on, last_value, underlying_price, saved_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                as_of = ?1,
                days_held = ?2,
                put_symbol = ?3,
                call_symbol = ?4,
                expiry = ?5,
                opened_on = ?6,
                last_value = ?7,
                underlying_price = ?8,
                saved_at = ?9
            "#,
            params![
                state.as_of.format(DATE_FORMAT).to_string(),
                state.days_held,
                position.map(|p| p.put_symbol.clone()),
                position.map(|p| p.call_symbol.clone()),
                position.map(|p| p.expiry.format(DATE_FORMAT).to_string()),
                position.map(|p| p.opened_on.format(DATE_FORMAT).to_string()),
                state.last_value.map(|v| v.to_string()),
                state.underlying_price.map(|v| v.to_string()),
                state.saved_at.to_rfc3339(),
            ],
        )?;

        debug!(
            as_of = %state.as_of,
            days_held = state.days_held,
            invested = state.position.is_some(),
            "State saved to database"
        );
        Ok(())
    }

    /// Load the strategy state from database.
    pub fn load_state(&self) -> Result<Option<PersistedState>> {
        let state = self
            .conn
            .query_row(
                r#"
                SELECT as_of, days_held, put_symbol, call_symbol, expiry, opened_on,
                       last_value, underlying_price, saved_at
                FROM strategy_state WHERE id = 1
                "#,
                [],
                |row| {
                    let put_symbol: Option<String> = row.get(2)?;
                    let call_symbol: Option<String> = row.get(3)?;
                    let expiry = optional_date_column(row, 4)?;
                    let opened_on = optional_date_column(row, 5)?;

                    let position = match (put_symbol, call_symbol, expiry, opened_on) {
                        (Some(put_symbol), Some(call_symbol), Some(expiry), Some(opened_on)) => {
                            Some(RiskReversal {
                                put_symbol,
                                call_symbol,
                                expiry,
                                opened_on,
                            })
                        }
                        _ => None,
                    };

                    let saved_at: String = row.get(8)?;

                    Ok(PersistedState {
                        as_of: date_column(row, 0)?,
                        days_held: row.get(1)?,
                        position,
                        last_value: optional_decimal_column(row, 6)?,
                        underlying_price: optional_decimal_column(row, 7)?,
                        saved_at: DateTime::parse_from_rfc3339(&saved_at)
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc::now()),
                    })
                },
            )
            .optional()?;

        if let Some(state) = &state {
            info!(
                as_of = %state.as_of,
                days_held = state.days_held,
                invested = state.position.is_some(),
                "Loaded state from database"
            );
        }

        Ok(state)
    }

    /// Record one day of performance, replacing an existing row for the date.
    pub fn record_performance(&self, record: &PerformanceRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO daily_performance (date, portfolio_value, daily_return,
                                                      cumulative_return, sharpe_ratio,
                                                      days_held, action)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.date.format(DATE_FORMAT).to_string(),
                record.portfolio_value.to_string(),
                record.daily_return.to_string(),
                record.cumulative_return.to_string(),
                record.sharpe_ratio,
                record.days_held,
                record.action,
            ],
        )?;
        Ok(())
    }

    /// Record many days of performance in one transaction.
    pub fn record_performance_batch(&self, records: &[PerformanceRecord]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.record_performance(record)?;
        }
        tx.commit()?;

        debug!(rows = records.len(), "Performance history saved");
        Ok(())
    }

    /// Most recent performance rows, newest first.
    pub fn recent_performance(&self, limit: usize) -> Result<Vec<PerformanceRecord>> {
        self.query_performance(
            r#"
            SELECT date, portfolio_value, daily_return, cumulative_return, sharpe_ratio,
                   days_held, action
            FROM daily_performance
            ORDER BY date DESC
            LIMIT ?1
            "#,
            Some(limit),
        )
    }

    /// Full performance history, oldest first.
    pub fn performance_history(&self) -> Result<Vec<PerformanceRecord>> {
        self.query_performance(
            r#"
            SELECT date, portfolio_value, daily_return, cumulative_return, sharpe_ratio,
                   days_held, action
            FROM daily_performance
            ORDER BY date ASC
            "#,
            None,
        )
    }

    /// Load the saved state and replay its performance history.
    pub fn restore_strategy_state(&self) -> Result<Option<StrategyState>> {
        let Some(state) = self.load_state()? else {
            return Ok(None);
        };
        let history = self.performance_history()?;
        Ok(Some(state.into_strategy_state(&history)))
    }

    /// Check if we have any saved state.
    pub fn has_state(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM strategy_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Clear all data (for testing or reset).
    pub fn clear_all(&self) -> Result<()> {
        warn!("Clearing all persisted strategy data");
        self.conn.execute_batch(
            r#"
            DELETE FROM strategy_state;
            DELETE FROM daily_performance;
            "#,
        )?;
        Ok(())
    }

    fn query_performance(&self, sql: &str, limit: Option<usize>) -> Result<Vec<PerformanceRecord>> {
        let mut stmt = self.conn.prepare(sql)?;

        let map_row = |row: &Row<'_>| -> rusqlite::Result<PerformanceRecord> {
            Ok(PerformanceRecord {
                date: date_column(row, 0)?,
                portfolio_value: decimal_column(row, 1)?,
                daily_return: decimal_column(row, 2)?,
                cumulative_return: decimal_column(row, 3)?,
                sharpe_ratio: row.get(4)?,
                days_held: row.get(5)?,
                action: row.get(6)?,
            })
        };

        let rows = match limit {
            Some(limit) => stmt
                .query_map([limit as i64], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>(),
            None => stmt.query_map([], map_row)?.collect::<rusqlite::Result<Vec<_>>>(),
        };

        rows.context("Failed to read performance history")
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn optional_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn optional_decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Decimal::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}
