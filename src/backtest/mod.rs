//! Daily backtesting of the risk reversal strategy.
//!
//! This module provides:
//! - Historical underlying and option chain loading from CSV
//! - A daily simulation engine driving the strategy against a paper brokerage
//! - Performance metrics and result export
//!
//! # Example
//!
//! ```rust,ignore
//! use risk_reversal::backtest::{BacktestConfig, BacktestEngine, CsvDataLoader};
//!
//! let loader = CsvDataLoader::new("data/spy_options.csv", "SPY")?;
//! let mut engine = BacktestEngine::new(loader, config, BacktestConfig::default());
//!
//! let result = engine.run(start, end).await?;
//! println!("Return: {:.2}%", result.metrics.total_return_pct);
//! ```

mod data;
mod engine;
mod metrics;

pub use data::{CsvDataLoader, DailySnapshot, DataLoader};
pub use engine::{BacktestEngine, BacktestResult, StepResult};
pub use metrics::{ActivityStats, BacktestMetrics, EquityPoint};

use crate::config::Config;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial cash for the paper brokerage
    pub initial_cash: Decimal,

    /// Commission per option contract
    pub option_commission: Decimal,

    /// Shares per option contract
    pub option_multiplier: Decimal,

    /// Minutes after the open at which the daily evaluation is stamped
    pub minutes_after_open: u32,

    /// Whether to record every equity point
    pub record_equity_curve: bool,

    /// Path to output results (optional)
    pub output_path: Option<String>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BacktestConfig {
    /// Derive backtest settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_cash: config.account.initial_cash,
            option_commission: config.execution.option_commission,
            option_multiplier: config.execution.option_multiplier,
            minutes_after_open: config.execution.minutes_after_open,
            record_equity_curve: true,
            output_path: None,
        }
    }
}

/// US equity regular session open (exchange local time).
pub const MARKET_OPEN: (u32, u32) = (9, 30);

/// Timestamp of the scheduled evaluation on `date`.
pub fn evaluation_time(date: NaiveDate, minutes_after_open: u32) -> NaiveDateTime {
    let (hour, minute) = MARKET_OPEN;
    let open = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    date.and_time(open) + chrono::Duration::minutes(i64::from(minutes_after_open))
}
