//! Configuration management for the risk reversal strategy.
//!
//! Loads settings from an optional config file and environment variables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Contract selection and rebalancing parameters
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Account and run period
    #[serde(default)]
    pub account: AccountConfig,
    /// Scheduling and fill simulation
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Underlying equity symbol
    #[serde(default = "default_underlying")]
    pub underlying: String,
    /// Target absolute delta for both legs (0.15 = 15-delta)
    #[serde(default = "default_delta_target")]
    pub delta_target: f64,
    /// Acceptable net delta range for the put + call pair
    #[serde(default)]
    pub delta_band: DeltaBand,
    /// Allowed days-to-expiration at entry (inclusive)
    #[serde(default)]
    pub expiry_window: ExpiryWindow,
    /// Strikes considered on each side of the at-the-money strike
    #[serde(default = "default_strike_range")]
    pub strike_range: u32,
    /// Nominal days to expiration of a fresh position
    #[serde(default = "default_days_to_expiry")]
    pub days_to_expiry: u32,
    /// Days before nominal expiration at which the position is rolled
    #[serde(default = "default_days_to_close")]
    pub days_to_close: u32,
    /// Option contracts per leg
    #[serde(default = "default_contract_quantity")]
    pub contract_quantity: Decimal,
    /// Underlying units sold as a delta hedge proxy on entry
    #[serde(default = "default_hedge_quantity")]
    pub hedge_quantity: Decimal,
}

/// Inclusive net delta band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaBand {
    pub lower: f64,
    pub upper: f64,
}

impl DeltaBand {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Whether a net delta lies inside the band (bounds included).
    pub fn contains(&self, net_delta: f64) -> bool {
        !(net_delta < self.lower || net_delta > self.upper)
    }
}

impl Default for DeltaBand {
    fn default() -> Self {
        Self {
            lower: 0.20,
            upper: 0.40,
        }
    }
}

/// Inclusive range of calendar days to expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryWindow {
    pub min_days: i64,
    pub max_days: i64,
}

impl ExpiryWindow {
    pub fn new(min_days: i64, max_days: i64) -> Self {
        Self { min_days, max_days }
    }

    pub fn contains(&self, days: i64) -> bool {
        days >= self.min_days && days <= self.max_days
    }
}

impl Default for ExpiryWindow {
    fn default() -> Self {
        Self {
            min_days: 20,
            max_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account currency (informational)
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Starting cash
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,
    /// First trading date of a run
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// Last trading date of a run
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Minutes after the market open at which the daily evaluation runs
    #[serde(default = "default_minutes_after_open")]
    pub minutes_after_open: u32,
    /// Commission per option contract
    #[serde(default = "default_option_commission")]
    pub option_commission: Decimal,
    /// Shares per option contract
    #[serde(default = "default_option_multiplier")]
    pub option_multiplier: Decimal,
}

// Default value functions
fn default_underlying() -> String {
    "SPY".to_string()
}

fn default_delta_target() -> f64 {
    0.15
}

fn default_strike_range() -> u32 {
    30
}

fn default_days_to_expiry() -> u32 {
    25
}

fn default_days_to_close() -> u32 {
    5
}

fn default_contract_quantity() -> Decimal {
    Decimal::ONE
}

fn default_hedge_quantity() -> Decimal {
    Decimal::new(30, 0)
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_initial_cash() -> Decimal {
    Decimal::new(100_000, 0)
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 5).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, 5).unwrap_or_default()
}

fn default_minutes_after_open() -> u32 {
    5
}

fn default_option_commission() -> Decimal {
    Decimal::new(65, 2) // $0.65 per contract
}

fn default_option_multiplier() -> Decimal {
    Decimal::new(100, 0)
}

impl Config {
    /// Load configuration from `config.*` and `RRS__` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a named file (extension optional) plus environment.
    pub fn load_from(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::default().separator("__").prefix("RRS"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let s = &self.strategy;

        anyhow::ensure!(
            s.delta_target > 0.0 && s.delta_target < 1.0,
            "delta_target must be between 0 and 1"
        );

        anyhow::ensure!(
            s.delta_band.lower <= s.delta_band.upper,
            "delta_band lower bound must not exceed upper bound"
        );

        anyhow::ensure!(
            s.expiry_window.min_days >= 0 && s.expiry_window.min_days <= s.expiry_window.max_days,
            "expiry_window must satisfy 0 <= min_days <= max_days"
        );

        anyhow::ensure!(
            s.days_to_close <= s.days_to_expiry,
            "days_to_close must not exceed days_to_expiry"
        );

        anyhow::ensure!(
            s.contract_quantity > Decimal::ZERO && s.hedge_quantity >= Decimal::ZERO,
            "contract_quantity must be positive and hedge_quantity non-negative"
        );

        anyhow::ensure!(
            self.account.initial_cash > Decimal::ZERO,
            "initial_cash must be positive"
        );

        anyhow::ensure!(
            self.account.start_date <= self.account.end_date,
            "start_date must not be after end_date"
        );

        anyhow::ensure!(
            self.execution.option_multiplier > Decimal::ZERO,
            "option_multiplier must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            account: AccountConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            underlying: default_underlying(),
            delta_target: default_delta_target(),
            delta_band: DeltaBand::default(),
            expiry_window: ExpiryWindow::default(),
            strike_range: default_strike_range(),
            days_to_expiry: default_days_to_expiry(),
            days_to_close: default_days_to_close(),
            contract_quantity: default_contract_quantity(),
            hedge_quantity: default_hedge_quantity(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            initial_cash: default_initial_cash(),
            start_date: default_start_date(),
            end_date: default_end_date(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            minutes_after_open: default_minutes_after_open(),
            option_commission: default_option_commission(),
            option_multiplier: default_option_multiplier(),
        }
    }
}
