//! # Risk Reversal
//!
//! A 15-delta risk reversal strategy on SPY options: short an out-of-the-money
//! put, buy an out-of-the-money call and sell a fixed block of the underlying,
//! then hold, roll or rebalance once per trading day.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `market`: Option chain types, the brokerage abstraction and a paper brokerage
//! - `strategy`: Contract selection, rebalance decisions and the daily procedure
//! - `performance`: Daily return and Sharpe ratio record
//! - `persistence`: SQLite-based strategy state persistence
//! - `backtest`: Daily historical backtesting over option chain CSV data
//! - `utils`: Shared utilities and decimal arithmetic

pub mod backtest;
pub mod config;
pub mod market;
pub mod performance;
pub mod persistence;
pub mod strategy;
pub mod utils;

pub use config::Config;
