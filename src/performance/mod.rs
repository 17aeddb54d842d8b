//! Daily performance record of a strategy run.
//!
//! Accumulates one portfolio value per scheduled evaluation and derives the
//! daily return, cumulative return and an annualised Sharpe ratio. Values
//! are only ever appended.

use crate::utils::{safe_div, to_f64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trading days used to annualise daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Minimum number of daily returns before a Sharpe ratio is reported.
const MIN_RETURNS_FOR_SHARPE: usize = 3;

/// Statistics derived from one recorded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub portfolio_value: Decimal,
    pub daily_return: Decimal,
    pub cumulative_return: Decimal,
    pub sharpe_ratio: f64,
    pub observations: usize,
}

/// Accumulating portfolio values and daily returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceTracker {
    daily_returns: Vec<Decimal>,
    portfolio_values: Vec<Decimal>,
    last_value: Option<Decimal>,
}

impl PerformanceTracker {
    /// Empty record. The first recorded day has a zero return.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record seeded with the portfolio value at strategy start.
    pub fn with_initial_value(value: Decimal) -> Self {
        Self {
            last_value: Some(value),
            ..Self::default()
        }
    }

    /// Rebuild a record from persisted history.
    pub fn restore(
        portfolio_values: Vec<Decimal>,
        daily_returns: Vec<Decimal>,
        last_value: Option<Decimal>,
    ) -> Self {
        Self {
            daily_returns,
            portfolio_values,
            last_value,
        }
    }

    /// Append today's value and return the derived statistics.
    ///
    /// A missing or zero previous value yields a zero daily return.
    pub fn record(&mut self, current_value: Decimal) -> PerformanceSnapshot {
        let daily_return = match self.last_value {
            Some(last) => safe_div(current_value - last, last),
            None => Decimal::ZERO,
        };

        self.daily_returns.push(daily_return);
        self.portfolio_values.push(current_value);
        self.last_value = Some(current_value);

        let snapshot = PerformanceSnapshot {
            portfolio_value: current_value,
            daily_return,
            cumulative_return: self.cumulative_return(),
            sharpe_ratio: self.sharpe_ratio(),
            observations: self.daily_returns.len(),
        };

        debug!(
            value = %snapshot.portfolio_value,
            daily_return = %snapshot.daily_return,
            cumulative_return = %snapshot.cumulative_return,
            sharpe = snapshot.sharpe_ratio,
            "Daily performance recorded"
        );

        snapshot
    }

    /// Latest value relative to the first recorded value.
    pub fn cumulative_return(&self) -> Decimal {
        match (self.portfolio_values.first(), self.portfolio_values.last()) {
            (Some(&first), Some(&last)) if first != Decimal::ZERO => last / first - Decimal::ONE,
            _ => Decimal::ZERO,
        }
    }

    /// Annualised Sharpe ratio of daily returns (zero risk-free rate).
    pub fn sharpe_ratio(&self) -> f64 {
        if self.daily_returns.len() < MIN_RETURNS_FOR_SHARPE {
            return 0.0;
        }

        let returns: Vec<f64> = self.daily_returns.iter().map(|r| to_f64(*r)).collect();
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev < 1e-12 {
            return 0.0;
        }

        mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    pub fn daily_returns(&self) -> &[Decimal] {
        &self.daily_returns
    }

    pub fn portfolio_values(&self) -> &[Decimal] {
        &self.portfolio_values
    }

    pub fn last_value(&self) -> Option<Decimal> {
        self.last_value
    }

    pub fn len(&self) -> usize {
        self.portfolio_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolio_values.is_empty()
    }
}
