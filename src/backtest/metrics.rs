//! Performance metrics calculation for backtesting.
//!
//! Provides Sharpe ratio, Sortino ratio, drawdown analysis, and strategy
//! activity counts.

use crate::performance::TRADING_DAYS_PER_YEAR;
use crate::utils::{round_to_precision, safe_div, to_f64};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A point on the equity curve, one per trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: Decimal,
    /// Marked value of all holdings
    pub holdings_value: Decimal,
    pub total_value: Decimal,
    pub drawdown: Decimal,
    pub invested: bool,
    pub days_held: u32,
}

impl EquityPoint {
    /// Create a new equity point.
    pub fn new(
        date: NaiveDate,
        cash: Decimal,
        total_value: Decimal,
        invested: bool,
        days_held: u32,
        peak_value: Decimal,
    ) -> Self {
        let drawdown = if peak_value > Decimal::ZERO && total_value < peak_value {
            round_to_precision((peak_value - total_value) / peak_value, 8)
        } else {
            Decimal::ZERO
        };

        Self {
            date,
            cash,
            holdings_value: total_value - cash,
            total_value,
            drawdown,
            invested,
            days_held,
        }
    }
}

/// Counts of strategy decisions over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub evaluations: u64,
    pub positions_opened: u64,
    pub rolls: u64,
    pub delta_rebalances: u64,
    pub skipped_entries: u64,
    pub settlements: u64,
    pub errors: u64,
}

/// Comprehensive backtest performance metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // Returns
    /// Total absolute return (final - initial)
    pub total_return: Decimal,
    /// Total return as percentage
    pub total_return_pct: Decimal,
    /// Annualized return percentage
    pub annualized_return: Decimal,

    // Risk
    /// Maximum drawdown fraction
    pub max_drawdown: Decimal,
    /// Duration of maximum drawdown in calendar days
    pub max_drawdown_duration_days: i64,
    /// Annualized volatility of daily returns
    pub volatility: Decimal,

    // Risk-adjusted
    /// Sharpe ratio (assuming 0 risk-free rate)
    pub sharpe_ratio: Decimal,
    /// Sortino ratio (downside deviation only)
    pub sortino_ratio: Decimal,
    /// Calmar ratio (return / max drawdown)
    pub calmar_ratio: Decimal,

    // Costs
    pub total_commission: Decimal,
    /// Net cash from expired option settlement
    pub total_settlement: Decimal,

    // Activity
    pub activity: ActivityStats,

    // Time
    pub trading_days: usize,
    /// Backtest duration in calendar days
    pub duration_days: i64,
}

impl BacktestMetrics {
    /// Calculate metrics from the equity curve and run counters.
    pub fn calculate(
        equity_curve: &[EquityPoint],
        initial_value: Decimal,
        total_commission: Decimal,
        total_settlement: Decimal,
        activity: ActivityStats,
    ) -> Self {
        let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
            return Self {
                activity,
                ..Self::empty()
            };
        };

        // Duration
        let duration_days = (last.date - first.date).num_days();
        let duration_years = duration_days as f64 / 365.0;

        // Returns
        let total_return = last.total_value - initial_value;
        let total_return_pct = safe_div(total_return, initial_value) * dec!(100);

        let annualized_return = if duration_years > 0.0 {
            let factor = 1.0 + to_f64(total_return_pct) / 100.0;
            let annualized = factor.powf(1.0 / duration_years) - 1.0;
            from_f64(annualized * 100.0)
        } else {
            Decimal::ZERO
        };

        // Drawdown
        let (max_drawdown, max_dd_duration) = calculate_max_drawdown(equity_curve);

        let returns = calculate_daily_returns(equity_curve);
        let volatility = calculate_volatility(&returns);
        let sharpe_ratio = calculate_sharpe(&returns);
        let sortino_ratio = calculate_sortino(&returns);
        let calmar_ratio = if max_drawdown > Decimal::ZERO {
            annualized_return / (max_drawdown * dec!(100))
        } else {
            Decimal::ZERO
        };

        Self {
            total_return,
            total_return_pct,
            annualized_return,
            max_drawdown,
            max_drawdown_duration_days: max_dd_duration,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            total_commission,
            total_settlement,
            activity,
            trading_days: equity_curve.len(),
            duration_days,
        }
    }

    /// Create empty metrics (for runs without data).
    pub fn empty() -> Self {
        Self {
            total_return: Decimal::ZERO,
            total_return_pct: Decimal::ZERO,
            annualized_return: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            max_drawdown_duration_days: 0,
            volatility: Decimal::ZERO,
            sharpe_ratio: Decimal::ZERO,
            sortino_ratio: Decimal::ZERO,
            calmar_ratio: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            total_settlement: Decimal::ZERO,
            activity: ActivityStats::default(),
            trading_days: 0,
            duration_days: 0,
        }
    }

    /// Format metrics as a summary string.
    pub fn summary(&self) -> String {
        format!(
            r#"═══════════════════════════════════════════════
BACKTEST RESULTS ({} trading days, {} calendar days)
═══════════════════════════════════════════════
RETURNS
  Total Return:      ${:.2} ({:.2}%)
  Annualized:        {:.2}%

RISK
  Max Drawdown:      {:.2}% ({} days)
  Volatility:        {:.2}%

RISK-ADJUSTED
  Sharpe Ratio:      {:.3}
  Sortino Ratio:     {:.3}
  Calmar Ratio:      {:.3}

COSTS
  Commission:        ${:.2}
  Expiry Settlement: ${:.2}

ACTIVITY
  Evaluations:       {}
  Positions Opened:  {}
  Rolls:             {}
  Delta Rebalances:  {}
  Skipped Entries:   {}
  Errors:            {}
═══════════════════════════════════════════════"#,
            self.trading_days,
            self.duration_days,
            self.total_return,
            self.total_return_pct,
            self.annualized_return,
            self.max_drawdown * dec!(100),
            self.max_drawdown_duration_days,
            self.volatility * dec!(100),
            self.sharpe_ratio,
            self.sortino_ratio,
            self.calmar_ratio,
            self.total_commission,
            self.total_settlement,
            self.activity.evaluations,
            self.activity.positions_opened,
            self.activity.rolls,
            self.activity.delta_rebalances,
            self.activity.skipped_entries,
            self.activity.errors,
        )
    }
}

fn from_f64(value: f64) -> Decimal {
    if value.is_finite() {
        Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

/// Day-over-day returns of the equity curve.
fn calculate_daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| to_f64(safe_div(w[1].total_value - w[0].total_value, w[0].total_value)))
        .collect()
}

/// Calculate maximum drawdown and its duration.
fn calculate_max_drawdown(equity_curve: &[EquityPoint]) -> (Decimal, i64) {
    let Some(first) = equity_curve.first() else {
        return (Decimal::ZERO, 0);
    };

    let mut peak = first.total_value;
    let mut peak_date = first.date;
    let mut max_dd = Decimal::ZERO;
    let mut max_dd_duration: i64 = 0;

    for point in equity_curve {
        if point.total_value >= peak {
            peak = point.total_value;
            peak_date = point.date;
            continue;
        }

        let dd = safe_div(peak - point.total_value, peak);
        if dd > max_dd {
            max_dd = dd;
        }

        let duration = (point.date - peak_date).num_days();
        if duration > max_dd_duration {
            max_dd_duration = duration;
        }
    }

    (max_dd, max_dd_duration)
}

fn mean_and_std(returns: &[f64]) -> (f64, f64) {
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Calculate annualized volatility from daily returns.
fn calculate_volatility(returns: &[f64]) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let (_, std_dev) = mean_and_std(returns);
    from_f64(std_dev * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Calculate Sharpe ratio (assuming 0 risk-free rate).
fn calculate_sharpe(returns: &[f64]) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let (mean, std_dev) = mean_and_std(returns);
    if std_dev < 1e-12 {
        return Decimal::ZERO;
    }

    from_f64(mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Calculate Sortino ratio (downside deviation only).
fn calculate_sortino(returns: &[f64]) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;

    let downside: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
    if downside.is_empty() {
        return Decimal::ZERO;
    }

    let downside_variance = downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64;
    let downside_deviation = downside_variance.sqrt();

    if downside_deviation < 1e-12 {
        return Decimal::ZERO;
    }

    from_f64(mean / downside_deviation * TRADING_DAYS_PER_YEAR.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 1, d).unwrap()
    }

    fn point(d: u32, value: Decimal, peak: Decimal) -> EquityPoint {
        EquityPoint::new(day(d), dec!(10000), value, true, 1, peak)
    }

    #[test]
    fn test_equity_point_drawdown() {
        let point = EquityPoint::new(day(5), dec!(9000), dec!(9500), true, 3, dec!(10000));

        assert_eq!(point.holdings_value, dec!(500));
        assert_eq!(point.drawdown, dec!(0.05)); // 5% drawdown

        let at_peak = EquityPoint::new(day(5), dec!(9000), dec!(10000), false, 0, dec!(10000));
        assert_eq!(at_peak.drawdown, Decimal::ZERO);
    }

    #[test]
    fn test_max_drawdown_calculation() {
        let curve = vec![
            point(4, dec!(10000), dec!(10000)),
            point(5, dec!(10500), dec!(10500)),
            point(6, dec!(9500), dec!(10500)),
            point(8, dec!(10000), dec!(10500)),
            point(11, dec!(11000), dec!(11000)),
        ];

        let (max_dd, duration) = calculate_max_drawdown(&curve);
        // Max DD was from 10500 to 9500 = 9.52%
        assert!(max_dd > dec!(0.09) && max_dd < dec!(0.10));
        assert_eq!(duration, 3);
    }

    #[test]
    fn test_daily_returns() {
        let curve = vec![
            point(4, dec!(10000), dec!(10000)),
            point(5, dec!(10100), dec!(10100)),
            point(6, dec!(10100), dec!(10100)),
        ];

        let returns = calculate_daily_returns(&curve);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.01).abs() < 1e-12);
        assert_eq!(returns[1], 0.0);
    }

    #[test]
    fn test_ratios_are_zero_without_dispersion() {
        let flat = vec![0.0, 0.0, 0.0];
        assert_eq!(calculate_sharpe(&flat), Decimal::ZERO);
        assert_eq!(calculate_volatility(&flat), Decimal::ZERO);
        assert_eq!(calculate_sortino(&[0.01, 0.02]), Decimal::ZERO);
        assert!(calculate_sortino(&[0.01, -0.02, 0.03]) > Decimal::ZERO);
    }

    #[test]
    fn test_calculate_from_curve() {
        let curve = vec![
            point(4, dec!(100000), dec!(100000)),
            point(5, dec!(101000), dec!(101000)),
            point(6, dec!(100500), dec!(101000)),
            point(7, dec!(102000), dec!(102000)),
        ];
        let activity = ActivityStats {
            evaluations: 4,
            positions_opened: 2,
            rolls: 1,
            ..ActivityStats::default()
        };

        let metrics =
            BacktestMetrics::calculate(&curve, dec!(100000), dec!(2.60), dec!(-500), activity);

        assert_eq!(metrics.total_return, dec!(2000));
        assert_eq!(metrics.total_return_pct, dec!(2));
        assert_eq!(metrics.trading_days, 4);
        assert_eq!(metrics.duration_days, 3);
        assert!(metrics.sharpe_ratio > Decimal::ZERO);
        assert!(metrics.max_drawdown > Decimal::ZERO);
        assert_eq!(metrics.activity.rolls, 1);
    }

    #[test]
    fn test_empty_curve_keeps_activity() {
        let activity = ActivityStats {
            errors: 2,
            ..ActivityStats::default()
        };
        let metrics = BacktestMetrics::calculate(&[], dec!(100000), Decimal::ZERO, Decimal::ZERO, activity);
        assert_eq!(metrics.total_return, Decimal::ZERO);
        assert_eq!(metrics.activity.errors, 2);
    }

    #[test]
    fn test_metrics_summary() {
        let metrics = BacktestMetrics {
            total_return: dec!(500),
            total_return_pct: dec!(5),
            sharpe_ratio: dec!(1.5),
            ..BacktestMetrics::empty()
        };

        let summary = metrics.summary();
        assert!(summary.contains("500.00"));
        assert!(summary.contains("Sharpe"));
        assert!(summary.contains("Delta Rebalances"));
    }
}
