//! Backtesting simulation engine.
//!
//! Replays historical option chains day by day through the risk reversal
//! strategy against a paper brokerage.

use crate::backtest::metrics::{ActivityStats, BacktestMetrics, EquityPoint};
use crate::backtest::{evaluation_time, BacktestConfig, DailySnapshot, DataLoader};
use crate::config::Config;
use crate::market::{Brokerage, PaperBrokerage, PaperState};
use crate::persistence::PerformanceRecord;
use crate::strategy::{
    EntryOutcome, Evaluation, RebalanceAction, RiskReversal, RiskReversalStrategy, StrategyState,
};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a single simulated trading day.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub date: NaiveDate,
    pub evaluated_at: NaiveDateTime,
    pub cash: Decimal,
    pub total_value: Decimal,
    pub invested: bool,
    pub days_held: u32,
    /// `None` when the evaluation failed
    pub action: Option<RebalanceAction>,
    pub settlements: usize,
}

/// Complete result of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub config: Config,
    pub backtest_config: BacktestConfig,
    pub metrics: BacktestMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_processed: usize,
    /// One record per successful evaluation
    pub daily_performance: Vec<PerformanceRecord>,
    /// Strategy state after the last evaluation
    pub final_state: StrategyState,
}

impl BacktestResult {
    /// Export equity curve to CSV.
    pub fn equity_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;

        let path = path.as_ref();
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writeln!(file, "date,cash,holdings_value,total_value,drawdown,invested,days_held")?;

        for point in &self.equity_curve {
            writeln!(
                file,
                "{},{},{},{},{},{},{}",
                point.date,
                point.cash,
                point.holdings_value,
                point.total_value,
                point.drawdown,
                point.invested,
                point.days_held,
            )?;
        }

        Ok(())
    }

    /// Serialize the full result as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize backtest result")
    }

    /// Write the full result as JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Open position at the end of the run, if any.
    pub fn final_position(&self) -> Option<&RiskReversal> {
        self.final_state.position.as_ref()
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let position = match self.final_position() {
            Some(p) => format!("{} / {} (expiry {})", p.put_symbol, p.call_symbol, p.expiry),
            None => "none".to_string(),
        };

        format!(
            "{}\n\nBacktest Period: {} to {}\nTrading Days: {}\nFinal Position: {}\nDays Held: {}",
            self.metrics.summary(),
            self.start_date,
            self.end_date,
            self.days_processed,
            position,
            self.final_state.days_held,
        )
    }
}

/// The backtesting simulation engine.
pub struct BacktestEngine<D: DataLoader> {
    data_loader: D,
    config: Config,
    backtest_config: BacktestConfig,
    broker: Arc<PaperBrokerage>,
    strategy: RiskReversalStrategy<PaperBrokerage>,

    // Tracking for metrics
    equity_curve: Vec<EquityPoint>,
    daily_performance: Vec<PerformanceRecord>,
    peak_value: Decimal,
    activity: ActivityStats,
}

impl<D: DataLoader> BacktestEngine<D> {
    /// Create a new backtest engine.
    pub fn new(data_loader: D, config: Config, backtest_config: BacktestConfig) -> Self {
        let broker = Arc::new(
            PaperBrokerage::new(&config.strategy.underlying, backtest_config.initial_cash)
                .with_option_commission(backtest_config.option_commission)
                .with_option_multiplier(backtest_config.option_multiplier),
        );
        let strategy = RiskReversalStrategy::new(config.strategy.clone(), broker.clone());

        Self {
            data_loader,
            peak_value: backtest_config.initial_cash,
            config,
            backtest_config,
            broker,
            strategy,
            equity_curve: Vec::new(),
            daily_performance: Vec::new(),
            activity: ActivityStats::default(),
        }
    }

    /// Run the backtest over every trading day between `start` and `end`.
    pub async fn run(&mut self, start: NaiveDate, end: NaiveDate) -> Result<BacktestResult> {
        info!(%start, %end, "Starting backtest");

        // Load historical data
        let snapshots = self.data_loader.load_snapshots(start, end)?;
        if snapshots.is_empty() {
            anyhow::bail!("No data available between {} and {}", start, end);
        }

        info!(days = snapshots.len(), "Loaded trading days");

        // Reset tracking
        let initial_cash = self.backtest_config.initial_cash;
        self.broker.reset(initial_cash).await;
        self.strategy = RiskReversalStrategy::new(self.config.strategy.clone(), self.broker.clone());
        self.strategy.initialize().await;
        self.equity_curve.clear();
        self.daily_performance.clear();
        self.peak_value = initial_cash;
        self.activity = ActivityStats::default();

        for (i, snapshot) in snapshots.iter().enumerate() {
            let step = self.step(snapshot).await?;

            if step.total_value > self.peak_value {
                self.peak_value = step.total_value;
            }

            if self.backtest_config.record_equity_curve {
                self.equity_curve.push(EquityPoint::new(
                    step.date,
                    step.cash,
                    step.total_value,
                    step.invested,
                    step.days_held,
                    self.peak_value,
                ));
            }

            // Progress logging
            if i % 100 == 0 {
                debug!(
                    day = i,
                    total = snapshots.len(),
                    date = %step.date,
                    value = %step.total_value,
                    "Backtest progress"
                );
            }
        }

        let final_state = self.broker.get_state().await;
        let final_value = self.broker.total_portfolio_value().await;

        let metrics = BacktestMetrics::calculate(
            &self.equity_curve,
            initial_cash,
            final_state.total_commission,
            final_state.total_settlement,
            self.activity.clone(),
        );

        info!(
            final_value = %final_value,
            positions_opened = self.activity.positions_opened,
            rolls = self.activity.rolls,
            rebalances = self.activity.delta_rebalances,
            errors = self.activity.errors,
            "Backtest complete"
        );

        Ok(BacktestResult {
            config: self.config.clone(),
            backtest_config: self.backtest_config.clone(),
            metrics,
            equity_curve: self.equity_curve.clone(),
            start_date: start,
            end_date: end,
            days_processed: snapshots.len(),
            daily_performance: self.daily_performance.clone(),
            final_state: self.strategy.state().clone(),
        })
    }

    /// Process a single trading day.
    ///
    /// Evaluation failures are logged and counted. The day still completes
    /// and its performance row is kept.
    async fn step(&mut self, snapshot: &DailySnapshot) -> Result<StepResult> {
        let date = snapshot.date;
        let evaluated_at = evaluation_time(date, self.backtest_config.minutes_after_open);

        // 1. Update market data in the paper brokerage
        self.broker
            .update_market_data(snapshot.underlying_price, &snapshot.chain)
            .await;

        // 2. Settle options that expired since the last trading day
        let settlements = self.broker.settle_expired(date).await;
        self.activity.settlements += settlements.len() as u64;

        // 3. Feed the underlying bar
        if let Some(update) = snapshot.price_update() {
            self.strategy.on_data(&update);
        }

        // 4. Scheduled evaluation
        let action = match self
            .strategy
            .daily_trade_logic(evaluated_at, snapshot.chain())
            .await
        {
            Ok(evaluation) => {
                self.record_evaluation(&evaluation);
                Some(evaluation.action)
            }
            Err(e) => {
                self.activity.errors += 1;
                warn!(%date, %evaluated_at, error = %e, "Daily evaluation failed");
                self.record_evaluation(&e.evaluation);
                Some(e.evaluation.action)
            }
        };

        // 5. Get current state
        let state: PaperState = self.broker.get_state().await;
        let total_value = self.broker.total_portfolio_value().await;
        let invested = self.broker.is_invested().await;

        Ok(StepResult {
            date,
            evaluated_at,
            cash: state.cash,
            total_value,
            invested,
            days_held: self.strategy.days_held(),
            action,
            settlements: settlements.len(),
        })
    }

    fn record_evaluation(&mut self, evaluation: &Evaluation) {
        self.activity.evaluations += 1;
        self.daily_performance.push(PerformanceRecord::from(evaluation));

        match evaluation.action {
            RebalanceAction::Roll { .. } => self.activity.rolls += 1,
            RebalanceAction::Rebalance { .. } => self.activity.delta_rebalances += 1,
            RebalanceAction::Open | RebalanceAction::Hold => {}
        }

        match &evaluation.entry {
            Some(EntryOutcome::Opened(_)) => self.activity.positions_opened += 1,
            Some(EntryOutcome::Skipped(_)) => self.activity.skipped_entries += 1,
            None => {}
        }
    }

    /// Get the current equity curve.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Get the decision counters of the current run.
    pub fn activity(&self) -> &ActivityStats {
        &self.activity
    }

    /// Get the strategy driven by this engine.
    pub fn strategy(&self) -> &RiskReversalStrategy<PaperBrokerage> {
        &self.strategy
    }

    /// Get the current paper account state.
    pub async fn get_state(&self) -> PaperState {
        self.broker.get_state().await
    }
}
