//! The daily risk reversal decision procedure.
//!
//! Once per scheduled evaluation the strategy records performance, then
//! opens, holds, rolls or rebalances a single short put / long call pair
//! hedged with a short underlying position.

use super::rebalancer::{DeltaRebalancer, RebalanceAction};
use super::selector::{ContractSelector, RiskReversalLegs, SkipReason};
use crate::config::StrategyConfig;
use crate::market::{Brokerage, OptionChain, PriceUpdate};
use crate::performance::{PerformanceSnapshot, PerformanceTracker};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reference to the currently held risk reversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReversal {
    pub put_symbol: String,
    pub call_symbol: String,
    pub expiry: NaiveDate,
    pub opened_on: NaiveDate,
}

/// Mutable state owned by one strategy instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyState {
    pub position: Option<RiskReversal>,
    pub days_held: u32,
    pub performance: PerformanceTracker,
    /// Latest observed underlying price
    pub underlying_price: Option<Decimal>,
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Opened(RiskReversal),
    Skipped(SkipReason),
}

impl EntryOutcome {
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened(_))
    }
}

/// Report of one scheduled evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub date: NaiveDate,
    pub action: RebalanceAction,
    /// Present whenever an entry was attempted
    pub entry: Option<EntryOutcome>,
    /// Orders sent to close the previous position
    pub closing_orders: usize,
    /// Days held after the end-of-evaluation increment
    pub days_held: u32,
    pub performance: PerformanceSnapshot,
}

/// An evaluation whose closing or entry orders were rejected.
#[derive(Debug, Error)]
#[error("{} on {} failed: {:#}", .evaluation.action.label(), .evaluation.date, .cause)]
pub struct EvaluationError {
    /// What was decided and recorded before the failure
    pub evaluation: Evaluation,
    pub cause: anyhow::Error,
}

/// 15-delta risk reversal strategy driven by a host brokerage.
pub struct RiskReversalStrategy<B: Brokerage> {
    config: StrategyConfig,
    selector: ContractSelector,
    rebalancer: DeltaRebalancer,
    broker: Arc<B>,
    state: StrategyState,
}

impl<B: Brokerage> RiskReversalStrategy<B> {
    /// Create a strategy with an empty performance record.
    pub fn new(config: StrategyConfig, broker: Arc<B>) -> Self {
        Self {
            selector: ContractSelector::from_config(&config),
            rebalancer: DeltaRebalancer::from_config(&config),
            config,
            broker,
            state: StrategyState::default(),
        }
    }

    /// Replace the strategy state, e.g. with one restored from storage.
    pub fn with_state(mut self, state: StrategyState) -> Self {
        self.state = state;
        self
    }

    /// Seed the performance record with the portfolio value at start.
    pub async fn initialize(&mut self) {
        let value = self.broker.total_portfolio_value().await;
        self.state.performance = PerformanceTracker::with_initial_value(value);
        info!(
            underlying = %self.config.underlying,
            initial_value = %value,
            delta_target = self.config.delta_target,
            hold_limit = self.rebalancer.hold_limit(),
            "Risk reversal strategy initialized"
        );
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn days_held(&self) -> u32 {
        self.state.days_held
    }

    pub fn position(&self) -> Option<&RiskReversal> {
        self.state.position.as_ref()
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.state.performance
    }

    pub fn underlying_price(&self) -> Option<Decimal> {
        self.state.underlying_price
    }

    /// Cache the latest underlying price. Other symbols are ignored.
    pub fn on_data(&mut self, update: &PriceUpdate) {
        if update.symbol().eq_ignore_ascii_case(&self.config.underlying) {
            self.state.underlying_price = Some(update.price());
        }
    }

    /// Scheduled daily evaluation at `now`.
    ///
    /// Days held advance even when an order fails. The failed evaluation,
    /// with its performance already recorded, is returned inside the error.
    pub async fn daily_trade_logic(
        &mut self,
        now: NaiveDateTime,
        chain: Option<&OptionChain>,
    ) -> Result<Evaluation, EvaluationError> {
        let today = now.date();
        let value = self.broker.total_portfolio_value().await;
        let performance = self.state.performance.record(value);

        let invested = self.broker.is_invested().await;
        let days_held = self.state.days_held;
        let net_delta = if invested && !self.rebalancer.hold_limit_reached(days_held) {
            self.current_net_delta().await
        } else {
            None
        };

        let action = self.rebalancer.analyze(invested, days_held, net_delta);

        let mut closing_orders = 0;
        let mut entry = None;
        let mut failure = None;

        if action.closes_position() {
            match self.close_position().await {
                Ok(orders) => closing_orders = orders,
                Err(e) => failure = Some(e),
            }
        }

        if failure.is_none() && action.opens_position() {
            match self.enter_risk_reversal(now, chain).await {
                Ok(outcome) => entry = Some(outcome),
                Err(e) => failure = Some(e),
            }
        }

        self.state.days_held += 1;

        debug!(
            %today,
            action = ?action,
            days_held = self.state.days_held,
            portfolio_value = %value,
            failed = failure.is_some(),
            "Daily evaluation complete"
        );

        let evaluation = Evaluation {
            date: today,
            action,
            entry,
            closing_orders,
            days_held: self.state.days_held,
            performance,
        };

        match failure {
            Some(cause) => Err(EvaluationError { evaluation, cause }),
            None => Ok(evaluation),
        }
    }

    /// Open a risk reversal from the chain, or skip if it cannot support one.
    pub async fn enter_risk_reversal(
        &mut self,
        now: NaiveDateTime,
        chain: Option<&OptionChain>,
    ) -> Result<EntryOutcome> {
        let today = now.date();
        let legs = match self.selector.select(chain, now) {
            Ok(legs) => legs,
            Err(reason) => {
                warn!(%today, %reason, "Skipping risk reversal entry");
                return Ok(EntryOutcome::Skipped(reason));
            }
        };

        self.submit_entry_orders(&legs).await?;

        let position = RiskReversal {
            put_symbol: legs.put.symbol.clone(),
            call_symbol: legs.call.symbol.clone(),
            expiry: legs.expiry,
            opened_on: today,
        };

        info!(
            %today,
            put = %position.put_symbol,
            call = %position.call_symbol,
            expiry = %position.expiry,
            entry_net_delta = legs.net_delta(),
            "Risk reversal opened"
        );

        self.state.position = Some(position.clone());
        self.state.days_held = 0;

        Ok(EntryOutcome::Opened(position))
    }

    /// Liquidate every holding and forget the position reference.
    pub async fn close_position(&mut self) -> Result<usize> {
        let tickets = self
            .broker
            .liquidate()
            .await
            .context("Failed to liquidate risk reversal")?;

        if let Some(position) = self.state.position.take() {
            info!(
                put = %position.put_symbol,
                call = %position.call_symbol,
                days_held = self.state.days_held,
                orders = tickets.len(),
                "Risk reversal closed"
            );
        }

        Ok(tickets.len())
    }

    /// Put delta plus call delta of the held contracts.
    pub async fn current_net_delta(&self) -> Option<f64> {
        let position = self.state.position.as_ref()?;
        let put_delta = self.broker.contract_delta(&position.put_symbol).await;
        let call_delta = self.broker.contract_delta(&position.call_symbol).await;

        match (put_delta, call_delta) {
            (Some(put), Some(call)) => Some(DeltaRebalancer::net_delta(put, call)),
            _ => {
                warn!(
                    put = %position.put_symbol,
                    call = %position.call_symbol,
                    "Missing greeks for held contracts"
                );
                None
            }
        }
    }

    async fn submit_entry_orders(&self, legs: &RiskReversalLegs) -> Result<()> {
        let quantity = self.config.contract_quantity;

        self.broker
            .market_order(&legs.put.symbol, -quantity)
            .await
            .with_context(|| format!("Failed to sell put {}", legs.put.symbol))?;
        self.broker
            .market_order(&legs.call.symbol, quantity)
            .await
            .with_context(|| format!("Failed to buy call {}", legs.call.symbol))?;

        if self.config.hedge_quantity > Decimal::ZERO {
            self.broker
                .market_order(&self.config.underlying, -self.config.hedge_quantity)
                .await
                .with_context(|| format!("Failed to sell hedge {}", self.config.underlying))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeltaBand, ExpiryWindow};
    use crate::market::{MockBrokerage, OptionContract, OptionRight, OrderTicket, PaperBrokerage};
    use chrono::Duration;
    use mockall::Sequence;
    use rust_decimal_macros::dec;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 1, 26).unwrap() + Duration::days(n)
    }

    /// Evaluation time on day `n`, five minutes after the open.
    fn at(n: i64) -> NaiveDateTime {
        day(n).and_hms_opt(9, 35, 0).unwrap()
    }

    fn chain_on(today: NaiveDate, put_delta: f64, call_delta: f64) -> OptionChain {
        let expiry = day(25);
        OptionChain::new("SPY", today).with_contracts(vec![
            OptionContract::new("SPY", expiry, dec!(110), OptionRight::Put)
                .with_delta(-0.50)
                .with_price(dec!(2.10)),
            OptionContract::new("SPY", expiry, dec!(105), OptionRight::Put)
                .with_delta(put_delta)
                .with_price(dec!(0.80)),
            OptionContract::new("SPY", expiry, dec!(120), OptionRight::Call)
                .with_delta(call_delta)
                .with_price(dec!(0.60)),
            OptionContract::new("SPY", expiry, dec!(110), OptionRight::Call)
                .with_delta(0.90)
                .with_price(dec!(3.40)),
        ])
    }

    fn ticket(symbol: &str, quantity: Decimal) -> OrderTicket {
        OrderTicket {
            order_id: 1,
            symbol: symbol.to_string(),
            quantity,
            fill_price: dec!(1),
            commission: Decimal::ZERO,
        }
    }

    fn wide_band_config() -> StrategyConfig {
        StrategyConfig {
            delta_band: DeltaBand::new(-0.10, 0.10),
            ..StrategyConfig::default()
        }
    }

    async fn paper_strategy(
        config: StrategyConfig,
    ) -> (Arc<PaperBrokerage>, RiskReversalStrategy<PaperBrokerage>) {
        let broker = Arc::new(PaperBrokerage::new("SPY", dec!(100000)));
        let mut strategy = RiskReversalStrategy::new(config, broker.clone());
        strategy.initialize().await;
        (broker, strategy)
    }

    async fn feed(broker: &PaperBrokerage, chain: &OptionChain) {
        broker.update_market_data(Some(dec!(112)), chain).await;
    }

    #[tokio::test]
    async fn test_entry_submits_put_call_and_hedge_orders() {
        let mut mock = MockBrokerage::new();
        let mut seq = Sequence::new();

        mock.expect_total_portfolio_value()
            .returning(|| dec!(100000));
        mock.expect_is_invested().times(1).returning(|| false);
        mock.expect_market_order()
            .withf(|symbol, quantity| symbol == "SPY 105P 2010-02-20" && *quantity == dec!(-1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|symbol, quantity| Ok(ticket(symbol, quantity)));
        mock.expect_market_order()
            .withf(|symbol, quantity| symbol == "SPY 120C 2010-02-20" && *quantity == dec!(1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|symbol, quantity| Ok(ticket(symbol, quantity)));
        mock.expect_market_order()
            .withf(|symbol, quantity| symbol == "SPY" && *quantity == dec!(-30))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|symbol, quantity| Ok(ticket(symbol, quantity)));
        mock.expect_liquidate().never();

        let mut strategy = RiskReversalStrategy::new(StrategyConfig::default(), Arc::new(mock));
        let chain = chain_on(day(0), -0.15, 0.15);
        let evaluation = strategy.daily_trade_logic(at(0), Some(&chain)).await.unwrap();

        assert_eq!(evaluation.action, RebalanceAction::Open);
        assert!(evaluation.entry.as_ref().is_some_and(EntryOutcome::is_opened));
        let position = strategy.position().unwrap();
        assert_eq!(position.put_symbol, "SPY 105P 2010-02-20");
        assert_eq!(position.call_symbol, "SPY 120C 2010-02-20");
        assert_eq!(position.expiry, day(25));
    }

    #[tokio::test]
    async fn test_failed_order_propagates() {
        let mut mock = MockBrokerage::new();
        mock.expect_market_order()
            .returning(|symbol, _| Err(anyhow::anyhow!("rejected {}", symbol)));

        let mut strategy = RiskReversalStrategy::new(StrategyConfig::default(), Arc::new(mock));
        let chain = chain_on(day(0), -0.15, 0.15);
        let result = strategy.enter_risk_reversal(at(0), Some(&chain)).await;

        assert!(result.is_err());
        assert!(strategy.position().is_none());
    }

    #[tokio::test]
    async fn test_rejected_entry_still_counts_the_day() {
        let mut mock = MockBrokerage::new();
        mock.expect_total_portfolio_value().returning(|| dec!(100000));
        mock.expect_is_invested().returning(|| false);
        mock.expect_market_order()
            .times(1)
            .returning(|symbol, _| Err(anyhow::anyhow!("rejected {}", symbol)));
        mock.expect_liquidate().never();

        let state = StrategyState {
            days_held: 7,
            ..StrategyState::default()
        };
        let mut strategy =
            RiskReversalStrategy::new(StrategyConfig::default(), Arc::new(mock)).with_state(state);
        let chain = chain_on(day(0), -0.15, 0.15);

        let err = strategy.daily_trade_logic(at(0), Some(&chain)).await.unwrap_err();

        assert_eq!(strategy.days_held(), 8);
        assert_eq!(strategy.performance().len(), 1);
        assert!(strategy.position().is_none());
        assert_eq!(err.evaluation.action, RebalanceAction::Open);
        assert_eq!(err.evaluation.days_held, 8);
        assert_eq!(err.evaluation.entry, None);
        assert_eq!(err.evaluation.performance.portfolio_value, dec!(100000));
        assert!(err.to_string().starts_with("open on 2010-01-26 failed"));
        assert!(err.to_string().contains("rejected SPY 105P 2010-02-20"));
    }

    #[tokio::test]
    async fn test_rejected_liquidation_still_counts_the_day() {
        let mut mock = MockBrokerage::new();
        mock.expect_total_portfolio_value().returning(|| dec!(100000));
        mock.expect_is_invested().returning(|| true);
        mock.expect_liquidate()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("market closed")));
        mock.expect_market_order().never();

        let state = StrategyState {
            position: Some(RiskReversal {
                put_symbol: "SPY 105P 2010-02-20".to_string(),
                call_symbol: "SPY 120C 2010-02-20".to_string(),
                expiry: day(25),
                opened_on: day(0),
            }),
            days_held: 20,
            ..StrategyState::default()
        };
        let mut strategy =
            RiskReversalStrategy::new(StrategyConfig::default(), Arc::new(mock)).with_state(state);

        let err = strategy.daily_trade_logic(at(20), None).await.unwrap_err();

        assert_eq!(err.evaluation.action, RebalanceAction::Roll { days_held: 20 });
        assert_eq!(err.evaluation.closing_orders, 0);
        assert_eq!(strategy.days_held(), 21);
        // Position reference survives a failed liquidation
        assert!(strategy.position().is_some());
    }

    #[tokio::test]
    async fn test_invested_without_position_reference_holds() {
        let mut mock = MockBrokerage::new();
        mock.expect_total_portfolio_value().returning(|| dec!(99950));
        mock.expect_is_invested().returning(|| true);
        mock.expect_contract_delta().never();
        mock.expect_liquidate().never();
        mock.expect_market_order().never();

        let state = StrategyState {
            days_held: 3,
            ..StrategyState::default()
        };
        let mut strategy =
            RiskReversalStrategy::new(StrategyConfig::default(), Arc::new(mock)).with_state(state);
        let chain = chain_on(day(3), -0.15, 0.15);

        let evaluation = strategy.daily_trade_logic(at(3), Some(&chain)).await.unwrap();

        assert_eq!(evaluation.action, RebalanceAction::Hold);
        assert_eq!(evaluation.closing_orders, 0);
        assert_eq!(evaluation.entry, None);
        assert_eq!(evaluation.days_held, 4);
        assert!(strategy.position().is_none());
    }

    #[tokio::test]
    async fn test_days_held_resets_on_entry_and_counts_up() {
        let (broker, mut strategy) = paper_strategy(wide_band_config()).await;

        let chain = chain_on(day(0), -0.15, 0.15);
        feed(&broker, &chain).await;
        let outcome = strategy.enter_risk_reversal(at(0), Some(&chain)).await.unwrap();
        assert!(outcome.is_opened());
        assert_eq!(strategy.days_held(), 0);

        for n in 1..=3 {
            let chain = chain_on(day(n), -0.15, 0.15);
            feed(&broker, &chain).await;
            let evaluation = strategy.daily_trade_logic(at(n), Some(&chain)).await.unwrap();
            assert_eq!(evaluation.action, RebalanceAction::Hold);
            assert_eq!(strategy.days_held(), n as u32);
        }
    }

    #[tokio::test]
    async fn test_opening_evaluation_ends_with_one_day_held() {
        let (broker, mut strategy) = paper_strategy(wide_band_config()).await;
        let chain = chain_on(day(0), -0.15, 0.15);
        feed(&broker, &chain).await;

        let evaluation = strategy.daily_trade_logic(at(0), Some(&chain)).await.unwrap();
        assert_eq!(evaluation.action, RebalanceAction::Open);
        assert_eq!(evaluation.days_held, 1);
        assert!(broker.is_invested().await);

        let state = broker.get_state().await;
        assert_eq!(state.holdings["SPY"].quantity, dec!(-30));
        assert_eq!(state.holdings["SPY 105P 2010-02-20"].quantity, dec!(-1));
        assert_eq!(state.holdings["SPY 120C 2010-02-20"].quantity, dec!(1));
    }

    #[tokio::test]
    async fn test_band_breach_closes_and_reopens() {
        let (broker, mut strategy) = paper_strategy(StrategyConfig::default()).await;

        // Entry pair nets 0.30, inside the default (0.20, 0.40) band
        let chain = chain_on(day(0), -0.10, 0.40);
        feed(&broker, &chain).await;
        strategy.daily_trade_logic(at(0), Some(&chain)).await.unwrap();
        assert_eq!(strategy.days_held(), 1);

        let chain = chain_on(day(1), -0.10, 0.40);
        feed(&broker, &chain).await;
        let held = strategy.daily_trade_logic(at(1), Some(&chain)).await.unwrap();
        assert_eq!(held.action, RebalanceAction::Hold);
        assert_eq!(strategy.days_held(), 2);

        // Greeks drift to a net delta of 0.50
        let chain = chain_on(day(2), -0.05, 0.55);
        feed(&broker, &chain).await;
        let evaluation = strategy.daily_trade_logic(at(2), Some(&chain)).await.unwrap();

        assert!(matches!(evaluation.action, RebalanceAction::Rebalance { .. }));
        assert_eq!(evaluation.closing_orders, 3);
        assert!(evaluation.entry.as_ref().is_some_and(EntryOutcome::is_opened));
        assert_eq!(strategy.position().unwrap().opened_on, day(2));
        // Reset to zero on entry, then incremented once
        assert_eq!(evaluation.days_held, 1);
    }

    #[tokio::test]
    async fn test_hold_limit_rolls_regardless_of_band() {
        let config = StrategyConfig {
            days_to_expiry: 3,
            days_to_close: 1,
            ..wide_band_config()
        };
        let (broker, mut strategy) = paper_strategy(config).await;

        let chain = chain_on(day(0), -0.15, 0.15);
        feed(&broker, &chain).await;
        strategy.daily_trade_logic(at(0), Some(&chain)).await.unwrap();

        let chain = chain_on(day(1), -0.15, 0.15);
        feed(&broker, &chain).await;
        let held = strategy.daily_trade_logic(at(1), Some(&chain)).await.unwrap();
        assert_eq!(held.action, RebalanceAction::Hold);
        assert_eq!(strategy.days_held(), 2);

        let chain = chain_on(day(2), -0.15, 0.15);
        feed(&broker, &chain).await;
        let rolled = strategy.daily_trade_logic(at(2), Some(&chain)).await.unwrap();
        assert_eq!(rolled.action, RebalanceAction::Roll { days_held: 2 });
        assert_eq!(rolled.closing_orders, 3);
        assert_eq!(rolled.days_held, 1);
        assert_eq!(strategy.position().unwrap().opened_on, day(2));
    }

    #[tokio::test]
    async fn test_missing_chain_is_a_no_op() {
        let (broker, mut strategy) = paper_strategy(StrategyConfig::default()).await;

        let evaluation = strategy.daily_trade_logic(at(0), None).await.unwrap();
        assert_eq!(evaluation.action, RebalanceAction::Open);
        assert_eq!(evaluation.entry, Some(EntryOutcome::Skipped(SkipReason::NoChain)));
        assert_eq!(evaluation.days_held, 1);
        assert!(!broker.is_invested().await);
        assert_eq!(broker.get_state().await.order_count, 0);
    }

    #[tokio::test]
    async fn test_no_eligible_expiry_is_a_no_op() {
        let config = StrategyConfig {
            expiry_window: ExpiryWindow::new(40, 60),
            ..StrategyConfig::default()
        };
        let (broker, mut strategy) = paper_strategy(config).await;
        let chain = chain_on(day(0), -0.15, 0.15);
        feed(&broker, &chain).await;

        let outcome = strategy.enter_risk_reversal(at(0), Some(&chain)).await.unwrap();
        assert_eq!(
            outcome,
            EntryOutcome::Skipped(SkipReason::NoEligibleExpiry {
                min_days: 40,
                max_days: 60
            })
        );
        assert!(strategy.position().is_none());
    }

    #[tokio::test]
    async fn test_first_evaluation_records_zero_return() {
        let broker = Arc::new(PaperBrokerage::new("SPY", dec!(100000)));
        let mut strategy = RiskReversalStrategy::new(StrategyConfig::default(), broker);

        let evaluation = strategy.daily_trade_logic(at(0), None).await.unwrap();
        assert_eq!(evaluation.performance.daily_return, Decimal::ZERO);
        assert_eq!(evaluation.performance.portfolio_value, dec!(100000));
        assert_eq!(strategy.performance().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_greeks_holds_position() {
        let mut mock = MockBrokerage::new();
        mock.expect_total_portfolio_value().returning(|| dec!(100000));
        mock.expect_is_invested().returning(|| true);
        mock.expect_contract_delta().returning(|_| None);
        mock.expect_liquidate().never();
        mock.expect_market_order().never();

        let state = StrategyState {
            position: Some(RiskReversal {
                put_symbol: "SPY 105P 2010-02-20".to_string(),
                call_symbol: "SPY 120C 2010-02-20".to_string(),
                expiry: day(25),
                opened_on: day(0),
            }),
            days_held: 4,
            ..StrategyState::default()
        };
        let mut strategy =
            RiskReversalStrategy::new(StrategyConfig::default(), Arc::new(mock)).with_state(state);

        let evaluation = strategy.daily_trade_logic(at(4), None).await.unwrap();
        assert_eq!(evaluation.action, RebalanceAction::Hold);
        assert_eq!(evaluation.days_held, 5);
    }

    #[test]
    fn test_on_data_caches_underlying_price_only() {
        let broker = Arc::new(PaperBrokerage::new("SPY", dec!(100000)));
        let mut strategy = RiskReversalStrategy::new(StrategyConfig::default(), broker);

        strategy.on_data(&PriceUpdate::TradeBar {
            symbol: "SPY".to_string(),
            date: day(0),
            close: dec!(113.25),
        });
        strategy.on_data(&PriceUpdate::Tick {
            symbol: "QQQ".to_string(),
            last_price: dec!(45),
        });
        assert_eq!(strategy.underlying_price(), Some(dec!(113.25)));

        strategy.on_data(&PriceUpdate::Tick {
            symbol: "SPY".to_string(),
            last_price: dec!(113.40),
        });
        assert_eq!(strategy.underlying_price(), Some(dec!(113.40)));
    }
}
