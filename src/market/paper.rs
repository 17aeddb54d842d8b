//! Paper brokerage for backtesting and tests.
//!
//! Simulates the host side of the strategy: cash, holdings, market fills at
//! the latest known price, per-contract option commission and cash
//! settlement of expired options.

use super::traits::Brokerage;
use super::types::{OptionChain, OptionContract, OrderTicket};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A single open holding.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    /// Signed quantity: positive long, negative short
    pub quantity: Decimal,
    pub average_price: Decimal,
    /// Units of underlying per quantity (100 for options, 1 for shares)
    pub multiplier: Decimal,
}

/// Simulated account state.
#[derive(Debug, Clone)]
pub struct PaperState {
    pub initial_cash: Decimal,
    pub cash: Decimal,
    pub holdings: HashMap<String, Holding>,
    pub total_commission: Decimal,
    pub total_settlement: Decimal,
    pub order_count: u64,
}

impl PaperState {
    fn new(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            holdings: HashMap::new(),
            total_commission: Decimal::ZERO,
            total_settlement: Decimal::ZERO,
            order_count: 0,
        }
    }
}

impl Default for PaperState {
    fn default() -> Self {
        Self::new(dec!(100000))
    }
}

/// Outcome of settling one expired option holding.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub symbol: String,
    pub quantity: Decimal,
    pub intrinsic_value: Decimal,
    pub cash_flow: Decimal,
}

/// Paper brokerage that fills every market order at the latest known price.
pub struct PaperBrokerage {
    state: Arc<RwLock<PaperState>>,
    order_id_counter: AtomicU64,
    underlying: String,
    /// Latest known prices (underlying and option contracts)
    prices: Arc<RwLock<HashMap<String, Decimal>>>,
    /// Latest known option deltas
    deltas: Arc<RwLock<HashMap<String, f64>>>,
    /// Every option contract seen so far, keyed by symbol
    contracts: Arc<RwLock<HashMap<String, OptionContract>>>,
    option_commission: Decimal,
    option_multiplier: Decimal,
}

impl PaperBrokerage {
    /// Create a paper brokerage with starting cash for one underlying.
    pub fn new(underlying: &str, initial_cash: Decimal) -> Self {
        Self {
            state: Arc::new(RwLock::new(PaperState::new(initial_cash))),
            order_id_counter: AtomicU64::new(1),
            underlying: underlying.to_uppercase(),
            prices: Arc::new(RwLock::new(HashMap::new())),
            deltas: Arc::new(RwLock::new(HashMap::new())),
            contracts: Arc::new(RwLock::new(HashMap::new())),
            option_commission: dec!(0.65),
            option_multiplier: dec!(100),
        }
    }

    /// Override commission per option contract.
    pub fn with_option_commission(mut self, commission: Decimal) -> Self {
        self.option_commission = commission;
        self
    }

    /// Override shares per option contract.
    pub fn with_option_multiplier(mut self, multiplier: Decimal) -> Self {
        self.option_multiplier = multiplier;
        self
    }

    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    /// Set the latest price of any symbol.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().await.insert(symbol.to_string(), price);
    }

    /// Merge the day's underlying price and option chain into known market data.
    ///
    /// Prices and greeks of contracts missing from the chain keep their last
    /// known values so held contracts can always be marked and closed.
    pub async fn update_market_data(&self, underlying_price: Option<Decimal>, chain: &OptionChain) {
        let mut prices = self.prices.write().await;
        let mut deltas = self.deltas.write().await;
        let mut contracts = self.contracts.write().await;

        if let Some(price) = underlying_price {
            prices.insert(self.underlying.clone(), price);
        }

        for contract in &chain.contracts {
            prices.insert(contract.symbol.clone(), contract.price);
            if contract.greeks.delta.is_finite() {
                deltas.insert(contract.symbol.clone(), contract.greeks.delta);
            }
            contracts.insert(contract.symbol.clone(), contract.clone());
        }

        debug!(
            date = %chain.date,
            contracts = chain.contracts.len(),
            underlying_price = ?underlying_price,
            "Market data updated"
        );
    }

    /// Reset all state for a new run.
    pub async fn reset(&self, initial_cash: Decimal) {
        *self.state.write().await = PaperState::new(initial_cash);
        self.order_id_counter.store(1, Ordering::SeqCst);
        self.prices.write().await.clear();
        self.deltas.write().await.clear();
        self.contracts.write().await.clear();

        debug!(cash = %initial_cash, "Paper brokerage state reset");
    }

    /// Snapshot of the current account state.
    pub async fn get_state(&self) -> PaperState {
        self.state.read().await.clone()
    }

    /// Cash-settle option holdings that expired before `today`.
    ///
    /// Market data of expired contracts is dropped once nothing holds them.
    pub async fn settle_expired(&self, today: NaiveDate) -> Vec<Settlement> {
        let mut state = self.state.write().await;
        let mut prices = self.prices.write().await;
        let mut deltas = self.deltas.write().await;
        let mut contracts = self.contracts.write().await;

        let mut settlements = Vec::new();
        match prices.get(&self.underlying).copied() {
            Some(underlying_price) => {
                let mut expired: Vec<OptionContract> = state
                    .holdings
                    .keys()
                    .filter_map(|symbol| contracts.get(symbol).filter(|c| c.expiry < today))
                    .cloned()
                    .collect();
                expired.sort_by(|a, b| a.symbol.cmp(&b.symbol));

                for contract in expired {
                    let Some(holding) = state.holdings.remove(&contract.symbol) else {
                        continue;
                    };

                    let intrinsic_value = contract.intrinsic_value(underlying_price);
                    let cash_flow = holding.quantity * intrinsic_value * holding.multiplier;
                    state.cash += cash_flow;
                    state.total_settlement += cash_flow;

                    info!(
                        symbol = %contract.symbol,
                        quantity = %holding.quantity,
                        %intrinsic_value,
                        %cash_flow,
                        "Option expired and settled"
                    );

                    settlements.push(Settlement {
                        symbol: contract.symbol,
                        quantity: holding.quantity,
                        intrinsic_value,
                        cash_flow,
                    });
                }
            }
            None if !state.holdings.is_empty() => {
                warn!(%today, "No underlying price, skipping expiry settlement");
            }
            None => {}
        }

        let stale: Vec<String> = contracts
            .values()
            .filter(|c| c.expiry < today && !state.holdings.contains_key(&c.symbol))
            .map(|c| c.symbol.clone())
            .collect();
        for symbol in &stale {
            contracts.remove(symbol);
            prices.remove(symbol);
            deltas.remove(symbol);
        }
        if !stale.is_empty() {
            debug!(%today, dropped = stale.len(), "Expired contracts dropped");
        }

        settlements
    }

    /// Number of option contracts with known market data.
    pub async fn tracked_contracts(&self) -> usize {
        self.contracts.read().await.len()
    }

    fn next_order_id(&self) -> u64 {
        self.order_id_counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Brokerage for PaperBrokerage {
    async fn market_order(&self, symbol: &str, quantity: Decimal) -> Result<OrderTicket> {
        anyhow::ensure!(quantity != Decimal::ZERO, "Order quantity for {} is zero", symbol);

        let mut state = self.state.write().await;
        let prices = self.prices.read().await;
        let contracts = self.contracts.read().await;

        let Some(&price) = prices.get(symbol) else {
            anyhow::bail!("No price available for {}", symbol);
        };

        let is_option = contracts.contains_key(symbol);
        let (multiplier, commission) = if is_option {
            (self.option_multiplier, self.option_commission * quantity.abs())
        } else {
            (Decimal::ONE, Decimal::ZERO)
        };

        state.cash -= quantity * price * multiplier + commission;
        state.total_commission += commission;
        state.order_count += 1;

        let holding = state
            .holdings
            .entry(symbol.to_string())
            .or_insert_with(|| Holding {
                symbol: symbol.to_string(),
                quantity: Decimal::ZERO,
                average_price: Decimal::ZERO,
                multiplier,
            });

        let previous = holding.quantity;
        let updated = previous + quantity;
        if previous == Decimal::ZERO || previous.is_sign_negative() != updated.is_sign_negative() {
            // Opening or flipping through zero
            holding.average_price = price;
        } else if updated.abs() > previous.abs() {
            holding.average_price =
                (previous * holding.average_price + quantity * price) / updated;
        }
        holding.quantity = updated;

        if updated == Decimal::ZERO {
            state.holdings.remove(symbol);
        }

        let order_id = self.next_order_id();

        info!(
            order_id,
            %symbol,
            %quantity,
            %price,
            %commission,
            cash = %state.cash,
            "Paper order filled"
        );

        Ok(OrderTicket {
            order_id,
            symbol: symbol.to_string(),
            quantity,
            fill_price: price,
            commission,
        })
    }

    async fn liquidate(&self) -> Result<Vec<OrderTicket>> {
        let mut open: Vec<(String, Decimal)> = self
            .state
            .read()
            .await
            .holdings
            .values()
            .filter(|h| h.quantity != Decimal::ZERO)
            .map(|h| (h.symbol.clone(), h.quantity))
            .collect();
        open.sort_by(|a, b| a.0.cmp(&b.0));

        let mut tickets = Vec::with_capacity(open.len());
        for (symbol, quantity) in open {
            tickets.push(self.market_order(&symbol, -quantity).await?);
        }

        info!(orders = tickets.len(), "Portfolio liquidated");
        Ok(tickets)
    }

    async fn total_portfolio_value(&self) -> Decimal {
        let state = self.state.read().await;
        let prices = self.prices.read().await;

        let holdings_value: Decimal = state
            .holdings
            .values()
            .map(|h| {
                let price = prices.get(&h.symbol).copied().unwrap_or(h.average_price);
                h.quantity * price * h.multiplier
            })
            .sum();

        state.cash + holdings_value
    }

    async fn is_invested(&self) -> bool {
        self.state
            .read()
            .await
            .holdings
            .values()
            .any(|h| h.quantity != Decimal::ZERO)
    }

    async fn contract_delta(&self, symbol: &str) -> Option<f64> {
        self.deltas.read().await.get(symbol).copied()
    }
}
