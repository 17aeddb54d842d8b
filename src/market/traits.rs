//! Host-facing brokerage abstraction.
//!
//! The strategy never talks to a venue directly. Whatever drives it (the
//! paper brokerage in backtests, a live host adapter in production) exposes
//! portfolio state, greeks of held contracts and order execution through
//! this trait.

use super::types::OrderTicket;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Submit a market order. Positive quantity buys, negative sells.
    async fn market_order(&self, symbol: &str, quantity: Decimal) -> anyhow::Result<OrderTicket>;

    /// Close every open holding at market.
    async fn liquidate(&self) -> anyhow::Result<Vec<OrderTicket>>;

    /// Cash plus marked value of all holdings.
    async fn total_portfolio_value(&self) -> Decimal;

    /// Whether any holding has a non-zero quantity.
    async fn is_invested(&self) -> bool;

    /// Current delta of a contract, if the host has greeks for it.
    async fn contract_delta(&self, symbol: &str) -> Option<f64>;
}
