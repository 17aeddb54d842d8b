//! Delta-targeted contract selection for a risk reversal.

use crate::config::{ExpiryWindow, StrategyConfig};
use crate::market::{OptionChain, OptionContract, OptionRight};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

/// Why no risk reversal could be opened this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no option chain available")]
    NoChain,
    #[error("no expiry between {min_days} and {max_days} days")]
    NoEligibleExpiry { min_days: i64, max_days: i64 },
    #[error("no puts listed at expiry {0}")]
    NoPuts(NaiveDate),
    #[error("no calls listed at expiry {0}")]
    NoCalls(NaiveDate),
}

/// The two option legs chosen for a new position.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReversalLegs {
    pub expiry: NaiveDate,
    pub put: OptionContract,
    pub call: OptionContract,
}

impl RiskReversalLegs {
    pub fn net_delta(&self) -> f64 {
        self.put.delta() + self.call.delta()
    }
}

/// Picks the expiry and the put/call closest to the target delta.
///
/// Only contracts in the tradable universe are considered: expiring inside
/// the window by calendar date and struck within `strike_range` strikes of
/// the money. The expiry itself must then be inside the window counted from
/// the evaluation time.
#[derive(Debug, Clone)]
pub struct ContractSelector {
    delta_target: f64,
    window: ExpiryWindow,
    strike_range: Option<usize>,
}

impl ContractSelector {
    pub fn new(delta_target: f64, window: ExpiryWindow) -> Self {
        Self {
            delta_target,
            window,
            strike_range: None,
        }
    }

    /// Limit the universe to `range` strikes either side of the money.
    pub fn with_strike_range(mut self, range: u32) -> Self {
        self.strike_range = Some(range as usize);
        self
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.delta_target, config.expiry_window).with_strike_range(config.strike_range)
    }

    /// Contracts eligible for trading on the evaluation day.
    pub fn universe<'a>(&self, chain: &'a OptionChain, today: NaiveDate) -> Vec<&'a OptionContract> {
        let strikes = self.strike_bounds(chain);
        chain
            .contracts
            .iter()
            .filter(|c| self.window.contains(c.days_to_expiry(today)))
            .filter(|c| strikes.map_or(true, |(low, high)| c.strike >= low && c.strike <= high))
            .collect()
    }

    /// Earliest universe expiry inside the window as seen from `now`.
    pub fn select_expiry(&self, chain: &OptionChain, now: NaiveDateTime) -> Option<NaiveDate> {
        self.earliest_expiry(&self.universe(chain, now.date()), now)
    }

    /// Choose both legs, or report why the chain cannot support an entry.
    pub fn select(
        &self,
        chain: Option<&OptionChain>,
        now: NaiveDateTime,
    ) -> Result<RiskReversalLegs, SkipReason> {
        let chain = match chain {
            Some(chain) if !chain.is_empty() => chain,
            _ => return Err(SkipReason::NoChain),
        };

        let universe = self.universe(chain, now.date());
        let expiry = self
            .earliest_expiry(&universe, now)
            .ok_or(SkipReason::NoEligibleExpiry {
                min_days: self.window.min_days,
                max_days: self.window.max_days,
            })?;

        let at_expiry = |right: OptionRight| {
            universe
                .iter()
                .copied()
                .filter(move |c| c.expiry == expiry && c.right == right)
        };
        let put = closest_to_delta(at_expiry(OptionRight::Put), -self.delta_target)
            .ok_or(SkipReason::NoPuts(expiry))?;
        let call = closest_to_delta(at_expiry(OptionRight::Call), self.delta_target)
            .ok_or(SkipReason::NoCalls(expiry))?;

        debug!(
            %expiry,
            universe = universe.len(),
            put = %put.symbol,
            put_delta = put.delta(),
            call = %call.symbol,
            call_delta = call.delta(),
            "Selected risk reversal legs"
        );

        Ok(RiskReversalLegs {
            expiry,
            put: put.clone(),
            call: call.clone(),
        })
    }

    fn earliest_expiry(&self, universe: &[&OptionContract], now: NaiveDateTime) -> Option<NaiveDate> {
        universe
            .iter()
            .filter(|c| self.window.contains(c.days_until(now)))
            .map(|c| c.expiry)
            .min()
    }

    /// Lowest and highest strike within range of the at-the-money strike.
    ///
    /// The at-the-money strike is the one nearest the underlying price, the
    /// lower one on a tie. Without an underlying price nothing is excluded.
    fn strike_bounds(&self, chain: &OptionChain) -> Option<(Decimal, Decimal)> {
        let range = self.strike_range?;
        let price = chain.underlying_price?;
        let strikes = chain.strikes();

        let (atm, _) = strikes
            .iter()
            .enumerate()
            .min_by_key(|(_, strike)| (**strike - price).abs())?;

        let low = strikes[atm.saturating_sub(range)];
        let high = strikes[(atm + range).min(strikes.len() - 1)];
        Some((low, high))
    }
}

/// Contract whose delta is nearest `target`.
///
/// Ties resolve to the lower strike, then the lexically smaller symbol.
/// Contracts without a finite delta are ignored.
pub fn closest_to_delta<'a>(
    candidates: impl IntoIterator<Item = &'a OptionContract>,
    target: f64,
) -> Option<&'a OptionContract> {
    candidates
        .into_iter()
        .filter(|c| c.delta().is_finite())
        .min_by(|a, b| {
            let da = (a.delta() - target).abs();
            let db = (b.delta() - target).abs();
            da.total_cmp(&db)
                .then_with(|| a.strike.cmp(&b.strike))
                .then_with(|| a.symbol.cmp(&b.symbol))
        })
}
