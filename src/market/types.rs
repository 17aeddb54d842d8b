//! Option contract, chain and order types.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_DAY: i64 = 86_400;

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionRight {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Ok(Self::Call),
            "P" | "PUT" => Ok(Self::Put),
            other => anyhow::bail!("Unknown option right: {}", other),
        }
    }
}

/// Option greeks snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// A single listed option contract as seen at one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Unique contract identifier (e.g., "SPY 110P 2010-02-20")
    pub symbol: String,
    /// Underlying symbol (e.g., "SPY")
    pub underlying: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    /// Latest option price (per share)
    pub price: Decimal,
    pub greeks: Greeks,
}

impl OptionContract {
    /// Create a contract with a generated symbol and zero price/greeks.
    pub fn new(underlying: &str, expiry: NaiveDate, strike: Decimal, right: OptionRight) -> Self {
        let underlying = underlying.to_uppercase();
        Self {
            symbol: Self::display_symbol(&underlying, expiry, strike, right),
            underlying,
            expiry,
            strike,
            right,
            price: Decimal::ZERO,
            greeks: Greeks::default(),
        }
    }

    /// Human-readable contract identifier (e.g., "SPY 110P 2010-02-20").
    pub fn display_symbol(
        underlying: &str,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> String {
        format!("{} {}{} {}", underlying, strike.normalize(), right, expiry)
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.greeks.delta = delta;
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn delta(&self) -> f64 {
        self.greeks.delta
    }

    /// Calendar days from `today` until expiration (negative once expired).
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }

    /// Whole days from `now` until midnight of the expiration date, rounded down.
    ///
    /// An evaluation during the trading session counts one day fewer than
    /// [`days_to_expiry`](Self::days_to_expiry) does for the same date.
    pub fn days_until(&self, now: NaiveDateTime) -> i64 {
        let remaining = self.expiry.and_time(NaiveTime::MIN) - now;
        remaining.num_seconds().div_euclid(SECONDS_PER_DAY)
    }

    /// Value per share if exercised at `underlying_price`.
    pub fn intrinsic_value(&self, underlying_price: Decimal) -> Decimal {
        let value = match self.right {
            OptionRight::Call => underlying_price - self.strike,
            OptionRight::Put => self.strike - underlying_price,
        };
        value.max(Decimal::ZERO)
    }
}

/// All listed contracts for one underlying at one evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub date: NaiveDate,
    pub underlying_price: Option<Decimal>,
    pub contracts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn new(underlying: &str, date: NaiveDate) -> Self {
        Self {
            underlying: underlying.to_uppercase(),
            date,
            underlying_price: None,
            contracts: Vec::new(),
        }
    }

    pub fn with_contracts(mut self, contracts: Vec<OptionContract>) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn add_contract(&mut self, contract: OptionContract) {
        self.contracts.push(contract);
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Distinct strikes, ascending.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<Decimal> = self.contracts.iter().map(|c| c.strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    pub fn get(&self, symbol: &str) -> Option<&OptionContract> {
        self.contracts.iter().find(|c| c.symbol == symbol)
    }
}

/// Market data update for the underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PriceUpdate {
    /// Daily trade bar
    TradeBar {
        symbol: String,
        date: NaiveDate,
        close: Decimal,
    },
    /// Quote or tick carrying only a last price
    Tick { symbol: String, last_price: Decimal },
}

impl PriceUpdate {
    pub fn symbol(&self) -> &str {
        match self {
            Self::TradeBar { symbol, .. } | Self::Tick { symbol, .. } => symbol,
        }
    }

    /// Close for trade bars, last price otherwise.
    pub fn price(&self) -> Decimal {
        match self {
            Self::TradeBar { close, .. } => *close,
            Self::Tick { last_price, .. } => *last_price,
        }
    }
}

/// A filled market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub order_id: u64,
    pub symbol: String,
    /// Signed quantity: positive buys, negative sells
    pub quantity: Decimal,
    pub fill_price: Decimal,
    pub commission: Decimal,
}

impl OrderTicket {
    pub fn is_buy(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_option_right_parsing() {
        assert_eq!("C".parse::<OptionRight>().unwrap(), OptionRight::Call);
        assert_eq!("put".parse::<OptionRight>().unwrap(), OptionRight::Put);
        assert!("X".parse::<OptionRight>().is_err());
        assert_eq!(OptionRight::Put.to_string(), "P");
    }

    #[test]
    fn test_contract_symbol_and_days() {
        let c = OptionContract::new("spy", date(2010, 2, 20), dec!(110.0), OptionRight::Put);
        assert_eq!(c.symbol, "SPY 110P 2010-02-20");
        assert_eq!(c.underlying, "SPY");
        assert_eq!(c.days_to_expiry(date(2010, 1, 26)), 25);
        assert_eq!(c.days_to_expiry(date(2010, 2, 21)), -1);
    }

    #[test]
    fn test_days_until_counts_from_evaluation_time() {
        let c = OptionContract::new("SPY", date(2010, 2, 20), dec!(110), OptionRight::Put);
        let session = |d: NaiveDate| d.and_hms_opt(9, 35, 0).unwrap();

        assert_eq!(c.days_until(session(date(2010, 1, 26))), 24);
        assert_eq!(c.days_until(date(2010, 1, 26).and_time(NaiveTime::MIN)), 25);
        assert_eq!(c.days_until(session(date(2010, 2, 20))), -1);
    }

    #[test]
    fn test_intrinsic_value() {
        let put = OptionContract::new("SPY", date(2010, 2, 20), dec!(110), OptionRight::Put);
        let call = OptionContract::new("SPY", date(2010, 2, 20), dec!(110), OptionRight::Call);
        assert_eq!(put.intrinsic_value(dec!(105)), dec!(5));
        assert_eq!(put.intrinsic_value(dec!(115)), Decimal::ZERO);
        assert_eq!(call.intrinsic_value(dec!(115)), dec!(5));
        assert_eq!(call.intrinsic_value(dec!(105)), Decimal::ZERO);
    }

    #[test]
    fn test_chain_strikes_sorted_and_deduped() {
        let mut chain = OptionChain::new("SPY", date(2010, 1, 5));
        chain.add_contract(OptionContract::new("SPY", date(2010, 2, 20), dec!(110), OptionRight::Put));
        chain.add_contract(OptionContract::new("SPY", date(2010, 1, 16), dec!(110), OptionRight::Put));
        chain.add_contract(OptionContract::new("SPY", date(2010, 2, 20), dec!(115), OptionRight::Call));
        chain.add_contract(OptionContract::new("SPY", date(2010, 2, 20), dec!(105), OptionRight::Call));

        assert_eq!(chain.strikes(), vec![dec!(105), dec!(110), dec!(115)]);
        assert_eq!(chain.len(), 4);
        assert!(chain.get("SPY 115C 2010-02-20").is_some());
    }

    #[test]
    fn test_price_update_price() {
        let bar = PriceUpdate::TradeBar {
            symbol: "SPY".to_string(),
            date: date(2010, 1, 5),
            close: dec!(113.5),
        };
        let tick = PriceUpdate::Tick {
            symbol: "SPY".to_string(),
            last_price: dec!(113.7),
        };
        assert_eq!(bar.price(), dec!(113.5));
        assert_eq!(tick.price(), dec!(113.7));
        assert_eq!(tick.symbol(), "SPY");
    }
}
