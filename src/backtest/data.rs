//! Historical underlying and option chain loading for backtesting.

use crate::market::{OptionChain, OptionContract, OptionRight, PriceUpdate};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Market data for one trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    /// Underlying close, if the day carries one
    pub underlying_price: Option<Decimal>,
    pub chain: OptionChain,
}

impl DailySnapshot {
    /// Create an empty snapshot for `underlying` on `date`.
    pub fn new(underlying: &str, date: NaiveDate) -> Self {
        Self {
            date,
            underlying_price: None,
            chain: OptionChain::new(underlying, date),
        }
    }

    /// Underlying bar for the strategy's price cache.
    pub fn price_update(&self) -> Option<PriceUpdate> {
        self.underlying_price.map(|close| PriceUpdate::TradeBar {
            symbol: self.chain.underlying.clone(),
            date: self.date,
            close,
        })
    }

    /// The option chain, or `None` when no contracts were listed that day.
    pub fn chain(&self) -> Option<&OptionChain> {
        if self.chain.is_empty() {
            None
        } else {
            Some(&self.chain)
        }
    }
}

/// Trait for loading historical market data.
pub trait DataLoader: Send + Sync {
    /// Load all snapshots between `start` and `end` inclusive.
    fn load_snapshots(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailySnapshot>>;

    /// Get the available date range in the data.
    fn available_range(&self) -> Option<(NaiveDate, NaiveDate)>;
}

/// CSV data loader for historical backtesting.
///
/// Expected CSV format (underlying rows leave the option columns empty):
/// ```csv
/// date,symbol,price,expiry,right,strike,delta
/// 2010-01-26,SPY,112.00,,,,
/// 2010-01-26,SPY 105P 2010-02-20,0.80,2010-02-20,P,105,-0.15
/// ```
#[derive(Clone)]
pub struct CsvDataLoader {
    underlying: String,
    /// Snapshots sorted by date
    snapshots: Vec<DailySnapshot>,
}

impl CsvDataLoader {
    /// Load data from a CSV file.
    pub fn new<P: AsRef<Path>>(path: P, underlying: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

        Self::from_csv_content(&content, underlying)
    }

    /// Load data from CSV content string.
    pub fn from_csv_content(content: &str, underlying: &str) -> Result<Self> {
        let underlying = underlying.to_uppercase();
        let mut by_date: BTreeMap<NaiveDate, DailySnapshot> = BTreeMap::new();
        let mut row_count = 0usize;

        for (line_num, line) in content.lines().enumerate() {
            // Skip header
            if line_num == 0 && line.starts_with("date") {
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            let row = CsvRow::parse(line)
                .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
            row_count += 1;

            let snapshot = by_date
                .entry(row.date)
                .or_insert_with(|| DailySnapshot::new(&underlying, row.date));

            match row.option {
                Some(leg) => {
                    let mut contract =
                        OptionContract::new(&underlying, leg.expiry, leg.strike, leg.right)
                            .with_price(row.price)
                            // Missing greeks never win a delta selection
                            .with_delta(leg.delta.unwrap_or(f64::NAN));
                    if !row.symbol.is_empty() {
                        contract = contract.with_symbol(row.symbol);
                    }
                    snapshot.chain.add_contract(contract);
                }
                None if row.symbol.eq_ignore_ascii_case(&underlying) => {
                    snapshot.underlying_price = Some(row.price);
                    snapshot.chain.underlying_price = Some(row.price);
                }
                None => {
                    debug!(symbol = %row.symbol, date = %row.date, "Ignoring unrelated row");
                }
            }
        }

        if row_count == 0 {
            anyhow::bail!("CSV file contains no data rows");
        }

        let snapshots: Vec<DailySnapshot> = by_date.into_values().collect();

        debug!(
            %underlying,
            rows = row_count,
            days = snapshots.len(),
            "Loaded option chain history"
        );

        Ok(Self {
            underlying,
            snapshots,
        })
    }

    /// Create a loader from in-memory snapshots.
    pub fn from_snapshots(underlying: &str, mut snapshots: Vec<DailySnapshot>) -> Self {
        snapshots.sort_by_key(|s| s.date);
        Self {
            underlying: underlying.to_uppercase(),
            snapshots,
        }
    }

    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    /// Get total number of trading days.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the loader has no data.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl DataLoader for CsvDataLoader {
    fn load_snapshots(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailySnapshot>> {
        let filtered: Vec<DailySnapshot> = self
            .snapshots
            .iter()
            .filter(|s| s.date >= start && s.date <= end)
            .cloned()
            .collect();

        Ok(filtered)
    }

    fn available_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.snapshots.first()?.date;
        let end = self.snapshots.last()?.date;
        Some((start, end))
    }
}

/// Option columns of a CSV row.
#[derive(Debug)]
struct OptionColumns {
    expiry: NaiveDate,
    right: OptionRight,
    strike: Decimal,
    delta: Option<f64>,
}

/// Internal struct for parsing CSV rows.
#[derive(Debug)]
struct CsvRow {
    date: NaiveDate,
    symbol: String,
    price: Decimal,
    option: Option<OptionColumns>,
}

impl CsvRow {
    fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            anyhow::bail!(
                "Expected at least 3 columns (date,symbol,price,expiry,right,strike,delta), got {}",
                parts.len()
            );
        }

        let column = |i: usize| parts.get(i).copied().unwrap_or("");

        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d")
            .with_context(|| format!("Invalid date: {}", parts[0]))?;
        let price: Decimal = parts[2]
            .parse()
            .with_context(|| format!("Invalid price: {}", parts[2]))?;

        let option = if column(3).is_empty() {
            None
        } else {
            let expiry = NaiveDate::parse_from_str(column(3), "%Y-%m-%d")
                .with_context(|| format!("Invalid expiry: {}", column(3)))?;
            let right: OptionRight = column(4).parse()?;
            let strike: Decimal = column(5)
                .parse()
                .with_context(|| format!("Invalid strike: {}", column(5)))?;
            let delta = match column(6) {
                "" => None,
                raw => Some(
                    raw.parse::<f64>()
                        .with_context(|| format!("Invalid delta: {}", raw))?,
                ),
            };
            Some(OptionColumns {
                expiry,
                right,
                strike,
                delta,
            })
        };

        Ok(Self {
            date,
            symbol: parts[1].to_string(),
            price,
            option,
        })
    }
}
