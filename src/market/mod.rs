//! Market-side types and the host brokerage.
//!
//! ## Types
//! Option contracts, option chain snapshots, underlying price updates and
//! filled order tickets.
//!
//! ## Brokerage
//! The [`Brokerage`] trait is everything the strategy needs from its host:
//! orders, liquidation, portfolio value, invested status and greeks of held
//! contracts. [`PaperBrokerage`] implements it in memory for backtests.

pub mod paper;
mod traits;
mod types;

pub use paper::{Holding, PaperBrokerage, PaperState, Settlement};
pub use traits::Brokerage;
#[cfg(test)]
pub use traits::MockBrokerage;
pub use types::*;
