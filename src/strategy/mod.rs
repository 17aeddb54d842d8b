//! Risk reversal trading strategy.
//!
//! Contains the core logic for:
//! - Expiry and delta-targeted contract selection
//! - Hold / roll / rebalance decisions on net delta
//! - The scheduled daily decision procedure and its state

mod rebalancer;
mod risk_reversal;
mod selector;

pub use rebalancer::{DeltaRebalancer, RebalanceAction};
pub use risk_reversal::{
    EntryOutcome, Evaluation, EvaluationError, RiskReversal, RiskReversalStrategy, StrategyState,
};
pub use selector::{closest_to_delta, ContractSelector, RiskReversalLegs, SkipReason};
