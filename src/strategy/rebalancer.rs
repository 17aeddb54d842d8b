//! Hold / roll / rebalance decision for an open risk reversal.

use crate::config::{DeltaBand, StrategyConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Action decided for one scheduled evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RebalanceAction {
    /// Nothing held, try to open a position
    Open,
    /// Hold limit reached, close and reopen regardless of delta
    Roll { days_held: u32 },
    /// Net delta left the band, close and reopen
    Rebalance { net_delta: f64 },
    /// Keep the current position
    Hold,
}

impl RebalanceAction {
    /// Whether the action closes the current position first.
    pub fn closes_position(&self) -> bool {
        matches!(self, Self::Roll { .. } | Self::Rebalance { .. })
    }

    /// Whether the action tries to open a new position.
    pub fn opens_position(&self) -> bool {
        !matches!(self, Self::Hold)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Roll { .. } => "roll",
            Self::Rebalance { .. } => "rebalance",
            Self::Hold => "hold",
        }
    }
}

/// Decides when a held risk reversal must be replaced.
#[derive(Debug, Clone)]
pub struct DeltaRebalancer {
    band: DeltaBand,
    days_to_expiry: u32,
    days_to_close: u32,
}

impl DeltaRebalancer {
    pub fn new(band: DeltaBand, days_to_expiry: u32, days_to_close: u32) -> Self {
        Self {
            band,
            days_to_expiry,
            days_to_close,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.delta_band, config.days_to_expiry, config.days_to_close)
    }

    /// Days a position may be held before it is rolled.
    pub fn hold_limit(&self) -> u32 {
        self.days_to_expiry.saturating_sub(self.days_to_close)
    }

    pub fn hold_limit_reached(&self, days_held: u32) -> bool {
        days_held >= self.hold_limit()
    }

    /// Net delta of the held pair.
    pub fn net_delta(put_delta: f64, call_delta: f64) -> f64 {
        put_delta + call_delta
    }

    /// Decide the action for this evaluation.
    ///
    /// `net_delta` is only consulted for an invested portfolio below the
    /// hold limit; `None` there means greeks are unavailable and the
    /// position is held.
    pub fn analyze(&self, invested: bool, days_held: u32, net_delta: Option<f64>) -> RebalanceAction {
        if !invested {
            return RebalanceAction::Open;
        }

        if self.hold_limit_reached(days_held) {
            info!(
                days_held,
                hold_limit = self.hold_limit(),
                "Hold limit reached, rolling position"
            );
            return RebalanceAction::Roll { days_held };
        }

        let Some(net_delta) = net_delta else {
            debug!(days_held, "Net delta unavailable, holding position");
            return RebalanceAction::Hold;
        };

        if self.band.contains(net_delta) {
            debug!(
                net_delta,
                lower = self.band.lower,
                upper = self.band.upper,
                "Net delta inside band"
            );
            RebalanceAction::Hold
        } else {
            info!(
                net_delta,
                lower = self.band.lower,
                upper = self.band.upper,
                "Net delta outside band, rebalancing"
            );
            RebalanceAction::Rebalance { net_delta }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebalancer() -> DeltaRebalancer {
        DeltaRebalancer::new(DeltaBand::new(0.20, 0.40), 25, 5)
    }

    #[test]
    fn test_hold_limit() {
        assert_eq!(rebalancer().hold_limit(), 20);
        assert!(!rebalancer().hold_limit_reached(19));
        assert!(rebalancer().hold_limit_reached(20));
        assert_eq!(DeltaRebalancer::new(DeltaBand::default(), 3, 5).hold_limit(), 0);
    }

    #[test]
    fn test_not_invested_opens() {
        assert_eq!(rebalancer().analyze(false, 7, Some(0.3)), RebalanceAction::Open);
    }

    #[test]
    fn test_roll_takes_priority_over_band() {
        assert_eq!(
            rebalancer().analyze(true, 20, Some(0.3)),
            RebalanceAction::Roll { days_held: 20 }
        );
        assert_eq!(
            rebalancer().analyze(true, 21, None),
            RebalanceAction::Roll { days_held: 21 }
        );
    }

    #[test]
    fn test_band_breach_rebalances() {
        assert_eq!(
            rebalancer().analyze(true, 3, Some(0.0)),
            RebalanceAction::Rebalance { net_delta: 0.0 }
        );
        assert_eq!(
            rebalancer().analyze(true, 3, Some(0.55)),
            RebalanceAction::Rebalance { net_delta: 0.55 }
        );
    }

    #[test]
    fn test_inside_band_or_unknown_delta_holds() {
        assert_eq!(rebalancer().analyze(true, 3, Some(0.25)), RebalanceAction::Hold);
        assert_eq!(rebalancer().analyze(true, 3, Some(0.40)), RebalanceAction::Hold);
        assert_eq!(rebalancer().analyze(true, 3, None), RebalanceAction::Hold);
    }

    #[test]
    fn test_action_flags() {
        assert!(RebalanceAction::Roll { days_held: 20 }.closes_position());
        assert!(RebalanceAction::Rebalance { net_delta: 0.5 }.opens_position());
        assert!(!RebalanceAction::Open.closes_position());
        assert!(!RebalanceAction::Hold.opens_position());
        assert_eq!(RebalanceAction::Rebalance { net_delta: 0.5 }.label(), "rebalance");
    }

    #[test]
    fn test_net_delta() {
        assert_eq!(DeltaRebalancer::net_delta(-0.25, 0.5), 0.25);
    }
}
