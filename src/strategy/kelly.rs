//! Fractional Kelly staking.
//!
//! Converts an approved edge into a bounded capital stake: fractional
//! Kelly with a bankroll-percentage cap and a minimum-stake floor.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::edge::EdgeSignal;
use crate::types::StakeDecision;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Staking configuration.
#[derive(Debug, Clone)]
pub struct StakingConfig {
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly). Lower = more conservative.
    pub kelly_fraction: f64,
    /// Maximum stake as a fraction of current bankroll.
    pub max_stake_pct: f64,
    /// Minimum stake; anything smaller is treated as no bet.
    pub min_stake: Decimal,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            kelly_fraction: 0.25, // Quarter-Kelly
            max_stake_pct: 0.05,  // Max 5% of bankroll per bet
            min_stake: dec!(1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Staking engine
// ---------------------------------------------------------------------------

pub struct StakingEngine {
    config: StakingConfig,
}

impl StakingEngine {
    pub fn new(config: StakingConfig) -> Self {
        Self { config }
    }

    /// Access the staking configuration.
    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    /// Size a stake for an edge signal against the current bankroll.
    ///
    /// Kelly formula: f* = (b·p − q) / b with b = odds − 1.
    ///
    /// A non-positive f* produces a zero stake even when the raw edge
    /// number is positive — at short odds the devigged edge and Kelly can
    /// disagree, and Kelly is the one that prices the risk.
    pub fn compute_stake(&self, signal: &EdgeSignal, bankroll: Decimal) -> StakeDecision {
        let b = signal.odds - 1.0;
        let p = signal.model_prob;
        let q = 1.0 - p;

        let kelly_raw = if b <= 0.0 { 0.0 } else { (b * p - q) / b };

        if kelly_raw <= 0.0 || bankroll <= Decimal::ZERO {
            debug!(
                outcome = %signal.outcome,
                kelly_raw,
                edge = signal.edge,
                "Non-positive Kelly — no bet"
            );
            return self.no_bet(signal, kelly_raw.max(0.0), 0.0);
        }

        // Fractional Kelly, then the hard bankroll-percentage cap.
        let fractional = kelly_raw * self.config.kelly_fraction;
        let capped = fractional.min(self.config.max_stake_pct);

        let stake = (bankroll * Decimal::from_f64(capped).unwrap_or(Decimal::ZERO)).round_dp(2);

        if stake < self.config.min_stake {
            debug!(
                outcome = %signal.outcome,
                %stake,
                min = %self.config.min_stake,
                "Stake below minimum — no bet"
            );
            return self.no_bet(signal, kelly_raw, capped);
        }

        debug!(
            outcome = %signal.outcome,
            kelly_raw = format!("{:.2}%", kelly_raw * 100.0),
            effective = format!("{:.2}%", capped * 100.0),
            stake = %stake,
            "Stake sized"
        );

        StakeDecision {
            outcome: signal.outcome,
            stake,
            odds: signal.odds,
            model_prob: signal.model_prob,
            fair_prob: signal.fair_prob,
            edge: signal.edge,
            kelly_raw,
            kelly_capped: capped,
        }
    }

    fn no_bet(&self, signal: &EdgeSignal, kelly_raw: f64, kelly_capped: f64) -> StakeDecision {
        StakeDecision {
            outcome: signal.outcome,
            stake: Decimal::ZERO,
            odds: signal.odds,
            model_prob: signal.model_prob,
            fair_prob: signal.fair_prob,
            edge: signal.edge,
            kelly_raw,
            kelly_capped,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
