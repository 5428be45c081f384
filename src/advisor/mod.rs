//! Advisory layer — an optional second opinion on each stake candidate.
//!
//! Defines the `BetAdvisor` trait. The advisor sits between staking and
//! ledger commit: a rejection zeroes the stake regardless of the computed
//! edge, and an approval may scale it with a bounded multiplier.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::Outcome;

/// Lower and upper bounds on the advisory stake multiplier.
pub const MIN_STAKE_MULTIPLIER: f64 = 0.0;
pub const MAX_STAKE_MULTIPLIER: f64 = 2.0;

/// Everything the advisor sees about one candidate.
#[derive(Debug, Clone)]
pub struct AdviceRequest {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub outcome: Outcome,
    pub odds: f64,
    pub model_prob: f64,
    pub fair_prob: f64,
    pub edge: f64,
    pub stake: Decimal,
}

/// The advisor's verdict on one candidate.
#[derive(Debug, Clone)]
pub struct BetAnalysis {
    /// A veto: false forces the stake to zero.
    pub approved: bool,
    /// How sure the advisor is of its own verdict, 0.0–1.0.
    pub confidence: f64,
    pub reasoning: String,
    /// Scaling applied to the stake, clamped to [0.0, 2.0]. Values above 1
    /// express extra conviction; the max-stake cap still applies afterwards.
    pub stake_multiplier: f64,
}

impl BetAnalysis {
    /// Clamp the multiplier into its legal range. Applied on every path
    /// that constructs an analysis from external input.
    pub fn clamped(mut self) -> Self {
        self.stake_multiplier = self
            .stake_multiplier
            .clamp(MIN_STAKE_MULTIPLIER, MAX_STAKE_MULTIPLIER);
        if !self.stake_multiplier.is_finite() {
            self.stake_multiplier = MIN_STAKE_MULTIPLIER;
        }
        self
    }

    /// The conservative fallback verdict when analysis is unavailable.
    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            confidence: 0.0,
            reasoning: reason.into(),
            stake_multiplier: 0.0,
        }
    }
}

/// Abstraction over stake-candidate reviewers.
#[async_trait]
pub trait BetAdvisor: Send + Sync {
    /// Review one candidate. Implementations must not error on a mere
    /// disapproval; `Err` means the advisor itself was unreachable.
    async fn analyze(&self, request: &AdviceRequest) -> Result<BetAnalysis>;

    /// Advisor name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Stub (tests and advisor-disabled runs)
// ---------------------------------------------------------------------------

/// Fixed-verdict advisor.
pub struct StubAdvisor {
    approved: bool,
    stake_multiplier: f64,
}

impl StubAdvisor {
    pub fn approving() -> Self {
        Self {
            approved: true,
            stake_multiplier: 1.0,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            approved: false,
            stake_multiplier: 0.0,
        }
    }

    pub fn with_multiplier(multiplier: f64) -> Self {
        Self {
            approved: true,
            stake_multiplier: multiplier,
        }
    }
}

#[async_trait]
impl BetAdvisor for StubAdvisor {
    async fn analyze(&self, _request: &AdviceRequest) -> Result<BetAnalysis> {
        Ok(BetAnalysis {
            approved: self.approved,
            confidence: 1.0,
            reasoning: "stub verdict".to_string(),
            stake_multiplier: self.stake_multiplier,
        }
        .clamped())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
