//! Shared types for the SENTINEL agent.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that provider, strategy,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A priceable outcome of a soccer match market.
///
/// `HomeWin`/`Draw`/`AwayWin` form the 1X2 market; `Over`/`Under` the
/// totals market relative to a goal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
    Over,
    Under,
}

impl Outcome {
    /// All known outcomes (useful for iteration).
    pub const ALL: &'static [Outcome] = &[
        Outcome::HomeWin,
        Outcome::Draw,
        Outcome::AwayWin,
        Outcome::Over,
        Outcome::Under,
    ];

    /// The 1X2 (match result) outcomes.
    pub const MATCH_RESULT: &'static [Outcome] =
        &[Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::HomeWin => write!(f, "home"),
            Outcome::Draw => write!(f, "draw"),
            Outcome::AwayWin => write!(f, "away"),
            Outcome::Over => write!(f, "over"),
            Outcome::Under => write!(f, "under"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" | "home_win" | "1" => Ok(Outcome::HomeWin),
            "draw" | "x" => Ok(Outcome::Draw),
            "away" | "away_win" | "2" => Ok(Outcome::AwayWin),
            "over" => Ok(Outcome::Over),
            "under" => Ok(Outcome::Under),
            _ => Err(anyhow::anyhow!("Unknown outcome: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Market quote
// ---------------------------------------------------------------------------

/// Decimal odds for a mutually exclusive, collectively exhaustive outcome
/// set, in bookmaker order.
///
/// Input order is preserved: the edge evaluator uses it as the final
/// tie-break, so two runs over the same quote rank identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    entries: Vec<(Outcome, f64)>,
}

impl MarketQuote {
    pub fn new(entries: Vec<(Outcome, f64)>) -> Self {
        Self { entries }
    }

    /// Build a standard 1X2 quote.
    pub fn from_1x2(home_odds: f64, draw_odds: f64, away_odds: f64) -> Self {
        Self {
            entries: vec![
                (Outcome::HomeWin, home_odds),
                (Outcome::Draw, draw_odds),
                (Outcome::AwayWin, away_odds),
            ],
        }
    }

    /// The quoted outcomes in input order.
    pub fn entries(&self) -> &[(Outcome, f64)] {
        &self.entries
    }

    /// Odds for a specific outcome, if quoted.
    pub fn odds_for(&self, outcome: Outcome) -> Option<f64> {
        self.entries
            .iter()
            .find(|(o, _)| *o == outcome)
            .map(|(_, odds)| *odds)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MarketQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(o, odds)| format!("{o}={odds:.2}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Scoring rates & model output
// ---------------------------------------------------------------------------

/// Expected goals per match for each side — the Poisson parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringRates {
    pub home: f64,
    pub away: f64,
}

impl fmt::Display for ScoringRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "λ_home={:.3} λ_away={:.3}", self.home, self.away)
    }
}

/// Model probabilities for the five standard outcomes.
///
/// Invariants (maintained by `ScoringModel::score`): the three match-result
/// probabilities sum to 1, and over + under sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub over: f64,
    pub under: f64,
}

impl OutcomeProbabilities {
    /// Probability for a specific outcome label.
    pub fn probability_for(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::HomeWin => self.home_win,
            Outcome::Draw => self.draw,
            Outcome::AwayWin => self.away_win,
            Outcome::Over => self.over,
            Outcome::Under => self.under,
        }
    }

    /// All five labelled probabilities.
    pub fn entries(&self) -> Vec<(Outcome, f64)> {
        Outcome::ALL
            .iter()
            .map(|&o| (o, self.probability_for(o)))
            .collect()
    }
}

impl fmt::Display for OutcomeProbabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "1X2=({:.1}%/{:.1}%/{:.1}%) O/U=({:.1}%/{:.1}%)",
            self.home_win * 100.0,
            self.draw * 100.0,
            self.away_win * 100.0,
            self.over * 100.0,
            self.under * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Raw 1X2 odds for one fixture as returned by an odds feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOdds {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    /// Market key, e.g. "1X2".
    pub market_type: String,
    pub home_odds: f64,
    pub draw_odds: f64,
    pub away_odds: f64,
    pub fetched_at: DateTime<Utc>,
}

impl fmt::Display for MatchOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} vs {} ({}: {:.2}/{:.2}/{:.2})",
            self.event_id,
            self.home_team,
            self.away_team,
            self.market_type,
            self.home_odds,
            self.draw_odds,
            self.away_odds,
        )
    }
}

/// Recent scoring form for one team, as reported by a stats feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStats {
    pub name: String,
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub matches_played: u32,
    /// Goals scored in recent matches, newest last. Feeds Bayesian rate
    /// refinement.
    pub recent_goals: Vec<i64>,
}

/// A fully normalized candidate event: market quote plus refined scoring
/// rates, ready for the strategy pipeline.
#[derive(Debug, Clone)]
pub struct MatchEvent {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub market_type: String,
    pub quote: MarketQuote,
    pub rates: ScoringRates,
    pub fetched_at: DateTime<Utc>,
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} vs {} | {} | {}",
            self.event_id, self.home_team, self.away_team, self.quote, self.rates,
        )
    }
}

// ---------------------------------------------------------------------------
// Stake decisions & journal records
// ---------------------------------------------------------------------------

/// A fully computed staking decision for one outcome.
///
/// `stake` may be zero: a zero stake is a decision not to bet (negative
/// Kelly or below the minimum stake), kept for the decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeDecision {
    pub outcome: Outcome,
    /// Capital to risk, rounded to cents. Zero = no bet.
    pub stake: Decimal,
    /// Decimal odds the stake was computed against.
    pub odds: f64,
    /// Model probability for the outcome.
    pub model_prob: f64,
    /// Vig-free market probability for the outcome.
    pub fair_prob: f64,
    /// model_prob − fair_prob.
    pub edge: f64,
    /// Full Kelly fraction before the multiplier and caps.
    pub kelly_raw: f64,
    /// Effective bankroll fraction after multiplier and max-stake cap.
    pub kelly_capped: f64,
}

impl StakeDecision {
    pub fn is_bet(&self) -> bool {
        self.stake > Decimal::ZERO
    }
}

impl fmt::Display for StakeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:.2} | model={:.1}% fair={:.1}% edge={:.1}% | kelly={:.2}%→{:.2}% | stake=${}",
            self.outcome,
            self.odds,
            self.model_prob * 100.0,
            self.fair_prob * 100.0,
            self.edge * 100.0,
            self.kelly_raw * 100.0,
            self.kelly_capped * 100.0,
            self.stake,
        )
    }
}

/// One journal row per committed stake.
///
/// The append-only journal format is owned by the storage layer; this
/// struct carries every field a run must supply per decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub bet_id: String,
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub market_type: String,
    pub outcome: Outcome,
    pub odds: f64,
    pub model_prob: f64,
    pub fair_prob: f64,
    pub edge: f64,
    pub kelly_raw: f64,
    pub kelly_capped: f64,
    pub stake: Decimal,
    pub dry_run: bool,
    /// Whether the placement collaborator confirmed the bet. A failed
    /// placement does not reverse the ledger commit.
    pub placement_success: bool,
    pub advisor_reasoning: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} vs {} | {} @ {:.2} | stake=${} edge={:.2}% | {}",
            self.bet_id,
            self.event_id,
            self.home_team,
            self.away_team,
            self.outcome,
            self.odds,
            self.stake,
            self.edge * 100.0,
            if self.placement_success { "placed" } else { "FAILED" },
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SENTINEL.
///
/// Risk refusals are deliberately not here: the ledger declining a stake is
/// a designed outcome, modelled by `engine::ledger::Refusal`.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Invalid quote: {0}")]
    InvalidQuote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_outcome_display() {
        assert_eq!(format!("{}", Outcome::HomeWin), "home");
        assert_eq!(format!("{}", Outcome::Draw), "draw");
        assert_eq!(format!("{}", Outcome::Under), "under");
    }

    #[test]
    fn test_outcome_from_str() {
        assert_eq!(Outcome::from_str("home").unwrap(), Outcome::HomeWin);
        assert_eq!(Outcome::from_str("X").unwrap(), Outcome::Draw);
        assert_eq!(Outcome::from_str("away_win").unwrap(), Outcome::AwayWin);
        assert!(Outcome::from_str("banker").is_err());
    }

    #[test]
    fn test_quote_preserves_order() {
        let quote = MarketQuote::from_1x2(1.91, 3.40, 4.20);
        let labels: Vec<Outcome> = quote.entries().iter().map(|(o, _)| *o).collect();
        assert_eq!(
            labels,
            vec![Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin]
        );
    }

    #[test]
    fn test_quote_odds_for() {
        let quote = MarketQuote::from_1x2(1.91, 3.40, 4.20);
        assert_eq!(quote.odds_for(Outcome::Draw), Some(3.40));
        assert_eq!(quote.odds_for(Outcome::Over), None);
    }

    #[test]
    fn test_probabilities_entries_cover_all_outcomes() {
        let probs = OutcomeProbabilities {
            home_win: 0.5,
            draw: 0.3,
            away_win: 0.2,
            over: 0.55,
            under: 0.45,
        };
        let entries = probs.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(probs.probability_for(Outcome::Over), 0.55);
    }

    #[test]
    fn test_stake_decision_is_bet() {
        let mut decision = StakeDecision {
            outcome: Outcome::HomeWin,
            stake: dec!(12.50),
            odds: 2.10,
            model_prob: 0.55,
            fair_prob: 0.48,
            edge: 0.07,
            kelly_raw: 0.095,
            kelly_capped: 0.048,
        };
        assert!(decision.is_bet());
        decision.stake = Decimal::ZERO;
        assert!(!decision.is_bet());
    }

    #[test]
    fn test_error_display() {
        let err = SentinelError::InvalidQuote("odds must exceed 1.0".into());
        assert!(format!("{err}").contains("Invalid quote"));
    }
}
