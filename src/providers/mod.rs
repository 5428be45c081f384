//! Market data providers.
//!
//! Defines the `OddsFeed` and `StatsFeed` traits plus the normalization
//! step that fuses a raw market quote with team form into a scoreable
//! `MatchEvent`.

pub mod odds;
pub mod stats;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::model::bayes::RatePrior;
use crate::types::{MatchEvent, MatchOdds, MarketQuote, ScoringRates, SentinelError, TeamStats};

/// Abstraction over bookmaker odds sources.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Upcoming fixtures with their current 1X2 prices.
    async fn fetch_odds(&self) -> Result<Vec<MatchOdds>>;

    /// Feed name for logging.
    fn name(&self) -> &str;
}

/// Abstraction over team form sources.
#[async_trait]
pub trait StatsFeed: Send + Sync {
    /// Scoring form for one team by name.
    async fn fetch_team_stats(&self, team: &str) -> Result<TeamStats>;

    /// Feed name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Fuse raw odds and both teams' form into a scoreable event.
///
/// The base attack rate scales a team's scoring average by how leaky the
/// opposition is relative to the league: λ = scored × (conceded_opp /
/// league_avg). Each base rate then passes through a Gamma prior refined
/// with the team's recent goal counts, so a hot or cold streak moves the
/// rate without overwhelming the season average.
pub fn normalize(
    odds: &MatchOdds,
    home: &TeamStats,
    away: &TeamStats,
    league_average_goals: f64,
    prior_strength: f64,
) -> Result<MatchEvent, SentinelError> {
    if !league_average_goals.is_finite() || league_average_goals <= 0.0 {
        return Err(SentinelError::InvalidParameter(format!(
            "league average goals must be strictly positive, got {league_average_goals}"
        )));
    }

    let home_rate = refined_rate(
        home.avg_goals_scored,
        away.avg_goals_conceded,
        league_average_goals,
        prior_strength,
        &home.recent_goals,
    )?;
    let away_rate = refined_rate(
        away.avg_goals_scored,
        home.avg_goals_conceded,
        league_average_goals,
        prior_strength,
        &away.recent_goals,
    )?;

    let rates = ScoringRates {
        home: home_rate,
        away: away_rate,
    };

    debug!(
        event_id = %odds.event_id,
        %rates,
        "Event normalized"
    );

    Ok(MatchEvent {
        event_id: odds.event_id.clone(),
        home_team: odds.home_team.clone(),
        away_team: odds.away_team.clone(),
        market_type: odds.market_type.clone(),
        quote: MarketQuote::from_1x2(odds.home_odds, odds.draw_odds, odds.away_odds),
        rates,
        fetched_at: odds.fetched_at,
    })
}

fn refined_rate(
    avg_scored: f64,
    opponent_conceded: f64,
    league_average_goals: f64,
    prior_strength: f64,
    recent_goals: &[i64],
) -> Result<f64, SentinelError> {
    let base = avg_scored * (opponent_conceded / league_average_goals);
    let prior = RatePrior::from_mean(base, prior_strength)?;
    Ok(prior.update(recent_goals)?.posterior_mean())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
