//! Stats feed implementations.
//!
//! `ApiFootballClient` pulls season form from API-Football; `StubStatsFeed`
//! serves a fixed form table for dry runs and tests, with a league-average
//! fallback for unknown teams.
//!
//! API: `https://v3.football.api-sports.io/`
//! Auth: `x-apisports-key` header. Free tier: 100 req/day.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::StatsFeed;
use crate::types::TeamStats;

const BASE_URL: &str = "https://v3.football.api-sports.io";

/// Neutral form used when a team is unknown to the feed.
const FALLBACK_AVG_GOALS: f64 = 1.5;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiStatsResponse {
    #[serde(default)]
    response: Vec<ApiTeamRow>,
}

#[derive(Debug, Deserialize)]
struct ApiTeamRow {
    team: ApiTeamName,
    #[serde(default)]
    goals_for_avg: f64,
    #[serde(default)]
    goals_against_avg: f64,
    #[serde(default)]
    played: u32,
    #[serde(default)]
    recent_goals: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiTeamName {
    name: String,
}

// ---------------------------------------------------------------------------
// Live client
// ---------------------------------------------------------------------------

pub struct ApiFootballClient {
    http: Client,
    api_key: String,
    /// League id, e.g. 39 for the Premier League.
    league: u32,
    season: u32,
}

impl ApiFootballClient {
    pub fn new(api_key: String, league: u32, season: u32) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("SENTINEL/0.1.0")
            .build()
            .context("Failed to build stats HTTP client")?;
        Ok(Self {
            http,
            api_key,
            league,
            season,
        })
    }
}

#[async_trait]
impl StatsFeed for ApiFootballClient {
    async fn fetch_team_stats(&self, team: &str) -> Result<TeamStats> {
        let url = format!(
            "{BASE_URL}/teams/statistics?league={}&season={}&search={}",
            self.league, self.season, team,
        );

        debug!(%team, "Fetching team stats");

        let resp = self
            .http
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .send()
            .await
            .context("Stats API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Stats API error {status}: {body}");
        }

        let body: ApiStatsResponse = resp
            .json()
            .await
            .context("Failed to parse stats response")?;

        let Some(row) = body.response.into_iter().next() else {
            warn!(%team, "Team unknown to stats feed — using neutral form");
            return Ok(neutral_form(team));
        };

        Ok(TeamStats {
            name: row.team.name,
            avg_goals_scored: row.goals_for_avg,
            avg_goals_conceded: row.goals_against_avg,
            matches_played: row.played,
            recent_goals: row.recent_goals,
        })
    }

    fn name(&self) -> &str {
        "api-football"
    }
}

fn neutral_form(team: &str) -> TeamStats {
    TeamStats {
        name: team.to_string(),
        avg_goals_scored: FALLBACK_AVG_GOALS,
        avg_goals_conceded: FALLBACK_AVG_GOALS,
        matches_played: 0,
        recent_goals: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Stub feed
// ---------------------------------------------------------------------------

/// Fixed form table matching the stub odds fixtures.
pub struct StubStatsFeed;

const STUB_TABLE: &[(&str, f64, f64, &[i64])] = &[
    ("Home FC", 1.8, 1.1, &[2, 1, 3]),
    ("Away FC", 1.3, 1.5, &[1, 0, 2]),
    ("North City", 2.0, 0.9, &[3, 2, 2]),
    ("South United", 1.1, 1.8, &[0, 1, 1]),
    ("East Rovers", 1.4, 1.3, &[1, 2, 1]),
    ("West Wanderers", 1.6, 1.2, &[2, 2, 0]),
];

#[async_trait]
impl StatsFeed for StubStatsFeed {
    async fn fetch_team_stats(&self, team: &str) -> Result<TeamStats> {
        let stats = STUB_TABLE
            .iter()
            .find(|(name, ..)| *name == team)
            .map(|(name, scored, conceded, recent)| TeamStats {
                name: (*name).to_string(),
                avg_goals_scored: *scored,
                avg_goals_conceded: *conceded,
                matches_played: 20,
                recent_goals: recent.to_vec(),
            })
            .unwrap_or_else(|| neutral_form(team));

        Ok(stats)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_known_team() {
        let stats = StubStatsFeed.fetch_team_stats("North City").await.unwrap();
        assert_eq!(stats.avg_goals_scored, 2.0);
        assert_eq!(stats.avg_goals_conceded, 0.9);
        assert_eq!(stats.recent_goals, vec![3, 2, 2]);
    }

    #[tokio::test]
    async fn test_stub_unknown_team_gets_neutral_form() {
        let stats = StubStatsFeed.fetch_team_stats("Nowhere FC").await.unwrap();
        assert_eq!(stats.avg_goals_scored, FALLBACK_AVG_GOALS);
        assert_eq!(stats.avg_goals_conceded, FALLBACK_AVG_GOALS);
        assert!(stats.recent_goals.is_empty());
    }

    #[tokio::test]
    async fn test_stub_covers_all_fixture_teams() {
        for team in [
            "Home FC",
            "Away FC",
            "North City",
            "South United",
            "East Rovers",
            "West Wanderers",
        ] {
            let stats = StubStatsFeed.fetch_team_stats(team).await.unwrap();
            assert_eq!(stats.name, team);
            assert!(stats.matches_played > 0);
        }
    }
}
