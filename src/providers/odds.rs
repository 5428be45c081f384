//! Odds feed implementations.
//!
//! `TheOddsApiClient` pulls live h2h prices from The Odds API and averages
//! across bookmakers; `StubOddsFeed` serves fixed fixtures for dry runs
//! and tests.
//!
//! API: `https://api.the-odds-api.com/v4/sports/{sport}/odds`
//! Auth: `apiKey` query parameter. Free tier: 500 req/month.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::OddsFeed;
use crate::types::MatchOdds;

const BASE_URL: &str = "https://api.the-odds-api.com/v4";

// ---------------------------------------------------------------------------
// API response types (The Odds API JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<ApiBookmaker>,
}

#[derive(Debug, Deserialize)]
struct ApiBookmaker {
    #[serde(default)]
    markets: Vec<ApiMarket>,
}

#[derive(Debug, Deserialize)]
struct ApiMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Deserialize)]
struct ApiOutcome {
    name: String,
    price: f64,
}

// ---------------------------------------------------------------------------
// Live client
// ---------------------------------------------------------------------------

pub struct TheOddsApiClient {
    http: Client,
    api_key: String,
    /// Sport key, e.g. "soccer_epl".
    sport: String,
}

impl TheOddsApiClient {
    pub fn new(api_key: String, sport: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("SENTINEL/0.1.0")
            .build()
            .context("Failed to build odds HTTP client")?;
        Ok(Self {
            http,
            api_key,
            sport,
        })
    }

    /// Average a team's h2h price across every bookmaker quoting it.
    fn average_price(event: &ApiEvent, outcome_name: &str) -> Option<f64> {
        let prices: Vec<f64> = event
            .bookmakers
            .iter()
            .flat_map(|b| &b.markets)
            .filter(|m| m.key == "h2h")
            .flat_map(|m| &m.outcomes)
            .filter(|o| o.name == outcome_name)
            .map(|o| o.price)
            .collect();

        if prices.is_empty() {
            return None;
        }
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    }

    fn to_match_odds(event: &ApiEvent) -> Option<MatchOdds> {
        let home_odds = Self::average_price(event, &event.home_team)?;
        let away_odds = Self::average_price(event, &event.away_team)?;
        let draw_odds = Self::average_price(event, "Draw")?;

        Some(MatchOdds {
            event_id: event.id.clone(),
            home_team: event.home_team.clone(),
            away_team: event.away_team.clone(),
            market_type: "1X2".to_string(),
            home_odds,
            draw_odds,
            away_odds,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl OddsFeed for TheOddsApiClient {
    async fn fetch_odds(&self) -> Result<Vec<MatchOdds>> {
        let url = format!(
            "{BASE_URL}/sports/{}/odds?apiKey={}&regions=eu&markets=h2h&oddsFormat=decimal",
            self.sport, self.api_key,
        );

        debug!(sport = %self.sport, "Fetching odds");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Odds API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Odds API error {status}: {body}");
        }

        let events: Vec<ApiEvent> = resp
            .json()
            .await
            .context("Failed to parse odds response")?;

        let mut odds = Vec::with_capacity(events.len());
        for event in &events {
            match Self::to_match_odds(event) {
                Some(row) => odds.push(row),
                None => {
                    warn!(event_id = %event.id, "No complete 1X2 quote — skipping fixture");
                }
            }
        }

        debug!(fixtures = odds.len(), "Odds fetched");
        Ok(odds)
    }

    fn name(&self) -> &str {
        "the-odds-api"
    }
}

// ---------------------------------------------------------------------------
// Stub feed
// ---------------------------------------------------------------------------

/// Fixed fixtures for dry runs and tests.
pub struct StubOddsFeed;

#[async_trait]
impl OddsFeed for StubOddsFeed {
    async fn fetch_odds(&self) -> Result<Vec<MatchOdds>> {
        let now = Utc::now();
        Ok(vec![
            MatchOdds {
                event_id: "evt_001".into(),
                home_team: "Home FC".into(),
                away_team: "Away FC".into(),
                market_type: "1X2".into(),
                home_odds: 2.10,
                draw_odds: 3.40,
                away_odds: 3.60,
                fetched_at: now,
            },
            MatchOdds {
                event_id: "evt_002".into(),
                home_team: "North City".into(),
                away_team: "South United".into(),
                market_type: "1X2".into(),
                home_odds: 1.85,
                draw_odds: 3.50,
                away_odds: 4.20,
                fetched_at: now,
            },
            MatchOdds {
                event_id: "evt_003".into(),
                home_team: "East Rovers".into(),
                away_team: "West Wanderers".into(),
                market_type: "1X2".into(),
                home_odds: 2.50,
                draw_odds: 3.20,
                away_odds: 2.80,
                fetched_at: now,
            },
        ])
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
