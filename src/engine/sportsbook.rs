//! Sportsbook integration — the bet placement surface.
//!
//! Defines the `Sportsbook` trait plus a stub for dry runs and a generic
//! bearer-token REST client for real placement. Placement failure is
//! reported, never retried into the ledger: committed capital stays
//! committed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::Outcome;

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

/// A placement order for one stake.
#[derive(Debug, Clone, Serialize)]
pub struct BetRequest {
    pub event_id: String,
    pub outcome: Outcome,
    pub odds: f64,
    pub stake: Decimal,
}

/// Placement confirmation from the book.
#[derive(Debug, Clone)]
pub struct BetResponse {
    /// Book-side ticket id, if one was issued.
    pub ticket_id: Option<String>,
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over bet placement venues.
#[async_trait]
pub trait Sportsbook: Send + Sync {
    /// Place a single bet. An `Err` or `accepted: false` both count as a
    /// failed placement.
    async fn place_bet(&self, request: &BetRequest) -> Result<BetResponse>;

    /// Available balance held at the book.
    async fn check_balance(&self) -> Result<Decimal>;

    /// Venue name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Stub (dry runs and tests)
// ---------------------------------------------------------------------------

/// Accepts every bet without touching the network.
pub struct StubSportsbook {
    balance: Decimal,
}

impl StubSportsbook {
    pub fn new(balance: Decimal) -> Self {
        Self { balance }
    }
}

#[async_trait]
impl Sportsbook for StubSportsbook {
    async fn place_bet(&self, request: &BetRequest) -> Result<BetResponse> {
        info!(
            event_id = %request.event_id,
            outcome = %request.outcome,
            stake = %request.stake,
            odds = request.odds,
            "DRY RUN — bet accepted by stub"
        );
        Ok(BetResponse {
            ticket_id: Some(format!("stub-{}", request.event_id)),
            accepted: true,
        })
    }

    async fn check_balance(&self) -> Result<Decimal> {
        Ok(self.balance)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// Live REST client
// ---------------------------------------------------------------------------

/// Wire shape for `POST /bets`.
#[derive(Debug, Serialize)]
struct PlaceBetBody<'a> {
    event_id: &'a str,
    outcome: String,
    odds: f64,
    stake: Decimal,
}

#[derive(Debug, Deserialize)]
struct PlaceBetReply {
    #[serde(default)]
    ticket_id: Option<String>,
    #[serde(default)]
    accepted: bool,
}

#[derive(Debug, Deserialize)]
struct BalanceReply {
    balance: Decimal,
}

/// Bearer-token REST sportsbook client.
///
/// Endpoint shape: `POST {base}/bets` to place, `GET {base}/account/balance`
/// for funds.
pub struct LiveSportsbook {
    http: Client,
    base_url: String,
    api_key: String,
}

impl LiveSportsbook {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("SENTINEL/0.1.0 (value-betting-agent)")
            .build()
            .context("Failed to build HTTP client for sportsbook")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Sportsbook for LiveSportsbook {
    async fn place_bet(&self, request: &BetRequest) -> Result<BetResponse> {
        let url = format!("{}/bets", self.base_url);
        let body = PlaceBetBody {
            event_id: &request.event_id,
            outcome: request.outcome.to_string(),
            odds: request.odds,
            stake: request.stake,
        };

        debug!(url = %url, event_id = %request.event_id, "Placing bet");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Sportsbook placement request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, body = %text, "Sportsbook rejected placement");
            return Ok(BetResponse {
                ticket_id: None,
                accepted: false,
            });
        }

        let reply: PlaceBetReply = resp
            .json()
            .await
            .context("Failed to parse sportsbook placement response")?;

        Ok(BetResponse {
            ticket_id: reply.ticket_id,
            accepted: reply.accepted,
        })
    }

    async fn check_balance(&self) -> Result<Decimal> {
        let url = format!("{}/account/balance", self.base_url);
        let reply: BalanceReply = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Sportsbook balance request failed")?
            .error_for_status()
            .context("Sportsbook balance endpoint returned an error")?
            .json()
            .await
            .context("Failed to parse sportsbook balance response")?;

        Ok(reply.balance)
    }

    fn name(&self) -> &str {
        "live"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
