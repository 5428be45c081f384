//! OpenAI-backed bet advisor.
//!
//! Sends each candidate to the Chat Completions API and parses a JSON
//! verdict. Any failure to reach or parse the model degrades to a
//! conservative rejection rather than an approved stake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AdviceRequest, BetAdvisor, BetAnalysis};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 512;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1000;

const SYSTEM_PROMPT: &str = "You are a risk reviewer for a sports value-betting system. \
You receive one candidate bet with the model's probability, the vig-free market probability, \
the edge, and the proposed stake. Respond with a single JSON object: \
{\"approved\": bool, \"confidence\": number in [0,1], \"reasoning\": string, \
\"stake_multiplier\": number in [0,2]}. Reject bets whose edge looks like a data artifact \
(stale line, implausible probability gap) and scale down bets you are unsure about.";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

/// The JSON verdict shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct VerdictJson {
    approved: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default = "default_multiplier")]
    stake_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenAiAdvisor {
    http: Client,
    api_key: String,
    model: String,
}

impl OpenAiAdvisor {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build OpenAI HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn build_prompt(request: &AdviceRequest) -> String {
        format!(
            "Candidate bet:\n\
             event: {} ({} vs {})\n\
             outcome: {}\n\
             decimal odds: {:.2}\n\
             model probability: {:.4}\n\
             fair market probability: {:.4}\n\
             edge: {:.4}\n\
             proposed stake: ${}\n\
             Respond with the JSON verdict only.",
            request.event_id,
            request.home_team,
            request.away_team,
            request.outcome,
            request.odds,
            request.model_prob,
            request.fair_prob,
            request.edge,
            request.stake,
        )
    }

    /// Extract the verdict object from the model's reply. Tolerates prose
    /// around the JSON by scanning for the outermost braces.
    fn parse_verdict(text: &str) -> Option<VerdictJson> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        serde_json::from_str(&text[start..=end]).ok()
    }

    async fn call_api(&self, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(OPENAI_API_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse OpenAI response")?;

                        let text = body
                            .choices
                            .first()
                            .and_then(|c| c.message.as_ref())
                            .map(|m| m.content.clone())
                            .unwrap_or_default();

                        return Ok(text);
                    }

                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, "Retryable OpenAI error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("OpenAI API error {status}: {error_text}");
                }
                Err(e) => {
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "OpenAI API failed after {MAX_RETRIES} retries: {}",
            last_error.unwrap_or_default()
        )
    }
}

#[async_trait]
impl BetAdvisor for OpenAiAdvisor {
    async fn analyze(&self, request: &AdviceRequest) -> Result<BetAnalysis> {
        debug!(
            event_id = %request.event_id,
            model = %self.model,
            "Requesting advisor verdict"
        );

        let reply = self.call_api(&Self::build_prompt(request)).await?;

        let Some(verdict) = Self::parse_verdict(&reply) else {
            warn!(event_id = %request.event_id, "Unparseable advisor reply — rejecting");
            return Ok(BetAnalysis::declined("advisor reply was not valid JSON"));
        };

        Ok(BetAnalysis {
            approved: verdict.approved,
            confidence: verdict.confidence.clamp(0.0, 1.0),
            reasoning: verdict.reasoning,
            stake_multiplier: verdict.stake_multiplier,
        }
        .clamped())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_verdict() {
        let text = r#"{"approved": true, "confidence": 0.8, "reasoning": "edge plausible", "stake_multiplier": 1.2}"#;
        let verdict = OpenAiAdvisor::parse_verdict(text).unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.stake_multiplier, 1.2);
    }

    #[test]
    fn test_parse_verdict_with_surrounding_prose() {
        let text = "Here is my verdict:\n{\"approved\": false, \"confidence\": 0.9, \"reasoning\": \"stale line\"}\nDone.";
        let verdict = OpenAiAdvisor::parse_verdict(text).unwrap();
        assert!(!verdict.approved);
        assert_eq!(verdict.stake_multiplier, 1.0);
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(OpenAiAdvisor::parse_verdict("no json here").is_none());
        assert!(OpenAiAdvisor::parse_verdict("{not valid").is_none());
    }

    #[test]
    fn test_client_construction() {
        let advisor = OpenAiAdvisor::new("test-key".into(), None).unwrap();
        assert_eq!(advisor.name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_prompt_carries_decision_numbers() {
        let prompt = OpenAiAdvisor::build_prompt(&AdviceRequest {
            event_id: "evt_001".into(),
            home_team: "Home FC".into(),
            away_team: "Away FC".into(),
            outcome: crate::types::Outcome::HomeWin,
            odds: 2.10,
            model_prob: 0.55,
            fair_prob: 0.48,
            edge: 0.07,
            stake: rust_decimal_macros::dec!(25.00),
        });
        assert!(prompt.contains("evt_001"));
        assert!(prompt.contains("0.5500"));
        assert!(prompt.contains("$25.00"));
    }
}
