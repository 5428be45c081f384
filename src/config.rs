//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub model: ModelSection,
    pub risk: RiskSection,
    pub providers: ProvidersConfig,
    pub advisor: AdvisorConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Sport key for the odds feed, e.g. "soccer_epl".
    pub sport: String,
    pub dry_run: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelSection {
    pub goal_line: f64,
    pub tail_epsilon: f64,
    /// League-wide average goals per team per match; anchors the
    /// opposition-strength scaling in normalization.
    pub league_average_goals: f64,
    /// Gamma prior strength (α) for rate refinement.
    pub prior_strength: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RiskSection {
    pub initial_bankroll: Decimal,
    pub kelly_fraction: f64,
    pub max_stake_pct: f64,
    pub min_stake: Decimal,
    pub min_edge: f64,
    pub max_bets_per_run: usize,
    pub daily_loss_limit: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub odds_api_key_env: Option<String>,
    pub stats_api_key_env: Option<String>,
    /// League id for the stats feed (API-Football numbering).
    #[serde(default)]
    pub stats_league: Option<u32>,
    #[serde(default)]
    pub stats_season: Option<u32>,
    pub sportsbook: SportsbookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SportsbookConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub bankroll_file: String,
    pub journal_file: String,
    pub lock_file: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    fn validate(&self) -> Result<()> {
        if self.risk.kelly_fraction <= 0.0 || self.risk.kelly_fraction > 1.0 {
            anyhow::bail!(
                "risk.kelly_fraction must be in (0, 1], got {}",
                self.risk.kelly_fraction
            );
        }
        if self.risk.max_stake_pct <= 0.0 || self.risk.max_stake_pct > 1.0 {
            anyhow::bail!(
                "risk.max_stake_pct must be in (0, 1], got {}",
                self.risk.max_stake_pct
            );
        }
        if self.risk.initial_bankroll <= Decimal::ZERO {
            anyhow::bail!("risk.initial_bankroll must be positive");
        }
        if self.model.league_average_goals <= 0.0 {
            anyhow::bail!("model.league_average_goals must be positive");
        }
        Ok(())
    }
}
