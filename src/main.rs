//! SENTINEL — Autonomous Sports Value-Betting Agent
//!
//! Entry point. One invocation is one run: acquire the run lock, restore
//! the bankroll ledger, fetch odds and form, price every fixture, stake
//! the best edges through the ledger, then persist state and journal.
//! Scheduling (cron or similar) lives outside the binary.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use sentinel::advisor::openai::OpenAiAdvisor;
use sentinel::advisor::BetAdvisor;
use sentinel::config::AppConfig;
use sentinel::engine::executor::{Executor, ExecutorConfig};
use sentinel::engine::ledger::{BankrollLedger, RiskConfig};
use sentinel::engine::sportsbook::{LiveSportsbook, Sportsbook, StubSportsbook};
use sentinel::model::poisson::{ModelConfig, ScoringModel};
use sentinel::providers::odds::{StubOddsFeed, TheOddsApiClient};
use sentinel::providers::stats::{ApiFootballClient, StubStatsFeed};
use sentinel::providers::{normalize, OddsFeed, StatsFeed};
use sentinel::storage::{self, RunLock};
use sentinel::strategy::edge::EdgeEvaluator;
use sentinel::strategy::kelly::{StakingConfig, StakingEngine};
use sentinel::strategy::StrategyPipeline;
use sentinel::types::MatchEvent;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;
    init_logging();

    let run_id = Uuid::new_v4();
    info!(
        agent_name = %cfg.agent.name,
        run_id = %run_id,
        sport = %cfg.agent.sport,
        dry_run = cfg.agent.dry_run,
        "SENTINEL run starting"
    );

    // Exclusive access to the ledger for the whole run. Failure here is
    // fatal before any stake is computed.
    let _lock = RunLock::acquire(&cfg.storage.lock_file)
        .context("Could not acquire the run lock")?;

    // -- Restore or seed the ledger ---------------------------------------

    let today = Utc::now().date_naive();
    let risk = RiskConfig {
        starting_balance: cfg.risk.initial_bankroll,
        daily_loss_limit: cfg.risk.daily_loss_limit,
        max_bets_per_day: cfg.risk.max_bets_per_run as u32,
    };

    let mut ledger = match storage::load_state(Some(&cfg.storage.bankroll_file))? {
        Some(state) => BankrollLedger::new(state, risk),
        None => {
            info!(balance = %cfg.risk.initial_bankroll, "Fresh ledger");
            BankrollLedger::seeded(risk, today)
        }
    };
    ledger.new_run(today);

    // -- Fetch and normalize ----------------------------------------------

    let odds_feed = build_odds_feed(&cfg)?;
    let stats_feed = build_stats_feed(&cfg)?;

    let fixtures = odds_feed.fetch_odds().await?;
    info!(feed = odds_feed.name(), fixtures = fixtures.len(), "Odds fetched");

    let mut events: Vec<MatchEvent> = Vec::with_capacity(fixtures.len());
    for fixture in &fixtures {
        let home = stats_feed.fetch_team_stats(&fixture.home_team).await?;
        let away = stats_feed.fetch_team_stats(&fixture.away_team).await?;

        match normalize(
            fixture,
            &home,
            &away,
            cfg.model.league_average_goals,
            cfg.model.prior_strength,
        ) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(event_id = %fixture.event_id, error = %e, "Fixture skipped");
            }
        }
    }

    // -- Strategy ----------------------------------------------------------

    let pipeline = StrategyPipeline::new(
        ScoringModel::new(ModelConfig {
            goal_line: cfg.model.goal_line,
            tail_epsilon: cfg.model.tail_epsilon,
        }),
        EdgeEvaluator::new(cfg.risk.min_edge),
        StakingEngine::new(StakingConfig {
            kelly_fraction: cfg.risk.kelly_fraction,
            max_stake_pct: cfg.risk.max_stake_pct,
            min_stake: cfg.risk.min_stake,
        }),
        cfg.risk.max_bets_per_run,
    );

    let (candidates, decisions) = pipeline.select_candidates(&events, ledger.balance());
    info!(
        events = events.len(),
        candidates = candidates.len(),
        decisions = decisions.len(),
        "Strategy pass finished"
    );

    // -- Execution ---------------------------------------------------------

    let sportsbook = build_sportsbook(&cfg)?;
    let advisor = build_advisor(&cfg)?;

    let executor = Executor::new(
        &*sportsbook,
        advisor.as_deref(),
        ExecutorConfig {
            dry_run: cfg.agent.dry_run,
            max_stake_pct: cfg.risk.max_stake_pct,
            min_stake: cfg.risk.min_stake,
        },
    );

    let report = executor.execute_batch(&candidates, &mut ledger).await?;

    // -- Persist -----------------------------------------------------------

    storage::save_state(ledger.state(), Some(&cfg.storage.bankroll_file))?;
    storage::append_journal(&report.placed, &cfg.storage.journal_file)?;

    info!(
        run_id = %run_id,
        placed = report.placed.len(),
        skipped = report.skipped.len(),
        committed = %report.total_committed,
        halted = report.halted,
        balance = %ledger.balance(),
        "SENTINEL run complete"
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Collaborator wiring
// ---------------------------------------------------------------------------

fn build_odds_feed(cfg: &AppConfig) -> Result<Box<dyn OddsFeed>> {
    let key = cfg
        .providers
        .odds_api_key_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());

    match key {
        Some(key) => Ok(Box::new(TheOddsApiClient::new(
            key,
            cfg.agent.sport.clone(),
        )?)),
        None => {
            warn!("No odds API key configured — using stub fixtures");
            Ok(Box::new(StubOddsFeed))
        }
    }
}

fn build_stats_feed(cfg: &AppConfig) -> Result<Box<dyn StatsFeed>> {
    let key = cfg
        .providers
        .stats_api_key_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());

    match key {
        Some(key) => Ok(Box::new(ApiFootballClient::new(
            key,
            cfg.providers.stats_league.unwrap_or(39),
            cfg.providers.stats_season.unwrap_or(2026),
        )?)),
        None => {
            warn!("No stats API key configured — using stub form table");
            Ok(Box::new(StubStatsFeed))
        }
    }
}

fn build_sportsbook(cfg: &AppConfig) -> Result<Box<dyn Sportsbook>> {
    if !cfg.providers.sportsbook.enabled || cfg.agent.dry_run {
        return Ok(Box::new(StubSportsbook::new(cfg.risk.initial_bankroll)));
    }

    let env = cfg
        .providers
        .sportsbook
        .api_key_env
        .as_deref()
        .context("providers.sportsbook.api_key_env is required when the book is enabled")?;
    let key = AppConfig::resolve_env(env)?;

    Ok(Box::new(LiveSportsbook::new(
        cfg.providers.sportsbook.base_url.clone(),
        key,
    )?))
}

fn build_advisor(cfg: &AppConfig) -> Result<Option<Box<dyn BetAdvisor>>> {
    if !cfg.advisor.enabled {
        return Ok(None);
    }

    let env = cfg
        .advisor
        .api_key_env
        .as_deref()
        .context("advisor.api_key_env is required when the advisor is enabled")?;
    let key = AppConfig::resolve_env(env)?;

    Ok(Some(Box::new(OpenAiAdvisor::new(
        key,
        cfg.advisor.model.clone(),
    )?)))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentinel=info"));

    let json_logging = std::env::var("SENTINEL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
