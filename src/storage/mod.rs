//! Persistence layer.
//!
//! Saves and loads the bankroll ledger state as JSON, appends committed
//! stakes to a CSV journal, and guards the whole run with an exclusive
//! lock file. Two overlapping runs mutating the same ledger would break
//! the daily-loss accounting, so lock acquisition failure aborts the run
//! before any stake is computed.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::ledger::BankrollState;
use crate::types::BetRecord;

/// Default ledger state file path.
const DEFAULT_STATE_FILE: &str = "sentinel_state.json";

const JOURNAL_HEADER: &str = "bet_id,timestamp,event_id,home_team,away_team,market_type,\
outcome,odds,model_prob,fair_prob,edge,kelly_raw,kelly_capped,stake,dry_run,\
placement_success,advisor_reasoning";

// ---------------------------------------------------------------------------
// Ledger state
// ---------------------------------------------------------------------------

/// Save ledger state to a JSON file.
pub fn save_state(state: &BankrollState, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);
    let json = serde_json::to_string_pretty(state).context("Failed to serialise ledger state")?;

    std::fs::write(path, &json).context(format!("Failed to write state to {path}"))?;

    debug!(path, balance = %state.balance, "Ledger state saved");
    Ok(())
}

/// Load ledger state from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_state(path: Option<&str>) -> Result<Option<BankrollState>> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved ledger found, starting fresh");
        return Ok(None);
    }

    let json =
        std::fs::read_to_string(path).context(format!("Failed to read state from {path}"))?;

    let state: BankrollState =
        serde_json::from_str(&json).context(format!("Failed to parse state from {path}"))?;

    info!(
        path,
        balance = %state.balance,
        active_date = %state.active_date,
        bets_today = state.bets_today,
        "Ledger state loaded from disk"
    );

    Ok(Some(state))
}

// ---------------------------------------------------------------------------
// Run lock
// ---------------------------------------------------------------------------

/// Exclusive run guard backed by a lock file.
///
/// `create_new` makes acquisition atomic: a second run against the same
/// lock path fails instead of sharing the ledger. The file is removed on
/// drop; a stale lock after a crash must be cleared by hand.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| {
                format!(
                    "Another run holds the lock at {} (or a stale lock needs removal)",
                    path.display()
                )
            })?;

        debug!(path = %path.display(), "Run lock acquired");
        Ok(Self { path })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove run lock");
        }
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Append committed stakes to the CSV journal, writing the header when the
/// file is created.
pub fn append_journal(records: &[BetRecord], path: &str) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let fresh = !Path::new(path).exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(format!("Failed to open journal at {path}"))?;

    if fresh {
        writeln!(file, "{JOURNAL_HEADER}").context("Failed to write journal header")?;
    }

    for record in records {
        writeln!(file, "{}", journal_row(record)).context("Failed to append journal row")?;
    }

    info!(path, rows = records.len(), "Journal updated");
    Ok(())
}

fn journal_row(r: &BetRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{:.2},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{},{}",
        r.bet_id,
        r.timestamp.to_rfc3339(),
        csv_field(&r.event_id),
        csv_field(&r.home_team),
        csv_field(&r.away_team),
        csv_field(&r.market_type),
        r.outcome,
        r.odds,
        r.model_prob,
        r.fair_prob,
        r.edge,
        r.kelly_raw,
        r.kelly_capped,
        r.stake,
        r.dry_run,
        r.placement_success,
        csv_field(&r.advisor_reasoning),
    )
}

/// Quote a field if it contains a separator, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn temp_path(suffix: &str) -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("sentinel_test_{}_{suffix}", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn make_state() -> BankrollState {
        BankrollState::seed(dec!(1000), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
    }

    fn make_record(reasoning: &str) -> BetRecord {
        BetRecord {
            bet_id: "b1".into(),
            event_id: "evt_001".into(),
            home_team: "Home FC".into(),
            away_team: "Away FC".into(),
            market_type: "1X2".into(),
            outcome: Outcome::HomeWin,
            odds: 2.10,
            model_prob: 0.55,
            fair_prob: 0.48,
            edge: 0.07,
            kelly_raw: 0.1409,
            kelly_capped: 0.035,
            stake: dec!(25.00),
            dry_run: true,
            placement_success: true,
            advisor_reasoning: reasoning.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load_state() {
        let path = temp_path("state.json");
        let state = make_state();
        save_state(&state, Some(&path)).unwrap();

        let loaded = load_state(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.balance, dec!(1000));
        assert_eq!(loaded.active_date, state.active_date);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_nonexistent_state() {
        let loaded = load_state(Some("/tmp/sentinel_nonexistent_state_12345.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_run_lock_is_exclusive() {
        let path = temp_path("lock");
        let lock = RunLock::acquire(&path).unwrap();
        assert!(RunLock::acquire(&path).is_err());
        drop(lock);
        // Released on drop: a new run may acquire.
        let _again = RunLock::acquire(&path).unwrap();
    }

    #[test]
    fn test_journal_header_written_once() {
        let path = temp_path("journal.csv");
        append_journal(&[make_record("fine")], &path).unwrap();
        append_journal(&[make_record("also fine")], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("bet_id,timestamp"));
        assert!(lines[1].contains("evt_001"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_journal_escapes_commas_and_quotes() {
        let path = temp_path("journal.csv");
        append_journal(&[make_record("stale line, probably \"suspect\"")], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"stale line, probably \"\"suspect\"\"\""));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_empty_journal_append_creates_nothing() {
        let path = temp_path("journal.csv");
        append_journal(&[], &path).unwrap();
        assert!(!Path::new(&path).exists());
    }
}
