//! Bankroll ledger — the persisted risk state machine.
//!
//! Owns the durable bankroll record across runs: balance, daily loss
//! accumulator, bet counter, and the ACTIVE / HALTED_FOR_DAY mode flag.
//! Every stake must be authorized here before commit, and committed here
//! before placement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Risk limits enforced by the ledger.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Balance the ledger is seeded with on first ever run.
    pub starting_balance: Decimal,
    /// Cumulative committed capital per date before the ledger halts.
    pub daily_loss_limit: Decimal,
    /// Maximum committed stakes per date.
    pub max_bets_per_day: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            starting_balance: dec!(1000.0),
            daily_loss_limit: dec!(50.0),
            max_bets_per_day: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// Operational mode. HaltedForDay clears only on date rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerMode {
    Active,
    HaltedForDay,
}

/// The durable bankroll record, persisted between runs.
///
/// Created once with a starting balance, mutated only through
/// `BankrollLedger`, never destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollState {
    pub balance: Decimal,
    pub starting_balance: Decimal,
    pub active_date: NaiveDate,
    /// Capital committed on `active_date`. Monotonically non-decreasing
    /// within a date; resets only on rollover.
    pub daily_loss: Decimal,
    pub bets_today: u32,
    pub mode: LedgerMode,
}

impl BankrollState {
    /// Seed a fresh ledger. Used only when no persisted state exists.
    pub fn seed(starting_balance: Decimal, today: NaiveDate) -> Self {
        Self {
            balance: starting_balance,
            starting_balance,
            active_date: today,
            daily_loss: Decimal::ZERO,
            bets_today: 0,
            mode: LedgerMode::Active,
        }
    }
}

// ---------------------------------------------------------------------------
// Refusals
// ---------------------------------------------------------------------------

/// Why the ledger declined a stake. A refusal is a designed outcome of the
/// risk policy, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Refusal {
    /// Daily stop-loss reached. Terminal for every remaining candidate
    /// this run; clears on date rollover.
    HaltedForDay,
    /// Daily bet count exhausted.
    BetLimitReached { placed: u32, limit: u32 },
    /// Stake exceeds the available balance. Affects this candidate only.
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::HaltedForDay => write!(f, "halted for the day (stop-loss reached)"),
            Refusal::BetLimitReached { placed, limit } => {
                write!(f, "daily bet limit reached ({placed}/{limit})")
            }
            Refusal::InsufficientBalance {
                requested,
                available,
            } => write!(f, "stake ${requested} exceeds balance ${available}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct BankrollLedger {
    state: BankrollState,
    config: RiskConfig,
}

impl BankrollLedger {
    /// Wrap previously persisted state.
    pub fn new(state: BankrollState, config: RiskConfig) -> Self {
        Self { state, config }
    }

    /// Seed a first-run ledger with the configured starting balance.
    pub fn seeded(config: RiskConfig, today: NaiveDate) -> Self {
        let state = BankrollState::seed(config.starting_balance, today);
        Self { state, config }
    }

    pub fn balance(&self) -> Decimal {
        self.state.balance
    }

    pub fn mode(&self) -> LedgerMode {
        self.state.mode
    }

    /// The state to persist at the end of the run.
    pub fn state(&self) -> &BankrollState {
        &self.state
    }

    /// Start-of-run date rollover. If `today` differs from the stored
    /// active date, the daily counters reset and a halted ledger comes
    /// back to life. Idempotent within the same date.
    pub fn new_run(&mut self, today: NaiveDate) {
        if today == self.state.active_date {
            return;
        }

        info!(
            from = %self.state.active_date,
            to = %today,
            was_halted = self.state.mode == LedgerMode::HaltedForDay,
            "Ledger date rollover"
        );

        self.state.active_date = today;
        self.state.daily_loss = Decimal::ZERO;
        self.state.bets_today = 0;
        self.state.mode = LedgerMode::Active;
    }

    /// Check a stake against the risk limits without mutating anything.
    pub fn authorize(&self, stake: Decimal) -> Result<(), Refusal> {
        if self.state.mode == LedgerMode::HaltedForDay {
            return Err(Refusal::HaltedForDay);
        }
        if self.state.bets_today >= self.config.max_bets_per_day {
            return Err(Refusal::BetLimitReached {
                placed: self.state.bets_today,
                limit: self.config.max_bets_per_day,
            });
        }
        if stake > self.state.balance {
            return Err(Refusal::InsufficientBalance {
                requested: stake,
                available: self.state.balance,
            });
        }
        Ok(())
    }

    /// Commit an authorized stake: reserve the capital, bump the counters,
    /// and accumulate the loss. Settlement is not modelled here, so the
    /// committed stake is the realized loss until a future run reconciles
    /// winnings through the balance.
    ///
    /// Crossing `daily_loss_limit` halts the ledger for the rest of the
    /// date.
    pub fn commit(&mut self, stake: Decimal, realized_loss: Decimal) {
        self.state.balance = (self.state.balance - stake).max(Decimal::ZERO);
        self.state.bets_today += 1;
        self.state.daily_loss += realized_loss.max(Decimal::ZERO);

        info!(
            %stake,
            balance = %self.state.balance,
            daily_loss = %self.state.daily_loss,
            bets_today = self.state.bets_today,
            "Stake committed"
        );

        if self.state.daily_loss >= self.config.daily_loss_limit
            && self.state.mode == LedgerMode::Active
        {
            warn!(
                daily_loss = %self.state.daily_loss,
                limit = %self.config.daily_loss_limit,
                "Daily stop-loss reached — halting for the day"
            );
            self.state.mode = LedgerMode::HaltedForDay;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn make_ledger() -> BankrollLedger {
        BankrollLedger::seeded(RiskConfig::default(), day(1))
    }

    #[test]
    fn test_seeded_ledger_is_active() {
        let ledger = make_ledger();
        assert_eq!(ledger.mode(), LedgerMode::Active);
        assert_eq!(ledger.balance(), dec!(1000.0));
        assert_eq!(ledger.state().bets_today, 0);
    }

    #[test]
    fn test_authorize_within_limits() {
        let ledger = make_ledger();
        assert!(ledger.authorize(dec!(25.00)).is_ok());
    }

    #[test]
    fn test_authorize_refuses_over_balance() {
        let ledger = make_ledger();
        assert_eq!(
            ledger.authorize(dec!(1000.01)),
            Err(Refusal::InsufficientBalance {
                requested: dec!(1000.01),
                available: dec!(1000.0),
            })
        );
    }

    #[test]
    fn test_authorize_refuses_after_bet_limit() {
        let mut ledger = make_ledger();
        for _ in 0..5 {
            ledger.commit(dec!(5.00), dec!(5.00));
        }
        assert!(matches!(
            ledger.authorize(dec!(5.00)),
            Err(Refusal::BetLimitReached { placed: 5, limit: 5 })
        ));
    }

    #[test]
    fn test_commit_deducts_and_counts() {
        let mut ledger = make_ledger();
        ledger.commit(dec!(25.00), dec!(25.00));
        assert_eq!(ledger.balance(), dec!(975.00));
        assert_eq!(ledger.state().bets_today, 1);
        assert_eq!(ledger.state().daily_loss, dec!(25.00));
    }

    #[test]
    fn test_balance_never_negative() {
        let mut ledger = BankrollLedger::seeded(
            RiskConfig {
                starting_balance: dec!(10.0),
                daily_loss_limit: dec!(500.0),
                max_bets_per_day: 10,
            },
            day(1),
        );
        ledger.commit(dec!(25.00), dec!(25.00));
        assert_eq!(ledger.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_stop_loss_halts_for_day() {
        let mut ledger = make_ledger();
        ledger.commit(dec!(30.00), dec!(30.00));
        assert_eq!(ledger.mode(), LedgerMode::Active);
        ledger.commit(dec!(25.00), dec!(25.00));
        assert_eq!(ledger.mode(), LedgerMode::HaltedForDay);
        assert_eq!(ledger.authorize(dec!(1.00)), Err(Refusal::HaltedForDay));
    }

    #[test]
    fn test_stop_loss_exact_boundary() {
        // Reaching the limit exactly is enough to halt.
        let mut ledger = make_ledger();
        ledger.commit(dec!(50.00), dec!(50.00));
        assert_eq!(ledger.mode(), LedgerMode::HaltedForDay);
    }

    #[test]
    fn test_rollover_resets_counters_and_mode() {
        let mut ledger = make_ledger();
        ledger.commit(dec!(60.00), dec!(60.00));
        assert_eq!(ledger.mode(), LedgerMode::HaltedForDay);

        ledger.new_run(day(2));
        assert_eq!(ledger.mode(), LedgerMode::Active);
        assert_eq!(ledger.state().daily_loss, Decimal::ZERO);
        assert_eq!(ledger.state().bets_today, 0);
        assert!(ledger.authorize(dec!(10.00)).is_ok());
        // Balance carries across the rollover.
        assert_eq!(ledger.balance(), dec!(940.00));
    }

    #[test]
    fn test_rollover_idempotent_same_date() {
        let mut ledger = make_ledger();
        ledger.commit(dec!(20.00), dec!(20.00));
        ledger.new_run(day(1));
        assert_eq!(ledger.state().daily_loss, dec!(20.00));
        assert_eq!(ledger.state().bets_today, 1);
    }

    #[test]
    fn test_daily_loss_monotonic_within_date() {
        let mut ledger = make_ledger();
        let mut last = Decimal::ZERO;
        for _ in 0..3 {
            ledger.commit(dec!(10.00), dec!(10.00));
            assert!(ledger.state().daily_loss >= last);
            last = ledger.state().daily_loss;
        }
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut ledger = make_ledger();
        ledger.commit(dec!(25.00), dec!(25.00));

        let json = serde_json::to_string(ledger.state()).unwrap();
        let restored: BankrollState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.balance, dec!(975.00));
        assert_eq!(restored.active_date, day(1));
        assert_eq!(restored.mode, LedgerMode::Active);

        // A restored ledger keeps enforcing where it left off.
        let resumed = BankrollLedger::new(restored, RiskConfig::default());
        assert_eq!(resumed.state().bets_today, 1);
    }
}
