//! Stake executor.
//!
//! Walks the ranked candidates and, for each one: advisory review, ledger
//! authorization, ledger commit, then placement. Commit happens before
//! placement and a failed placement does not roll the commit back; once
//! capital is committed it is at risk whether or not the book confirmed.

use anyhow::Result;
use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::advisor::{AdviceRequest, BetAdvisor, BetAnalysis};
use crate::engine::ledger::{BankrollLedger, Refusal};
use crate::engine::sportsbook::{BetRequest, Sportsbook};
use crate::strategy::StakeCandidate;
use crate::types::BetRecord;

// ---------------------------------------------------------------------------
// Configuration & report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Log and journal every decision without calling the book.
    pub dry_run: bool,
    /// Re-applied after the advisory multiplier: a boosted stake may not
    /// exceed this fraction of the balance.
    pub max_stake_pct: f64,
    /// Re-applied after the advisory multiplier: a shrunk stake below this
    /// floor becomes no bet.
    pub min_stake: Decimal,
}

/// Why a candidate was dropped during execution.
#[derive(Debug, Clone)]
pub enum SkipReason {
    AdvisorRejected { reasoning: String },
    BelowMinimumAfterAdvice,
    Refused(Refusal),
}

#[derive(Debug, Clone)]
pub struct SkippedCandidate {
    pub event_id: String,
    pub reason: SkipReason,
}

/// Result of executing a run's candidate batch.
#[derive(Debug)]
pub struct ExecutionReport {
    pub placed: Vec<BetRecord>,
    pub skipped: Vec<SkippedCandidate>,
    pub total_committed: Decimal,
    /// The daily stop-loss tripped mid-batch; remaining candidates were
    /// abandoned.
    pub halted: bool,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor<'a> {
    sportsbook: &'a dyn Sportsbook,
    advisor: Option<&'a dyn BetAdvisor>,
    config: ExecutorConfig,
}

impl<'a> Executor<'a> {
    pub fn new(
        sportsbook: &'a dyn Sportsbook,
        advisor: Option<&'a dyn BetAdvisor>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            sportsbook,
            advisor,
            config,
        }
    }

    /// Execute ranked candidates against the ledger.
    ///
    /// A halt refusal abandons every remaining candidate; any other refusal
    /// skips only the one it concerns.
    pub async fn execute_batch(
        &self,
        candidates: &[StakeCandidate],
        ledger: &mut BankrollLedger,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport {
            placed: Vec::new(),
            skipped: Vec::new(),
            total_committed: Decimal::ZERO,
            halted: false,
        };

        if candidates.is_empty() {
            return Ok(report);
        }

        info!(
            count = candidates.len(),
            dry_run = self.config.dry_run,
            balance = %ledger.balance(),
            "Executing candidate batch"
        );

        for (idx, candidate) in candidates.iter().enumerate() {
            let event = &candidate.event;
            let decision = &candidate.decision;

            let analysis = self.review(candidate).await;
            if !analysis.approved {
                info!(
                    event_id = %event.event_id,
                    reasoning = %analysis.reasoning,
                    "Advisor vetoed candidate"
                );
                report.skipped.push(SkippedCandidate {
                    event_id: event.event_id.clone(),
                    reason: SkipReason::AdvisorRejected {
                        reasoning: analysis.reasoning,
                    },
                });
                continue;
            }

            let stake = self.scaled_stake(decision.stake, analysis.stake_multiplier, ledger);
            if stake < self.config.min_stake {
                debug!(
                    event_id = %event.event_id,
                    %stake,
                    multiplier = analysis.stake_multiplier,
                    "Scaled stake below minimum — skipping"
                );
                report.skipped.push(SkippedCandidate {
                    event_id: event.event_id.clone(),
                    reason: SkipReason::BelowMinimumAfterAdvice,
                });
                continue;
            }

            match ledger.authorize(stake) {
                Ok(()) => {}
                Err(Refusal::HaltedForDay) => {
                    warn!(
                        event_id = %event.event_id,
                        "Ledger halted for the day — abandoning remaining candidates"
                    );
                    // This candidate and every one after it is abandoned.
                    for abandoned in &candidates[idx..] {
                        report.skipped.push(SkippedCandidate {
                            event_id: abandoned.event.event_id.clone(),
                            reason: SkipReason::Refused(Refusal::HaltedForDay),
                        });
                    }
                    report.halted = true;
                    break;
                }
                Err(refusal) => {
                    info!(event_id = %event.event_id, %refusal, "Stake refused");
                    report.skipped.push(SkippedCandidate {
                        event_id: event.event_id.clone(),
                        reason: SkipReason::Refused(refusal),
                    });
                    continue;
                }
            }

            // Capital is at risk from here on, regardless of what the book
            // says next.
            ledger.commit(stake, stake);
            report.total_committed += stake;

            let placement_success = self.place(candidate, stake).await;

            let record = BetRecord {
                bet_id: Uuid::new_v4().to_string(),
                event_id: event.event_id.clone(),
                home_team: event.home_team.clone(),
                away_team: event.away_team.clone(),
                market_type: event.market_type.clone(),
                outcome: decision.outcome,
                odds: decision.odds,
                model_prob: decision.model_prob,
                fair_prob: decision.fair_prob,
                edge: decision.edge,
                kelly_raw: decision.kelly_raw,
                kelly_capped: decision.kelly_capped,
                stake,
                dry_run: self.config.dry_run,
                placement_success,
                advisor_reasoning: analysis.reasoning,
                timestamp: Utc::now(),
            };

            info!(%record, "Stake executed");
            report.placed.push(record);
        }

        info!(
            placed = report.placed.len(),
            skipped = report.skipped.len(),
            committed = %report.total_committed,
            halted = report.halted,
            "Batch execution complete"
        );

        Ok(report)
    }

    /// Ask the advisor, if one is configured. An unreachable advisor is a
    /// rejection, never a silent approval.
    async fn review(&self, candidate: &StakeCandidate) -> BetAnalysis {
        let Some(advisor) = self.advisor else {
            return BetAnalysis {
                approved: true,
                confidence: 1.0,
                reasoning: "advisor disabled".to_string(),
                stake_multiplier: 1.0,
            };
        };

        let request = AdviceRequest {
            event_id: candidate.event.event_id.clone(),
            home_team: candidate.event.home_team.clone(),
            away_team: candidate.event.away_team.clone(),
            outcome: candidate.decision.outcome,
            odds: candidate.decision.odds,
            model_prob: candidate.decision.model_prob,
            fair_prob: candidate.decision.fair_prob,
            edge: candidate.decision.edge,
            stake: candidate.decision.stake,
        };

        match advisor.analyze(&request).await {
            Ok(analysis) => analysis.clamped(),
            Err(e) => {
                warn!(
                    event_id = %candidate.event.event_id,
                    advisor = advisor.name(),
                    error = %e,
                    "Advisor unreachable — rejecting candidate"
                );
                BetAnalysis::declined(format!("advisor unreachable: {e}"))
            }
        }
    }

    /// Apply the advisory multiplier, then re-apply the max-stake cap
    /// against the current balance.
    fn scaled_stake(&self, stake: Decimal, multiplier: f64, ledger: &BankrollLedger) -> Decimal {
        let factor = Decimal::from_f64(multiplier).unwrap_or(Decimal::ZERO);
        let scaled = (stake * factor).round_dp(2);
        let cap = (ledger.balance() * Decimal::from_f64(self.config.max_stake_pct)
            .unwrap_or(Decimal::ZERO))
        .round_dp(2);
        scaled.min(cap)
    }

    /// Send the stake to the book. Dry runs log instead of placing and
    /// count as successful.
    async fn place(&self, candidate: &StakeCandidate, stake: Decimal) -> bool {
        if self.config.dry_run {
            info!(
                event_id = %candidate.event.event_id,
                outcome = %candidate.decision.outcome,
                %stake,
                odds = candidate.decision.odds,
                "[DRY RUN] Would place bet"
            );
            return true;
        }

        let request = BetRequest {
            event_id: candidate.event.event_id.clone(),
            outcome: candidate.decision.outcome,
            odds: candidate.decision.odds,
            stake,
        };

        match self.sportsbook.place_bet(&request).await {
            Ok(response) if response.accepted => true,
            Ok(_) => {
                warn!(
                    event_id = %candidate.event.event_id,
                    book = self.sportsbook.name(),
                    "Placement declined by the book — capital stays committed"
                );
                false
            }
            Err(e) => {
                warn!(
                    event_id = %candidate.event.event_id,
                    book = self.sportsbook.name(),
                    error = %e,
                    "Placement failed — capital stays committed"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::StubAdvisor;
    use crate::engine::ledger::RiskConfig;
    use crate::engine::sportsbook::{BetResponse, StubSportsbook};
    use crate::types::{MarketQuote, MatchEvent, Outcome, ScoringRates, StakeDecision};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn make_candidate(id: &str, stake: Decimal) -> StakeCandidate {
        StakeCandidate {
            event: MatchEvent {
                event_id: id.to_string(),
                home_team: "Home FC".into(),
                away_team: "Away FC".into(),
                market_type: "1X2".into(),
                quote: MarketQuote::from_1x2(2.10, 3.40, 3.60),
                rates: ScoringRates { home: 1.8, away: 1.1 },
                fetched_at: Utc::now(),
            },
            decision: StakeDecision {
                outcome: Outcome::HomeWin,
                stake,
                odds: 2.10,
                model_prob: 0.55,
                fair_prob: 0.48,
                edge: 0.07,
                kelly_raw: 0.1409,
                kelly_capped: 0.035,
            },
        }
    }

    fn make_ledger(balance: Decimal, loss_limit: Decimal) -> BankrollLedger {
        BankrollLedger::seeded(
            RiskConfig {
                starting_balance: balance,
                daily_loss_limit: loss_limit,
                max_bets_per_day: 5,
            },
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        )
    }

    fn config(dry_run: bool) -> ExecutorConfig {
        ExecutorConfig {
            dry_run,
            max_stake_pct: 0.05,
            min_stake: dec!(1.0),
        }
    }

    struct FailingBook;

    #[async_trait]
    impl Sportsbook for FailingBook {
        async fn place_bet(&self, _request: &BetRequest) -> Result<BetResponse> {
            anyhow::bail!("connection reset")
        }
        async fn check_balance(&self) -> Result<Decimal> {
            Ok(Decimal::ZERO)
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_dry_run_commits_and_journals() {
        let book = StubSportsbook::new(dec!(0));
        let executor = Executor::new(&book, None, config(true));
        let mut ledger = make_ledger(dec!(1000), dec!(500));

        let report = executor
            .execute_batch(&[make_candidate("e1", dec!(25.00))], &mut ledger)
            .await
            .unwrap();

        assert_eq!(report.placed.len(), 1);
        assert!(report.placed[0].dry_run);
        assert!(report.placed[0].placement_success);
        assert_eq!(ledger.balance(), dec!(975.00));
    }

    #[tokio::test]
    async fn test_advisor_veto_skips_candidate() {
        let book = StubSportsbook::new(dec!(0));
        let advisor = StubAdvisor::rejecting();
        let executor = Executor::new(&book, Some(&advisor), config(true));
        let mut ledger = make_ledger(dec!(1000), dec!(500));

        let report = executor
            .execute_batch(&[make_candidate("e1", dec!(25.00))], &mut ledger)
            .await
            .unwrap();

        assert!(report.placed.is_empty());
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::AdvisorRejected { .. }
        ));
        // Vetoed stakes never touch the ledger.
        assert_eq!(ledger.balance(), dec!(1000));
    }

    #[tokio::test]
    async fn test_advisor_multiplier_recapped() {
        // A 2x boost on a $40 stake would be $80, but 5% of $1000 is $50.
        let book = StubSportsbook::new(dec!(0));
        let advisor = StubAdvisor::with_multiplier(2.0);
        let executor = Executor::new(&book, Some(&advisor), config(true));
        let mut ledger = make_ledger(dec!(1000), dec!(500));

        let report = executor
            .execute_batch(&[make_candidate("e1", dec!(40.00))], &mut ledger)
            .await
            .unwrap();

        assert_eq!(report.placed[0].stake, dec!(50.00));
    }

    #[tokio::test]
    async fn test_advisor_shrink_refloored_to_zero() {
        // 0.02x of $25 is $0.50, under the $1 floor.
        let book = StubSportsbook::new(dec!(0));
        let advisor = StubAdvisor::with_multiplier(0.02);
        let executor = Executor::new(&book, Some(&advisor), config(true));
        let mut ledger = make_ledger(dec!(1000), dec!(500));

        let report = executor
            .execute_batch(&[make_candidate("e1", dec!(25.00))], &mut ledger)
            .await
            .unwrap();

        assert!(report.placed.is_empty());
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::BelowMinimumAfterAdvice
        ));
    }

    #[tokio::test]
    async fn test_halt_abandons_remaining_candidates() {
        // $30 + $25 crosses the $50 stop-loss on the second commit; the
        // third candidate must not even be authorized.
        let book = StubSportsbook::new(dec!(0));
        let executor = Executor::new(&book, None, config(true));
        let mut ledger = make_ledger(dec!(1000), dec!(50));

        let candidates = vec![
            make_candidate("e1", dec!(30.00)),
            make_candidate("e2", dec!(25.00)),
            make_candidate("e3", dec!(20.00)),
        ];
        let report = executor.execute_batch(&candidates, &mut ledger).await.unwrap();

        assert_eq!(report.placed.len(), 2);
        assert!(report.halted);
        assert!(report
            .skipped
            .iter()
            .any(|s| s.event_id == "e3"
                && matches!(s.reason, SkipReason::Refused(Refusal::HaltedForDay))));
    }

    #[tokio::test]
    async fn test_failed_placement_keeps_commit() {
        let book = FailingBook;
        let executor = Executor::new(&book, None, config(false));
        let mut ledger = make_ledger(dec!(1000), dec!(500));

        let report = executor
            .execute_batch(&[make_candidate("e1", dec!(25.00))], &mut ledger)
            .await
            .unwrap();

        assert_eq!(report.placed.len(), 1);
        assert!(!report.placed[0].placement_success);
        // No rollback: the balance reflects the committed stake.
        assert_eq!(ledger.balance(), dec!(975.00));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let book = StubSportsbook::new(dec!(0));
        let executor = Executor::new(&book, None, config(true));
        let mut ledger = make_ledger(dec!(1000), dec!(500));
        let report = executor.execute_batch(&[], &mut ledger).await.unwrap();
        assert!(report.placed.is_empty());
        assert!(!report.halted);
    }
}
