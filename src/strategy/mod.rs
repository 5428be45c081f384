//! Strategy pipeline — outcome pricing, devigging, edge evaluation, and
//! Kelly staking.

pub mod edge;
pub mod kelly;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::model::poisson::ScoringModel;
use crate::types::{MatchEvent, SentinelError, StakeDecision};
use edge::{devig, EdgeEvaluator};
use kelly::StakingEngine;

// ---------------------------------------------------------------------------
// Decision log
// ---------------------------------------------------------------------------

/// A stake decision bound to the event it was computed for.
#[derive(Debug, Clone)]
pub struct StakeCandidate {
    pub event: MatchEvent,
    pub decision: StakeDecision,
}

/// Record of every decision made (or skipped) during a strategy pass.
/// Kept for analysis and transparency — including opportunities that were
/// passed on and the reason why.
#[derive(Debug)]
pub enum DecisionRecord {
    /// Candidate survived ranking and is queued for execution.
    Selected {
        event_id: String,
        decision: StakeDecision,
    },
    /// No outcome cleared the minimum edge.
    NoEdge { event_id: String },
    /// Best edge found, but staking produced a zero stake (negative Kelly
    /// or below the minimum stake).
    KellyRejected {
        event_id: String,
        decision: StakeDecision,
    },
    /// Non-zero stake that lost the cross-event ranking to better edges.
    /// Dropped, not deferred.
    Dropped {
        event_id: String,
        decision: StakeDecision,
    },
    /// Malformed inputs aborted this event; other events are unaffected.
    Invalid {
        event_id: String,
        error: SentinelError,
    },
}

/// Outcome of evaluating a single event.
enum EventOutcome {
    Candidate(StakeCandidate),
    NoEdge,
    KellyRejected(StakeDecision),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipelines scoring → devig → edge evaluation → staking for a batch of
/// events, then ranks the non-zero stakes and keeps at most
/// `max_bets_per_run`.
pub struct StrategyPipeline {
    model: ScoringModel,
    evaluator: EdgeEvaluator,
    staking: StakingEngine,
    max_bets_per_run: usize,
}

impl StrategyPipeline {
    pub fn new(
        model: ScoringModel,
        evaluator: EdgeEvaluator,
        staking: StakingEngine,
        max_bets_per_run: usize,
    ) -> Self {
        Self {
            model,
            evaluator,
            staking,
            max_bets_per_run,
        }
    }

    /// Run the full pipeline for a batch of events against the current
    /// bankroll.
    ///
    /// Returns the ranked, truncated candidates (ready for the executor)
    /// and a complete decision log. Malformed events surface as
    /// `DecisionRecord::Invalid` without touching the rest of the batch.
    pub fn select_candidates(
        &self,
        events: &[MatchEvent],
        bankroll: Decimal,
    ) -> (Vec<StakeCandidate>, Vec<DecisionRecord>) {
        let mut decisions: Vec<DecisionRecord> = Vec::new();
        let mut candidates: Vec<StakeCandidate> = Vec::new();

        for event in events {
            match self.evaluate_event(event, bankroll) {
                Ok(EventOutcome::Candidate(candidate)) => candidates.push(candidate),
                Ok(EventOutcome::NoEdge) => {
                    debug!(event_id = %event.event_id, "No actionable edge");
                    decisions.push(DecisionRecord::NoEdge {
                        event_id: event.event_id.clone(),
                    });
                }
                Ok(EventOutcome::KellyRejected(decision)) => {
                    debug!(
                        event_id = %event.event_id,
                        edge = format!("{:.2}%", decision.edge * 100.0),
                        "Edge found but staking refused"
                    );
                    decisions.push(DecisionRecord::KellyRejected {
                        event_id: event.event_id.clone(),
                        decision,
                    });
                }
                Err(error) => {
                    warn!(
                        event_id = %event.event_id,
                        %error,
                        "Event rejected by strategy pipeline"
                    );
                    decisions.push(DecisionRecord::Invalid {
                        event_id: event.event_id.clone(),
                        error,
                    });
                }
            }
        }

        // Rank by edge descending; ties prefer the higher model
        // probability, then batch order (stable sort).
        candidates.sort_by(|a, b| {
            b.decision
                .edge
                .partial_cmp(&a.decision.edge)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.decision
                        .model_prob
                        .partial_cmp(&a.decision.model_prob)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        let mut overflow = candidates.split_off(self.max_bets_per_run.min(candidates.len()));
        for candidate in overflow.drain(..) {
            debug!(
                event_id = %candidate.event.event_id,
                edge = format!("{:.2}%", candidate.decision.edge * 100.0),
                "Candidate dropped by per-run bet limit"
            );
            decisions.push(DecisionRecord::Dropped {
                event_id: candidate.event.event_id.clone(),
                decision: candidate.decision,
            });
        }

        for candidate in &candidates {
            decisions.push(DecisionRecord::Selected {
                event_id: candidate.event.event_id.clone(),
                decision: candidate.decision.clone(),
            });
        }

        info!(
            events_in = events.len(),
            selected = candidates.len(),
            "Strategy pass complete"
        );

        (candidates, decisions)
    }

    /// Score one event and stake its best edge.
    fn evaluate_event(
        &self,
        event: &MatchEvent,
        bankroll: Decimal,
    ) -> Result<EventOutcome, SentinelError> {
        let probs = self.model.score(&event.rates)?;
        let fair = devig(&event.quote)?;
        let signals = self.evaluator.evaluate(&probs.entries(), &fair, &event.quote);

        let Some(best) = signals.first() else {
            return Ok(EventOutcome::NoEdge);
        };

        let decision = self.staking.compute_stake(best, bankroll);
        if !decision.is_bet() {
            return Ok(EventOutcome::KellyRejected(decision));
        }

        Ok(EventOutcome::Candidate(StakeCandidate {
            event: event.clone(),
            decision,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
