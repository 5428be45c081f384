//! Market devigging and edge evaluation.
//!
//! Strips the bookmaker margin from quoted odds to recover fair
//! probabilities, then compares them to model probabilities to find
//! under-priced outcomes.

use tracing::debug;

use crate::types::{MarketQuote, Outcome, SentinelError};

// ---------------------------------------------------------------------------
// Devigging
// ---------------------------------------------------------------------------

/// Vig-free probabilities for a quoted outcome set, in quote order.
#[derive(Debug, Clone)]
pub struct FairProbabilities {
    entries: Vec<(Outcome, f64)>,
    overround: f64,
}

impl FairProbabilities {
    /// Labelled fair probabilities in quote order.
    pub fn entries(&self) -> &[(Outcome, f64)] {
        &self.entries
    }

    /// Fair probability for a label, if the market quoted it.
    pub fn probability_for(&self, outcome: Outcome) -> Option<f64> {
        self.entries
            .iter()
            .find(|(o, _)| *o == outcome)
            .map(|(_, p)| *p)
    }

    /// Sum of raw implied probabilities. Exceeds 1 by the bookmaker margin
    /// on any real market.
    pub fn overround(&self) -> f64 {
        self.overround
    }
}

/// Remove the bookmaker margin by proportional normalization:
/// implied = 1/odds, fair = implied / Σ implied.
///
/// Fails with `InvalidQuote` for odds ≤ 1.0 (an implied probability of 1 or
/// more carries no margin to strip) or for quotes with fewer than two
/// outcomes.
pub fn devig(quote: &MarketQuote) -> Result<FairProbabilities, SentinelError> {
    if quote.len() < 2 {
        return Err(SentinelError::InvalidQuote(format!(
            "a devig requires at least 2 outcomes, got {}",
            quote.len()
        )));
    }

    let mut implied = Vec::with_capacity(quote.len());
    for &(outcome, odds) in quote.entries() {
        if !odds.is_finite() || odds <= 1.0 {
            return Err(SentinelError::InvalidQuote(format!(
                "odds for {outcome} must exceed 1.0, got {odds}"
            )));
        }
        implied.push((outcome, 1.0 / odds));
    }

    let overround: f64 = implied.iter().map(|(_, p)| p).sum();
    let entries = implied
        .into_iter()
        .map(|(o, p)| (o, p / overround))
        .collect();

    Ok(FairProbabilities { entries, overround })
}

// ---------------------------------------------------------------------------
// Edge evaluation
// ---------------------------------------------------------------------------

/// A model-vs-market comparison for one outcome. Positive edge means the
/// model considers the outcome under-priced.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSignal {
    pub outcome: Outcome,
    /// Quoted decimal odds for the outcome.
    pub odds: f64,
    pub model_prob: f64,
    pub fair_prob: f64,
    /// model_prob − fair_prob.
    pub edge: f64,
}

/// Compares model probabilities to devigged market probabilities.
pub struct EdgeEvaluator {
    /// Noise floor: signals below this edge are discarded.
    min_edge: f64,
}

impl EdgeEvaluator {
    pub fn new(min_edge: f64) -> Self {
        Self { min_edge }
    }

    pub fn min_edge(&self) -> f64 {
        self.min_edge
    }

    /// Evaluate every outcome present in both the model entries and the
    /// fair market probabilities.
    ///
    /// Labels on only one side are skipped — a model that prices totals
    /// against a 1X2-only quote is a data-availability mismatch, not an
    /// error. Results are filtered to edge ≥ min_edge and ordered by edge
    /// descending; ties prefer the higher model probability, then the
    /// quote's input order.
    pub fn evaluate(
        &self,
        model: &[(Outcome, f64)],
        fair: &FairProbabilities,
        quote: &MarketQuote,
    ) -> Vec<EdgeSignal> {
        let mut signals: Vec<EdgeSignal> = Vec::new();

        for &(outcome, model_prob) in model {
            let (Some(fair_prob), Some(odds)) =
                (fair.probability_for(outcome), quote.odds_for(outcome))
            else {
                debug!(%outcome, "No market label for model outcome — skipped");
                continue;
            };

            let edge = model_prob - fair_prob;
            if edge < self.min_edge {
                continue;
            }

            signals.push(EdgeSignal {
                outcome,
                odds,
                model_prob,
                fair_prob,
                edge,
            });
        }

        // Stable sort: equal (edge, model_prob) pairs keep input order.
        signals.sort_by(|a, b| {
            b.edge
                .partial_cmp(&a.edge)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.model_prob
                        .partial_cmp(&a.model_prob)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        signals
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devig_scenario() {
        // {home: 1.91, draw: 3.40, away: 4.20}
        let quote = MarketQuote::from_1x2(1.91, 3.40, 4.20);
        let fair = devig(&quote).unwrap();

        let implied_sum = 1.0 / 1.91 + 1.0 / 3.40 + 1.0 / 4.20;
        assert!((fair.overround() - implied_sum).abs() < 1e-12);
        assert!(fair.overround() > 1.0);

        let total: f64 = fair.entries().iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_devig_removes_margin_never_adds() {
        let quote = MarketQuote::from_1x2(1.91, 3.40, 4.20);
        let fair = devig(&quote).unwrap();
        for &(outcome, odds) in quote.entries() {
            let raw_implied = 1.0 / odds;
            let devigged = fair.probability_for(outcome).unwrap();
            assert!(devigged <= raw_implied);
        }
    }

    #[test]
    fn test_devig_rejects_odds_at_or_below_one() {
        let quote = MarketQuote::from_1x2(1.0, 3.40, 4.20);
        assert!(matches!(
            devig(&quote),
            Err(SentinelError::InvalidQuote(_))
        ));
        let quote = MarketQuote::from_1x2(0.95, 3.40, 4.20);
        assert!(devig(&quote).is_err());
    }

    #[test]
    fn test_devig_rejects_single_outcome() {
        let quote = MarketQuote::new(vec![(Outcome::HomeWin, 1.91)]);
        assert!(matches!(
            devig(&quote),
            Err(SentinelError::InvalidQuote(_))
        ));
    }

    #[test]
    fn test_devig_two_way_market() {
        let quote = MarketQuote::new(vec![(Outcome::Over, 1.95), (Outcome::Under, 1.95)]);
        let fair = devig(&quote).unwrap();
        assert!((fair.probability_for(Outcome::Over).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_filters_below_min_edge() {
        let quote = MarketQuote::from_1x2(2.00, 3.50, 4.00);
        let fair = devig(&quote).unwrap();
        let fair_home = fair.probability_for(Outcome::HomeWin).unwrap();

        let model = vec![
            (Outcome::HomeWin, fair_home + 0.01), // below floor
            (Outcome::Draw, fair.probability_for(Outcome::Draw).unwrap() + 0.08),
        ];
        let signals = EdgeEvaluator::new(0.03).evaluate(&model, &fair, &quote);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].outcome, Outcome::Draw);
    }

    #[test]
    fn test_evaluate_sorted_by_edge_descending() {
        let quote = MarketQuote::from_1x2(2.00, 3.50, 4.00);
        let fair = devig(&quote).unwrap();

        let model: Vec<(Outcome, f64)> = quote
            .entries()
            .iter()
            .zip([0.05, 0.12, 0.08])
            .map(|(&(o, _), bump)| (o, fair.probability_for(o).unwrap() + bump))
            .collect();

        let signals = EdgeEvaluator::new(0.0).evaluate(&model, &fair, &quote);
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0].outcome, Outcome::Draw);
        assert_eq!(signals[1].outcome, Outcome::AwayWin);
        assert_eq!(signals[2].outcome, Outcome::HomeWin);
    }

    #[test]
    fn test_evaluate_tie_prefers_higher_model_prob() {
        let quote = MarketQuote::from_1x2(2.00, 3.50, 4.00);
        let fair = devig(&quote).unwrap();
        let fair_home = fair.probability_for(Outcome::HomeWin).unwrap();
        let fair_away = fair.probability_for(Outcome::AwayWin).unwrap();

        // Identical edges; the home side carries the larger model
        // probability and should rank first despite equal edge.
        let model = vec![
            (Outcome::AwayWin, fair_away + 0.05),
            (Outcome::HomeWin, fair_home + 0.05),
        ];
        let signals = EdgeEvaluator::new(0.0).evaluate(&model, &fair, &quote);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].outcome, Outcome::HomeWin);
    }

    #[test]
    fn test_evaluate_full_tie_keeps_input_order() {
        // Symmetric two-way market, identical model bumps: outcome order
        // must match the quote's input order.
        let quote = MarketQuote::new(vec![(Outcome::Over, 2.00), (Outcome::Under, 2.00)]);
        let fair = devig(&quote).unwrap();
        let model = vec![(Outcome::Over, 0.55), (Outcome::Under, 0.55)];
        let signals = EdgeEvaluator::new(0.0).evaluate(&model, &fair, &quote);
        assert_eq!(signals[0].outcome, Outcome::Over);
        assert_eq!(signals[1].outcome, Outcome::Under);
    }

    #[test]
    fn test_evaluate_skips_unquoted_labels() {
        // Model prices totals, but the market only quotes 1X2.
        let quote = MarketQuote::from_1x2(2.00, 3.50, 4.00);
        let fair = devig(&quote).unwrap();
        let model = vec![(Outcome::Over, 0.99), (Outcome::Under, 0.01)];
        let signals = EdgeEvaluator::new(0.0).evaluate(&model, &fair, &quote);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_edge_is_model_minus_fair() {
        let quote = MarketQuote::from_1x2(2.00, 3.50, 4.00);
        let fair = devig(&quote).unwrap();
        let fair_home = fair.probability_for(Outcome::HomeWin).unwrap();
        let model = vec![(Outcome::HomeWin, 0.55)];
        let signals = EdgeEvaluator::new(0.0).evaluate(&model, &fair, &quote);
        assert!((signals[0].edge - (0.55 - fair_home)).abs() < 1e-12);
    }
}
