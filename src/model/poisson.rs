//! Poisson scoring model.
//!
//! Prices 1X2 and over/under outcomes by treating home and away goals as
//! independent Poisson counts, summing a truncated score grid, and
//! redistributing the omitted tail mass proportionally.

use tracing::debug;

use crate::types::{OutcomeProbabilities, ScoringRates, SentinelError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Hard ceiling on the per-side goal cutoff. With realistic scoring rates
/// the ε criterion stops far earlier; the ceiling only guards degenerate
/// inputs.
const MAX_GOALS: u32 = 512;

/// Scoring model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Totals line, e.g. 2.5 = over/under 2.5 goals. Need not be an integer.
    pub goal_line: f64,
    /// Maximum tail mass allowed outside the truncated grid, per side.
    pub tail_epsilon: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            goal_line: 2.5,
            tail_epsilon: 1e-6,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Converts scoring rates into outcome probabilities. Pure — holds no
/// mutable state.
pub struct ScoringModel {
    config: ModelConfig,
}

impl ScoringModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Access the model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Price all five outcomes for an event's scoring rates using the
    /// configured goal line.
    pub fn score(&self, rates: &ScoringRates) -> Result<OutcomeProbabilities, SentinelError> {
        score(rates.home, rates.away, self.config.goal_line, self.config.tail_epsilon)
    }
}

/// Compute 1X2 and over/under probabilities for a pair of Poisson rates.
///
/// The grid is truncated at the smallest K where the cumulative Poisson
/// mass exceeds 1 − ε on each side; each outcome group is then
/// renormalized so the omitted tail is distributed proportionally.
pub fn score(
    lambda_home: f64,
    lambda_away: f64,
    goal_line: f64,
    tail_epsilon: f64,
) -> Result<OutcomeProbabilities, SentinelError> {
    validate_rate(lambda_home, "λ_home")?;
    validate_rate(lambda_away, "λ_away")?;
    if !goal_line.is_finite() || goal_line <= 0.0 {
        return Err(SentinelError::InvalidParameter(format!(
            "goal_line must be positive and finite, got {goal_line}"
        )));
    }

    let home_pmf = pmf_table(lambda_home, tail_epsilon);
    let away_pmf = pmf_table(lambda_away, tail_epsilon);

    let mut home_win = 0.0;
    let mut draw = 0.0;
    let mut away_win = 0.0;
    let mut over = 0.0;
    let mut under = 0.0;

    for (i, ph) in home_pmf.iter().enumerate() {
        for (j, pa) in away_pmf.iter().enumerate() {
            let cell = ph * pa;

            match i.cmp(&j) {
                std::cmp::Ordering::Greater => home_win += cell,
                std::cmp::Ordering::Equal => draw += cell,
                std::cmp::Ordering::Less => away_win += cell,
            }

            if (i + j) as f64 > goal_line {
                over += cell;
            } else {
                under += cell;
            }
        }
    }

    let result_mass = home_win + draw + away_win;
    let totals_mass = over + under;
    if result_mass <= 0.0 || totals_mass <= 0.0 {
        // exp(-λ) underflowed: the rate is too extreme to represent.
        return Err(SentinelError::InvalidParameter(format!(
            "score grid mass vanished for λ_home={lambda_home}, λ_away={lambda_away}"
        )));
    }

    let probs = OutcomeProbabilities {
        home_win: home_win / result_mass,
        draw: draw / result_mass,
        away_win: away_win / result_mass,
        over: over / totals_mass,
        under: under / totals_mass,
    };

    debug!(
        lambda_home,
        lambda_away,
        goal_line,
        grid = format!("{}x{}", home_pmf.len(), away_pmf.len()),
        probs = %probs,
        "Scored event"
    );

    Ok(probs)
}

/// Poisson pmf values P(X = 0..=K) with K the smallest count whose
/// cumulative mass exceeds 1 − ε.
fn pmf_table(lambda: f64, epsilon: f64) -> Vec<f64> {
    let mut p = (-lambda).exp();
    let mut table = vec![p];
    let mut cumulative = p;
    let mut k: u32 = 0;

    while cumulative < 1.0 - epsilon && k < MAX_GOALS {
        k += 1;
        p *= lambda / f64::from(k);
        table.push(p);
        cumulative += p;
    }

    table
}

fn validate_rate(lambda: f64, name: &str) -> Result<(), SentinelError> {
    if !lambda.is_finite() || lambda <= 0.0 {
        return Err(SentinelError::InvalidParameter(format!(
            "{name} must be strictly positive and finite, got {lambda}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
