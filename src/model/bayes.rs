//! Gamma-Poisson rate refinement.
//!
//! A team's scoring rate is held as a Gamma(α, β) belief; observed goal
//! counts update it through conjugacy, and the posterior mean feeds the
//! scoring model. (α, β) stay authoritative so successive updates compound.

use tracing::debug;

use crate::types::SentinelError;

/// Gamma-distributed belief about a Poisson scoring rate.
///
/// Invariant: α > 0 and β > 0, enforced at construction and preserved by
/// `update` (goal counts are non-negative, observation counts positive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePrior {
    alpha: f64,
    beta: f64,
}

impl RatePrior {
    pub fn new(alpha: f64, beta: f64) -> Result<Self, SentinelError> {
        if !alpha.is_finite() || alpha <= 0.0 || !beta.is_finite() || beta <= 0.0 {
            return Err(SentinelError::InvalidParameter(format!(
                "Gamma prior requires α>0 and β>0, got α={alpha}, β={beta}"
            )));
        }
        Ok(Self { alpha, beta })
    }

    /// Build a prior with the given mean: β = α / mean, so E[λ] = mean.
    /// `strength` (α) controls how many observations it takes to move the
    /// belief.
    pub fn from_mean(mean: f64, strength: f64) -> Result<Self, SentinelError> {
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SentinelError::InvalidParameter(format!(
                "prior mean must be strictly positive and finite, got {mean}"
            )));
        }
        Self::new(strength, strength / mean)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Posterior mean rate α/β — the λ handed to the scoring model.
    /// Derived, never stored: the (α, β) pair remains the representation.
    pub fn posterior_mean(&self) -> f64 {
        self.alpha / self.beta
    }

    /// Conjugate update with observed goal counts:
    /// α' = α + Σx, β' = β + n.
    ///
    /// Batching is equivalent to folding one observation at a time — the
    /// update is associative and commutative, which callers rely on when
    /// history arrives in chunks. An empty slice returns the prior
    /// unchanged.
    pub fn update(&self, observed_goals: &[i64]) -> Result<RatePrior, SentinelError> {
        if observed_goals.is_empty() {
            return Ok(*self);
        }
        if let Some(bad) = observed_goals.iter().find(|&&g| g < 0) {
            return Err(SentinelError::InvalidObservation(format!(
                "goal counts must be non-negative, got {bad}"
            )));
        }

        let total: i64 = observed_goals.iter().sum();
        let posterior = RatePrior {
            alpha: self.alpha + total as f64,
            beta: self.beta + observed_goals.len() as f64,
        };

        debug!(
            prior_mean = self.posterior_mean(),
            observations = observed_goals.len(),
            total_goals = total,
            posterior_mean = posterior.posterior_mean(),
            "Rate updated"
        );

        Ok(posterior)
    }
}

impl std::fmt::Display for RatePrior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Gamma(α={:.3}, β={:.3}) → λ̂={:.3}",
            self.alpha,
            self.beta,
            self.posterior_mean()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_batch_update() {
        // α=4, β=2, observed [3,2,1] → α'=10, β'=5, mean 2.0
        let prior = RatePrior::new(4.0, 2.0).unwrap();
        let posterior = prior.update(&[3, 2, 1]).unwrap();
        assert_eq!(posterior.alpha(), 10.0);
        assert_eq!(posterior.beta(), 5.0);
        assert!((posterior.posterior_mean() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_batch_equals_incremental() {
        let prior = RatePrior::new(1.0, 0.8).unwrap();
        let batched = prior.update(&[3, 1, 2]).unwrap();
        let incremental = prior
            .update(&[1])
            .unwrap()
            .update(&[3, 2])
            .unwrap();
        assert!((batched.alpha() - incremental.alpha()).abs() < 1e-12);
        assert!((batched.beta() - incremental.beta()).abs() < 1e-12);
    }

    #[test]
    fn test_order_independent() {
        let prior = RatePrior::new(2.0, 1.5).unwrap();
        let forward = prior.update(&[0, 4, 2]).unwrap();
        let reversed = prior.update(&[2, 4, 0]).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_empty_observations_is_noop() {
        let prior = RatePrior::new(4.0, 2.0).unwrap();
        let same = prior.update(&[]).unwrap();
        assert_eq!(prior, same);
    }

    #[test]
    fn test_negative_goals_rejected() {
        let prior = RatePrior::new(4.0, 2.0).unwrap();
        assert!(matches!(
            prior.update(&[2, -1, 3]),
            Err(SentinelError::InvalidObservation(_))
        ));
    }

    #[test]
    fn test_zero_goals_are_valid_observations() {
        // A scoreless run is information, not an error: mean shrinks.
        let prior = RatePrior::new(4.0, 2.0).unwrap();
        let posterior = prior.update(&[0, 0]).unwrap();
        assert!(posterior.posterior_mean() < prior.posterior_mean());
    }

    #[test]
    fn test_from_mean() {
        let prior = RatePrior::from_mean(1.5, 1.0).unwrap();
        assert!((prior.posterior_mean() - 1.5).abs() < 1e-12);
        assert_eq!(prior.alpha(), 1.0);
    }

    #[test]
    fn test_invalid_prior_parameters_rejected() {
        assert!(RatePrior::new(0.0, 1.0).is_err());
        assert!(RatePrior::new(1.0, -2.0).is_err());
        assert!(RatePrior::new(f64::NAN, 1.0).is_err());
        assert!(RatePrior::from_mean(0.0, 1.0).is_err());
    }

    #[test]
    fn test_updates_compound() {
        // Two sequential updates accumulate both counts and exposure.
        let prior = RatePrior::new(1.0, 1.0).unwrap();
        let after = prior.update(&[2]).unwrap().update(&[1]).unwrap();
        assert_eq!(after.alpha(), 4.0);
        assert_eq!(after.beta(), 3.0);
    }
}
