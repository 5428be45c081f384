//! Quantitative models — Poisson outcome pricing and Bayesian rate
//! refinement.

pub mod bayes;
pub mod poisson;
