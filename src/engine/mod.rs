//! Execution engine — bankroll ledger, sportsbook surface, and the stake
//! executor that walks candidates through advice, authorization, commit,
//! and placement.

pub mod executor;
pub mod ledger;
pub mod sportsbook;
