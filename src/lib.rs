//! SENTINEL — Autonomous Sports Value-Betting Agent
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod advisor;
pub mod config;
pub mod engine;
pub mod model;
pub mod providers;
pub mod storage;
pub mod strategy;
pub mod types;
