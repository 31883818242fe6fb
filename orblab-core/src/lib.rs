//! ORB Lab Core — domain types and the opening-range-breakout engine.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (bars, sessions, ranges, signals, fills, outcomes, instruments)
//! - Opening-range calculation and close-based breakout confirmation
//! - Fill resolution for market, limit-at-range and limit-retrace modes
//! - Outcome state machine with MAE/MFE tracking and a conservative tie-break
//! - Flat-friction cost model with a minimum-viable-risk gate
//! - Deterministic RNG hierarchy for randomized baselines

pub mod domain;
pub mod engine;
pub mod rng;
