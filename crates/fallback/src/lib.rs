//! Rule-Based Fallback System
//!
//! Provides the heuristic congestion score used when ML inference is
//! unavailable.

mod rules;

pub use rules::{HeuristicScorer, SPEED_WEIGHT, VEHICLE_WEIGHT};
