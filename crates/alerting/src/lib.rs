//! Alerting System
//!
//! Threshold heuristic that turns the most recent sensor reading into an
//! alert record.

mod alert;
mod heuristic;

pub use alert::{Alert, AlertLevel, ParseLevelError};
pub use heuristic::{AlertConfig, AlertHeuristic};
