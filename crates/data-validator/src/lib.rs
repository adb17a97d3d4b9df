//! Data Validation and Request Resolution
//!
//! Turns raw ingestion and prediction payloads into the fully populated,
//! range-checked records consumed by the scoring and alerting crates.

mod count;
mod error;
mod reading;
mod request;
mod validator;

pub use error::ValidationError;
pub use reading::{SensorPayload, SensorReading};
pub use request::{PredictPayload, PredictionRequest};
pub use validator::{ValidationConfig, Validator};
