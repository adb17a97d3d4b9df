//! Application Configuration
//!
//! Defaults, then an optional config file, then `SMARTCITY_*` environment
//! variables (`__` separates nested keys, e.g. `SMARTCITY_POLICY__ALERT_THRESHOLD`).

use alerting::AlertConfig;
use data_validator::ValidationConfig;
use config::{Config, ConfigError, Environment, File};
use feature_engine::NormalizerConfig;
use inference_engine::PredictorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SMARTCITY";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_VAR: &str = "SMARTCITY_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/smartcity";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Scoring and alerting policy constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub vehicle_capacity: f64,
    pub free_flow_speed: f64,
    pub alert_threshold: u32,
    /// Upper bound accepted for an ingested average speed (km/h)
    pub max_speed: f64,
    /// Upper bound accepted for an ingested vehicle count
    pub max_vehicle_count: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let normalizer = NormalizerConfig::default();
        let validation = ValidationConfig::default();
        Self {
            vehicle_capacity: normalizer.vehicle_capacity,
            free_flow_speed: normalizer.free_flow_speed,
            alert_threshold: AlertConfig::default().vehicle_count_threshold,
            max_speed: validation.speed_range.1,
            max_vehicle_count: validation.vehicle_count_range.1,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_env: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub bind_addr: String,
    pub database_url: String,
    pub model_path: PathBuf,
    /// Load the model at startup instead of on the first prediction
    pub eager_model_load: bool,
    pub policy: PolicyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_env: "local".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://smartcity.db".to_string(),
            model_path: PredictorConfig::default().artifact_path,
            eager_model_load: false,
            policy: PolicyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default file location (or `SMARTCITY_CONFIG`) and the
    /// environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (extension optional, file optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject policy constants that would make the normalizer meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.policy.vehicle_capacity) {
            return Err(ConfigError::Message(format!(
                "policy.vehicle_capacity must be positive, got {}",
                self.policy.vehicle_capacity
            )));
        }
        if !is_positive(self.policy.free_flow_speed) {
            return Err(ConfigError::Message(format!(
                "policy.free_flow_speed must be positive, got {}",
                self.policy.free_flow_speed
            )));
        }
        if !is_positive(self.policy.max_speed) || !is_positive(self.policy.max_vehicle_count) {
            return Err(ConfigError::Message(format!(
                "policy.max_speed and policy.max_vehicle_count must be positive, got {} and {}",
                self.policy.max_speed, self.policy.max_vehicle_count
            )));
        }
        Ok(())
    }

    /// Predictor settings derived from this config
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            artifact_path: self.model_path.clone(),
            normalizer: NormalizerConfig {
                vehicle_capacity: self.policy.vehicle_capacity,
                free_flow_speed: self.policy.free_flow_speed,
            },
        }
    }

    /// Ingestion bounds derived from this config; readings must be non-negative
    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            speed_range: (0.0, self.policy.max_speed),
            vehicle_count_range: (0.0, self.policy.max_vehicle_count),
        }
    }

    /// Alert settings derived from this config
    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            vehicle_count_threshold: self.policy.alert_threshold,
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_config(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.policy.vehicle_capacity, 100.0);
        assert_eq!(config.policy.free_flow_speed, 60.0);
        assert_eq!(config.policy.alert_threshold, 80);
        assert_eq!(config.alert_config().vehicle_count_threshold, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent/smartcity-config").unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_file_overrides() {
        let path = scratch_config(
            "overrides",
            r#"
app_env = "staging"
log_format = "json"
model_path = "/srv/models/congestion.onnx"

[policy]
alert_threshold = 95
"#,
        );
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.app_env, "staging");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.policy.alert_threshold, 95);
        assert_eq!(config.policy.vehicle_capacity, 100.0);
        assert_eq!(
            config.predictor_config().artifact_path,
            PathBuf::from("/srv/models/congestion.onnx")
        );
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_ingestion_bounds_configurable() {
        let path = scratch_config("bounds", "[policy]\nmax_speed = 130.0\n");
        let config = AppConfig::load_from(&path).unwrap();
        let validation = config.validation_config();
        assert_eq!(validation.speed_range, (0.0, 130.0));
        assert_eq!(validation.vehicle_count_range, (0.0, 100_000.0));
        std::fs::remove_file(path).ok();

        let path = scratch_config("bad-bounds", "[policy]\nmax_vehicle_count = -1.0\n");
        assert!(AppConfig::load_from(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let path = scratch_config("invalid", "[policy]\nvehicle_capacity = 0.0\n");
        assert!(AppConfig::load_from(&path).is_err());
        std::fs::remove_file(path).ok();
    }
}
