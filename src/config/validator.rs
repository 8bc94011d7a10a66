use super::settings::{LoggingSettings, MonitoringSettings, Settings};
use crate::error::AppError;
use crate::models::EngineConfig;
use thiserror::Error;
use tracing::Level;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("Invalid range: {field} must be between {min} and {max}, got {value}")]
    InvalidRange { field: String, min: f64, max: f64, value: f64 },
    #[error("Invalid format: {field} - {message}")]
    InvalidFormat { field: String, message: String },
    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub type ValidationResult<T> = Result<T, ConfigValidationError>;

impl From<ConfigValidationError> for AppError {
    fn from(err: ConfigValidationError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Bounds applied to loaded settings before the engine starts.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    percent_range: (f64, f64),
    refresh_interval_range: (u64, u64),
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self {
            percent_range: (0.0, 100.0),
            refresh_interval_range: (1, 3600),
        }
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_settings(&self, settings: &Settings) -> ValidationResult<()> {
        self.validate_engine_config(&settings.engine)?;
        self.validate_monitoring(&settings.monitoring)?;
        self.validate_logging(&settings.logging)
    }

    pub fn validate_engine_config(&self, config: &EngineConfig) -> ValidationResult<()> {
        if config.base_asset.trim().is_empty() {
            return Err(ConfigValidationError::MissingField("engine.base_asset".to_string()));
        }

        let risk = &config.risk;
        if !(risk.safe_margin > 0.0) || !risk.safe_margin.is_finite() {
            return Err(ConfigValidationError::InvalidRange {
                field: "engine.risk.safe_margin".to_string(),
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
                value: risk.safe_margin,
            });
        }
        self.validate_percent(risk.low_risk_min_health, "engine.risk.low_risk_min_health")?;
        self.validate_range(
            risk.medium_risk_min_health,
            self.percent_range.0,
            risk.low_risk_min_health,
            "engine.risk.medium_risk_min_health",
        )?;

        self.validate_non_negative(config.alerts.alert_threshold, "engine.alerts.alert_threshold")?;
        self.validate_non_negative(config.alerts.opportunity_apy_gap, "engine.alerts.opportunity_apy_gap")?;

        let rebalance = &config.rebalance;
        self.validate_percent(rebalance.target_health_score, "engine.rebalance.target_health_score")?;
        self.validate_non_negative(rebalance.min_apy_improvement, "engine.rebalance.min_apy_improvement")?;
        if !(rebalance.max_rebalance_amount > 0.0) || !rebalance.max_rebalance_amount.is_finite() {
            return Err(ConfigValidationError::InvalidRange {
                field: "engine.rebalance.max_rebalance_amount".to_string(),
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
                value: rebalance.max_rebalance_amount,
            });
        }

        Ok(())
    }

    fn validate_monitoring(&self, monitoring: &MonitoringSettings) -> ValidationResult<()> {
        let (min, max) = self.refresh_interval_range;
        self.validate_range(
            monitoring.refresh_interval_seconds as f64,
            min as f64,
            max as f64,
            "monitoring.refresh_interval_seconds",
        )?;

        if monitoring.snapshot_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::MissingField("monitoring.snapshot_path".to_string()));
        }
        Ok(())
    }

    fn validate_logging(&self, logging: &LoggingSettings) -> ValidationResult<()> {
        logging
            .level
            .parse::<Level>()
            .map(|_| ())
            .map_err(|_| ConfigValidationError::InvalidFormat {
                field: "logging.level".to_string(),
                message: format!("Unknown log level: {}", logging.level),
            })
    }

    fn validate_percent(&self, value: f64, field: &str) -> ValidationResult<()> {
        self.validate_range(value, self.percent_range.0, self.percent_range.1, field)
    }

    fn validate_non_negative(&self, value: f64, field: &str) -> ValidationResult<()> {
        self.validate_range(value, 0.0, f64::MAX, field)
    }

    fn validate_range(&self, value: f64, min: f64, max: f64, field: &str) -> ValidationResult<()> {
        if !(value >= min && value <= max) {
            return Err(ConfigValidationError::InvalidRange {
                field: field.to_string(),
                min,
                max,
                value,
            });
        }
        Ok(())
    }
}

impl Settings {
    pub fn validate(&self) -> ValidationResult<()> {
        ConfigValidator::new().validate_settings(self)
    }
}
