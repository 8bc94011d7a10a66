use crate::models::{EngineConfig, RebalanceSettings, StrategyPreset};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Names an extra configuration file layered over `config/default.toml`.
pub const CONFIG_PATH_ENV: &str = "POOL_RISK_CONFIG";
pub const ENV_PREFIX: &str = "POOL_RISK";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    /// Overrides the rebalance target, cap and APY hurdle when set.
    pub strategy: Option<StrategyPreset>,
    pub monitoring: MonitoringSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub refresh_interval_seconds: u64,
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        MonitoringSettings {
            refresh_interval_seconds: 30,
            snapshot_path: PathBuf::from("data/positions.json"),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Layered load: `config/default.toml`, the file named by
    /// `POOL_RISK_CONFIG`, then `POOL_RISK__SECTION__KEY` variables.
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings.with_strategy_applied())
    }

    /// Load from a single file, ignoring the environment.
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?
            .try_deserialize()?;

        Ok(settings.with_strategy_applied())
    }

    pub fn with_strategy_applied(mut self) -> Self {
        if let Some(strategy) = self.strategy {
            let preset = RebalanceSettings::for_strategy(strategy);
            self.engine.rebalance = RebalanceSettings {
                distress_fallback: self.engine.rebalance.distress_fallback,
                ..preset
            };
        }
        self
    }
}
