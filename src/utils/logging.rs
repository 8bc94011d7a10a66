use crate::config::{LogFormat, LoggingSettings};
use crate::error::AppError;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), AppError> {
    let level = settings.level.parse::<Level>().unwrap_or(Level::INFO);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pool_risk_engine={}", level).into());

    let result = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .pretty()
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .compact()
            .try_init(),
    };

    result.map_err(|e| AppError::ConfigError(format!("failed to install tracing subscriber: {}", e)))?;

    info!("Logging initialized with level: {}", settings.level);
    Ok(())
}
