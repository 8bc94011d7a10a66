use crate::config::MonitoringSettings;
use crate::error::AppError;
use crate::models::CreatePosition;
use crate::services::risk_engine::{RiskEngine, ScoringReport};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

/// Source of position snapshots: a wallet, an indexer, or a file.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Vec<CreatePosition>, AppError>;
}

/// Reads a JSON array of positions from disk on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotProvider {
    path: PathBuf,
}

impl JsonFileSnapshotProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotProvider for JsonFileSnapshotProvider {
    async fn fetch_snapshot(&self) -> Result<Vec<CreatePosition>, AppError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::SnapshotError(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let positions: Vec<CreatePosition> = serde_json::from_str(&raw)?;
        Ok(positions)
    }
}

/// Periodic re-scoring on the caller's side. Each tick fetches a snapshot,
/// scores it and publishes the report; the engine itself stays stateless.
pub struct MonitoringService {
    engine: Arc<RiskEngine>,
    provider: Arc<dyn SnapshotProvider>,
    refresh_interval: Duration,
    reports: watch::Sender<Option<Arc<ScoringReport>>>,
}

impl MonitoringService {
    pub fn new(engine: Arc<RiskEngine>, provider: Arc<dyn SnapshotProvider>, settings: &MonitoringSettings) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            engine,
            provider,
            refresh_interval: Duration::from_secs(settings.refresh_interval_seconds.max(1)),
            reports,
        }
    }

    pub fn with_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Receiver that always holds the latest report.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ScoringReport>>> {
        self.reports.subscribe()
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting snapshot monitoring every {:?}", self.refresh_interval);

        let mut interval = time::interval(self.refresh_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.refresh().await {
                        error!("Error during monitoring cycle: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Snapshot monitoring stopped");
    }

    /// One fetch, validate and score cycle.
    pub async fn refresh(&self) -> Result<Arc<ScoringReport>, AppError> {
        let snapshot = self.provider.fetch_snapshot().await?;
        let positions = self.engine.validate_snapshot(snapshot)?;
        let report = Arc::new(self.engine.score(&positions));

        for alert in report.critical_alerts() {
            warn!("{}: {}", alert.pool_name, alert.message);
        }
        if let Some(metrics) = report.summary.metrics() {
            info!(
                "Portfolio health {:.1} ({}), grade {}, {} actions pending",
                metrics.overall_health_score,
                metrics.health_label,
                metrics.grade,
                report.actions.len()
            );
        } else {
            info!("Snapshot is empty");
        }

        self.reports.send_replace(Some(report.clone()));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"[
        {"id":"1","name":"USDC-XLM Pool","apy":12.5,"borrowed":5000,"lent":8000,
         "collateralRatio":180,"liquidationThreshold":150,"insuranceCoverage":85},
        {"id":"3","name":"USDC-BTC Pool","apy":8.7,"borrowed":15000,"lent":18000,
         "collateralRatio":160,"liquidationThreshold":140,"insuranceCoverage":78}
    ]"#;

    fn snapshot_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_json_provider_reads_snapshot() {
        let file = snapshot_file(SNAPSHOT);
        let positions = JsonFileSnapshotProvider::new(file.path()).fetch_snapshot().await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1].liquidation_threshold, Some(140.0));
    }

    #[tokio::test]
    async fn test_missing_file_is_snapshot_error() {
        let provider = JsonFileSnapshotProvider::new("/nonexistent/positions.json");
        assert!(matches!(provider.fetch_snapshot().await, Err(AppError::SnapshotError(_))));
    }

    #[tokio::test]
    async fn test_refresh_publishes_report() {
        let file = snapshot_file(SNAPSHOT);
        let service = MonitoringService::new(
            Arc::new(RiskEngine::default()),
            Arc::new(JsonFileSnapshotProvider::new(file.path())),
            &MonitoringSettings::default(),
        );
        let reports = service.subscribe();

        let report = service.refresh().await.unwrap();
        assert_eq!(report.classified.len(), 2);
        assert_eq!(reports.borrow().as_ref().map(|r| r.alerts.len()), Some(report.alerts.len()));
    }

    #[tokio::test]
    async fn test_invalid_snapshot_does_not_publish() {
        let file = snapshot_file(r#"[{"id":"1","name":"x","apy":1,"borrowed":-1,"lent":1,"liquidationThreshold":1,"insuranceCoverage":1}]"#);
        let service = MonitoringService::new(
            Arc::new(RiskEngine::default()),
            Arc::new(JsonFileSnapshotProvider::new(file.path())),
            &MonitoringSettings::default(),
        );

        assert!(matches!(service.refresh().await, Err(AppError::Validation(_))));
        assert!(service.subscribe().borrow().is_none());
    }
}
