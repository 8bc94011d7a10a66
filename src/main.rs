use pool_risk_engine::{
    config::Settings,
    execution::{execute_high_priority, SimulatedExecutor},
    services::{JsonFileSnapshotProvider, MonitoringService, SnapshotProvider},
    utils::init_tracing,
    RiskEngine,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    settings.validate()?;
    init_tracing(&settings.logging)?;
    info!("Configuration loaded successfully");

    let engine = Arc::new(RiskEngine::new(settings.engine.clone()));
    let provider = Arc::new(JsonFileSnapshotProvider::new(settings.monitoring.snapshot_path.clone()));

    // `once` scores a single snapshot, prints the report and simulates the
    // high priority actions; without it the monitor runs until ctrl-c.
    if std::env::args().nth(1).as_deref() == Some("once") {
        let positions = engine.validate_snapshot(provider.fetch_snapshot().await?)?;
        let report = engine.score(&positions);
        println!("{}", serde_json::to_string_pretty(&report)?);

        let outcomes = execute_high_priority(&SimulatedExecutor::default(), &report.actions).await;
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    let monitoring_service = Arc::new(MonitoringService::new(engine, provider, &settings.monitoring));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitoring_handle = {
        let monitoring_service = monitoring_service.clone();
        tokio::spawn(async move { monitoring_service.run(shutdown_rx).await })
    };

    info!(
        "Pool risk engine monitoring {}",
        settings.monitoring.snapshot_path.display()
    );

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    shutdown_tx.send(true).ok();

    if let Err(e) = monitoring_handle.await {
        error!("Monitoring task failed: {}", e);
    }

    info!("Shutting down pool risk engine");
    Ok(())
}
