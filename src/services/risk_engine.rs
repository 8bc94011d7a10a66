use crate::error::ValidationError;
use crate::models::{
    validate_snapshot, Alert, AlertType, ClassifiedPosition, CreatePosition, EngineConfig, PortfolioSummary, Position,
    RebalanceAction,
};
use crate::services::alert_generator::AlertGenerator;
use crate::services::portfolio_aggregator::summarize;
use crate::services::rebalance_recommender::RebalanceRecommender;
use crate::services::risk_classifier::RiskClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything one scoring pass produces for a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringReport {
    pub generated_at: DateTime<Utc>,
    pub classified: Vec<ClassifiedPosition>,
    pub summary: PortfolioSummary,
    pub alerts: Vec<Alert>,
    pub actions: Vec<RebalanceAction>,
}

impl ScoringReport {
    pub fn critical_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| a.alert_type == AlertType::Critical)
    }
}

/// Stateless scoring engine. Holds configuration only, so one instance can
/// be shared across threads and called on any number of snapshots.
pub struct RiskEngine {
    config: EngineConfig,
    classifier: RiskClassifier,
    alerts: AlertGenerator,
    recommender: RebalanceRecommender,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            classifier: RiskClassifier::new(config.risk.clone()),
            alerts: AlertGenerator::new(config.clone()),
            recommender: RebalanceRecommender::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Turn raw provider input into validated positions.
    pub fn validate_snapshot(&self, inputs: Vec<CreatePosition>) -> Result<Vec<Position>, ValidationError> {
        validate_snapshot(inputs, &self.config.base_asset)
    }

    pub fn classify_positions(&self, positions: &[Position]) -> Vec<ClassifiedPosition> {
        self.classifier.classify_all(positions)
    }

    pub fn aggregate_portfolio(&self, positions: &[Position]) -> PortfolioSummary {
        summarize(&self.classify_positions(positions), &self.classifier)
    }

    pub fn generate_alerts(&self, positions: &[Position]) -> Vec<Alert> {
        self.alerts.generate(positions)
    }

    pub fn recommend_rebalance(&self, positions: &[Position]) -> Vec<RebalanceAction> {
        let classified = self.classify_positions(positions);
        let summary = summarize(&classified, &self.classifier);
        self.recommender.recommend(&classified, &summary)
    }

    /// Full pass: classification, summary, alerts and actions from one
    /// classification of the snapshot.
    pub fn score(&self, positions: &[Position]) -> ScoringReport {
        let classified = self.classify_positions(positions);
        let summary = summarize(&classified, &self.classifier);
        let alerts = self.alerts.generate(positions);
        let actions = self.recommender.recommend(&classified, &summary);

        info!(
            "Scored {} positions: {} alerts, {} actions",
            positions.len(),
            alerts.len(),
            actions.len()
        );

        ScoringReport {
            generated_at: Utc::now(),
            classified,
            summary,
            alerts,
            actions,
        }
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, Priority, RiskLevel};
    use bigdecimal::BigDecimal;

    fn raw(id: &str, apy: f64, borrowed: i64, lent: i64, ratio: f64, threshold: f64) -> CreatePosition {
        CreatePosition {
            id: Some(id.to_string()),
            name: Some(format!("Pool {}", id)),
            asset: None,
            apy: Some(apy),
            borrowed: Some(BigDecimal::from(borrowed)),
            lent: Some(BigDecimal::from(lent)),
            collateral_ratio: Some(ratio),
            liquidation_threshold: Some(threshold),
            insurance_coverage: Some(80.0),
        }
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RiskEngine>();
    }

    #[test]
    fn test_score_dashboard_snapshot() {
        let engine = RiskEngine::default();
        let positions = engine
            .validate_snapshot(vec![
                raw("1", 12.5, 5_000, 8_000, 180.0, 150.0),
                raw("2", 18.2, 2_000, 12_000, 250.0, 130.0),
                raw("3", 8.7, 15_000, 18_000, 160.0, 140.0),
            ])
            .unwrap();

        let report = engine.score(&positions);

        let levels: Vec<_> = report.classified.iter().map(|c| c.risk_level).collect();
        assert_eq!(levels, vec![RiskLevel::Medium, RiskLevel::Low, RiskLevel::High]);
        assert_eq!(report.summary.metrics().unwrap().grade, Grade::CPlus);
        assert_eq!(report.alerts[0].alert_type, AlertType::Warning);
        assert_eq!(report.actions[0].priority, Priority::High);
        assert_eq!(report.actions[0].from_pool_id(), Some("3"));
        assert_eq!(report.critical_alerts().count(), 0);
    }

    #[test]
    fn test_score_matches_individual_queries() {
        let engine = RiskEngine::default();
        let positions = engine
            .validate_snapshot(vec![raw("1", 8.7, 10_000, 10_000, 100.0, 140.0)])
            .unwrap();

        let report = engine.score(&positions);
        assert_eq!(report.alerts, engine.generate_alerts(&positions));
        assert_eq!(report.actions, engine.recommend_rebalance(&positions));
        assert_eq!(report.summary, engine.aggregate_portfolio(&positions));
        assert_eq!(report.classified[0].health_score, 0.0);
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let engine = RiskEngine::default();
        let mut bad = raw("1", 8.7, 10_000, 10_000, 100.0, 140.0);
        bad.lent = Some(BigDecimal::from(-5));
        assert!(engine.validate_snapshot(vec![bad]).is_err());
    }
}
