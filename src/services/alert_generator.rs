use crate::models::{
    Alert, AlertType, EngineConfig, Position, RebalanceAction, RiskLevel, SuggestedAction, TransactionReceipt,
};
use crate::services::risk_classifier::RiskClassifier;
use crate::utils::math::{amount_from_f64, to_f64};
use tracing::{debug, info, warn};

/// Scans a snapshot for positions near or past liquidation and for yield
/// opportunities. Stateless: dismissals belong to the caller.
pub struct AlertGenerator {
    config: EngineConfig,
    classifier: RiskClassifier,
}

impl AlertGenerator {
    pub fn new(config: EngineConfig) -> Self {
        let classifier = RiskClassifier::new(config.risk.clone());
        Self { config, classifier }
    }

    /// Alerts for a snapshot, most severe first. The result is identical for
    /// any ordering of the same positions.
    pub fn generate(&self, positions: &[Position]) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = positions
            .iter()
            .filter_map(|position| self.check_liquidation_margin(position))
            .collect();

        alerts.extend(self.opportunity_alerts(positions));
        alerts.sort_by(|a, b| a.priority_cmp(b));

        info!(
            "Generated {} alerts for {} positions ({} critical)",
            alerts.len(),
            positions.len(),
            alerts.iter().filter(|a| a.alert_type == AlertType::Critical).count()
        );
        alerts
    }

    /// Critical when at or below the liquidation threshold, warning when within
    /// `alert_threshold` points of it.
    fn check_liquidation_margin(&self, position: &Position) -> Option<Alert> {
        let margin = position.margin()?;
        let ratio = position.effective_ratio()?;
        let alert_threshold = self.config.alerts.alert_threshold;

        let (alert_type, message) = if margin <= 0.0 {
            warn!(
                "Position {} is liquidatable: collateral ratio {:.1}% vs threshold {:.1}%",
                position.id, ratio, position.liquidation_threshold
            );
            (
                AlertType::Critical,
                format!(
                    "Collateral ratio at or below liquidation threshold ({:.1}% vs {:.1}%)",
                    ratio, position.liquidation_threshold
                ),
            )
        } else if margin <= alert_threshold {
            (
                AlertType::Warning,
                format!(
                    "Health ratio approaching liquidation threshold ({:.1}% vs {:.1}%)",
                    ratio, position.liquidation_threshold
                ),
            )
        } else {
            return None;
        };

        Some(Alert {
            id: Alert::derive_id(alert_type, &position.id),
            alert_type,
            pool_id: position.id.clone(),
            pool_name: position.name.clone(),
            message,
            suggested_action: Some(restore_margin(position, alert_threshold)),
            distance_to_liquidation: Some(margin),
        })
    }

    /// Independent yield rule: flag healthy positions trailing the best
    /// low-risk pool by at least `opportunity_apy_gap` points.
    fn opportunity_alerts(&self, positions: &[Position]) -> Vec<Alert> {
        let gap = self.config.alerts.opportunity_apy_gap;

        let best = positions
            .iter()
            .filter(|p| self.classifier.risk_level(self.classifier.health_score(p)) == RiskLevel::Low)
            .max_by(|a, b| a.apy.total_cmp(&b.apy).then_with(|| b.id.cmp(&a.id)));

        let Some(best) = best else {
            return Vec::new();
        };

        positions
            .iter()
            .filter(|p| p.id != best.id)
            .filter(|p| !self.is_distressed(p))
            .filter(|p| best.apy - p.apy >= gap)
            .map(|p| {
                let apy_gain = best.apy - p.apy;
                debug!("Opportunity for {}: {} pays {:.2} points more", p.id, best.id, apy_gain);
                Alert {
                    id: Alert::derive_id(AlertType::Info, &p.id),
                    alert_type: AlertType::Info,
                    pool_id: p.id.clone(),
                    pool_name: p.name.clone(),
                    message: format!(
                        "Higher yield available: {:.1}% APY in {} vs {:.1}%",
                        best.apy, best.name, p.apy
                    ),
                    suggested_action: Some(SuggestedAction::Reallocate {
                        to_pool_id: best.id.clone(),
                        apy_gain,
                    }),
                    distance_to_liquidation: p.margin(),
                }
            })
            .collect()
    }

    fn is_distressed(&self, position: &Position) -> bool {
        matches!(position.margin(), Some(m) if m <= self.config.alerts.alert_threshold)
    }
}

/// Amounts that bring a position back to exactly `alert_threshold` points
/// above its liquidation threshold. Both amounts are zero for a position
/// sitting exactly on that margin; `target_ratio` still names the floor to hold.
pub fn restore_margin(position: &Position, alert_threshold: f64) -> SuggestedAction {
    let target_ratio = position.liquidation_threshold + alert_threshold;
    let borrowed = to_f64(&position.borrowed);
    let collateral = position.collateral_value();

    let add_collateral = (target_ratio * borrowed / 100.0 - collateral).max(0.0);
    let reduce_borrowed = if target_ratio > 0.0 {
        (borrowed - collateral * 100.0 / target_ratio).max(0.0)
    } else {
        0.0
    };

    SuggestedAction::RestoreMargin {
        add_collateral: amount_from_f64(add_collateral),
        reduce_borrowed: amount_from_f64(reduce_borrowed),
        target_ratio,
    }
}

/// Event-driven confirmation emitted once an action has executed.
pub fn confirmation_alert(action: &RebalanceAction, receipt: &TransactionReceipt) -> Alert {
    let pool_id = action.subject_pool_id().to_string();
    Alert {
        id: Alert::derive_id(AlertType::Success, &receipt.tx_hash),
        alert_type: AlertType::Success,
        pool_name: pool_id.clone(),
        pool_id,
        message: format!("{} confirmed in transaction {}", action.describe(), receipt.tx_hash),
        suggested_action: None,
        distance_to_liquidation: None,
    }
}

/// Ranked alerts for a snapshot.
pub fn generate_alerts(positions: &[Position], config: &EngineConfig) -> Vec<Alert> {
    AlertGenerator::new(config.clone()).generate(positions)
}
