use crate::models::{ClassifiedPosition, Position, RiskLevel, RiskThresholds};
use crate::utils::math::clamp_percent;
use tracing::debug;

/// Maps collateral margins to health scores and risk levels.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
}

impl RiskClassifier {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    /// Health score in `[0, 100]`. Debt-free positions score 100, positions at
    /// or below their liquidation threshold score 0, and the margin in
    /// between is scaled linearly up to `safe_margin`.
    pub fn health_score(&self, position: &Position) -> f64 {
        match position.margin() {
            None => 100.0,
            Some(margin) => self.health_for_margin(margin),
        }
    }

    pub fn health_for_margin(&self, margin: f64) -> f64 {
        if margin <= 0.0 {
            return 0.0;
        }
        if self.thresholds.safe_margin <= 0.0 || margin >= self.thresholds.safe_margin {
            return 100.0;
        }
        clamp_percent(margin * 100.0 / self.thresholds.safe_margin)
    }

    /// Margin, in percentage points, that yields `health_score`.
    pub fn margin_for_health(&self, health_score: f64) -> f64 {
        clamp_percent(health_score) * self.thresholds.safe_margin / 100.0
    }

    pub fn risk_level(&self, health_score: f64) -> RiskLevel {
        if health_score >= self.thresholds.low_risk_min_health {
            RiskLevel::Low
        } else if health_score >= self.thresholds.medium_risk_min_health {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn classify(&self, position: &Position) -> ClassifiedPosition {
        let health_score = self.health_score(position);
        let risk_level = self.risk_level(health_score);

        debug!(
            "Classified position {} as {} risk (health {:.1})",
            position.id, risk_level, health_score
        );

        ClassifiedPosition {
            position: position.clone(),
            risk_level,
            health_score,
        }
    }

    pub fn classify_all(&self, positions: &[Position]) -> Vec<ClassifiedPosition> {
        positions.iter().map(|position| self.classify(position)).collect()
    }
}

/// Classify every position of a snapshot, preserving input order.
pub fn classify_positions(positions: &[Position], thresholds: &RiskThresholds) -> Vec<ClassifiedPosition> {
    RiskClassifier::new(thresholds.clone()).classify_all(positions)
}
