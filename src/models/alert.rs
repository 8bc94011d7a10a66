use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Alert kinds, declared from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Critical,
    Warning,
    Info,
    Success,
}

impl AlertType {
    /// Lower rank sorts first
    pub fn severity_rank(&self) -> u8 {
        match self {
            AlertType::Critical => 0,
            AlertType::Warning => 1,
            AlertType::Info => 2,
            AlertType::Success => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Critical => "critical",
            AlertType::Warning => "warning",
            AlertType::Info => "info",
            AlertType::Success => "success",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Either amount brings the collateral ratio back to `target_ratio`.
    RestoreMargin {
        add_collateral: BigDecimal,
        reduce_borrowed: BigDecimal,
        target_ratio: f64,
    },
    Reallocate { to_pool_id: String, apy_gain: f64 },
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestedAction::RestoreMargin {
                add_collateral,
                reduce_borrowed,
                target_ratio,
            } => write!(
                f,
                "Add {} collateral or reduce borrowed amount by {} to reach {:.1}%",
                add_collateral, reduce_borrowed, target_ratio
            ),
            SuggestedAction::Reallocate { to_pool_id, apy_gain } => write!(
                f,
                "Consider moving liquidity to pool {} for +{:.2}% APY",
                to_pool_id, apy_gain
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub pool_id: String,
    pub pool_name: String,
    pub message: String,
    pub suggested_action: Option<SuggestedAction>,
    /// Margin above the liquidation threshold in percentage points; `None`
    /// for debt-free positions and event alerts.
    pub distance_to_liquidation: Option<f64>,
}

impl Alert {
    /// Deterministic id so callers can track dismissals across refreshes.
    pub fn derive_id(alert_type: AlertType, pool_id: &str) -> String {
        format!("{}-{}", alert_type, pool_id)
    }

    /// Severity first, then closest to liquidation, then pool id.
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        self.alert_type
            .severity_rank()
            .cmp(&other.alert_type.severity_rank())
            .then_with(|| compare_distance(self.distance_to_liquidation, other.distance_to_liquidation))
            .then_with(|| self.pool_id.cmp(&other.pool_id))
            .then_with(|| self.id.cmp(&other.id))
    }
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(alert_type: AlertType, pool: &str, distance: Option<f64>) -> Alert {
        Alert {
            id: Alert::derive_id(alert_type, pool),
            alert_type,
            pool_id: pool.to_string(),
            pool_name: pool.to_string(),
            message: String::new(),
            suggested_action: None,
            distance_to_liquidation: distance,
        }
    }

    #[test]
    fn test_severity_dominates_distance() {
        let warning = alert(AlertType::Warning, "a", Some(1.0));
        let critical = alert(AlertType::Critical, "b", Some(-10.0));
        assert_eq!(critical.priority_cmp(&warning), Ordering::Less);
    }

    #[test]
    fn test_ties_broken_by_distance() {
        let near = alert(AlertType::Warning, "z", Some(2.0));
        let far = alert(AlertType::Warning, "a", Some(15.0));
        let debt_free = alert(AlertType::Warning, "0", None);
        assert_eq!(near.priority_cmp(&far), Ordering::Less);
        assert_eq!(far.priority_cmp(&debt_free), Ordering::Less);
    }

    #[test]
    fn test_alert_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AlertType::Critical).unwrap(), "\"critical\"");
        assert_eq!(Alert::derive_id(AlertType::Info, "7"), "info-7");
    }
}
