use serde::{Deserialize, Serialize};

/// Health score bands and the margin that counts as fully safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Margin above the liquidation threshold, in percentage points, that maps to a health score of 100.
    pub safe_margin: f64,
    pub low_risk_min_health: f64,
    pub medium_risk_min_health: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Warn when a position is within this many points of liquidation.
    pub alert_threshold: f64,
    /// APY gap to the best low-risk pool that triggers an opportunity alert.
    pub opportunity_apy_gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistressFallback {
    AddCollateral,
    Deleverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    Conservative,
    Balanced,
    Aggressive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceSettings {
    /// Health score a distressed source should reach after a move.
    pub target_health_score: f64,
    pub max_rebalance_amount: f64,
    /// Minimum APY gain, in points, for a yield-only move.
    pub min_apy_improvement: f64,
    pub distress_fallback: DistressFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_asset: String,
    pub risk: RiskThresholds,
    pub alerts: AlertSettings,
    pub rebalance: RebalanceSettings,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            safe_margin: 100.0,
            low_risk_min_health: 70.0,
            medium_risk_min_health: 30.0,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            alert_threshold: 20.0,
            opportunity_apy_gap: 5.0,
        }
    }
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        Self::for_strategy(StrategyPreset::Balanced)
    }
}

impl RebalanceSettings {
    pub fn for_strategy(strategy: StrategyPreset) -> Self {
        let (target_health_score, max_rebalance_amount, min_apy_improvement) = match strategy {
            StrategyPreset::Conservative => (85.0, 5_000.0, 4.0),
            StrategyPreset::Balanced => (70.0, 10_000.0, 2.0),
            StrategyPreset::Aggressive => (50.0, 25_000.0, 1.0),
        };

        Self {
            target_health_score,
            max_rebalance_amount,
            min_apy_improvement,
            distress_fallback: DistressFallback::AddCollateral,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_asset: "USDC".to_string(),
            risk: RiskThresholds::default(),
            alerts: AlertSettings::default(),
            rebalance: RebalanceSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.risk.safe_margin, 100.0);
        assert_eq!(config.alerts.alert_threshold, 20.0);
        assert_eq!(config.rebalance.target_health_score, 70.0);
        assert_eq!(config.rebalance.distress_fallback, DistressFallback::AddCollateral);
    }

    #[test]
    fn test_strategy_presets_order_by_appetite() {
        let conservative = RebalanceSettings::for_strategy(StrategyPreset::Conservative);
        let aggressive = RebalanceSettings::for_strategy(StrategyPreset::Aggressive);
        assert!(conservative.target_health_score > aggressive.target_health_score);
        assert!(conservative.max_rebalance_amount < aggressive.max_rebalance_amount);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"alerts":{"alert_threshold":25.0}}"#).unwrap();
        assert_eq!(config.alerts.alert_threshold, 25.0);
        assert_eq!(config.alerts.opportunity_apy_gap, 5.0);
        assert_eq!(config.base_asset, "USDC");
    }
}
